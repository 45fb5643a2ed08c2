//! Step coordinator for the firmware payload install step.
//!
//! Bridges one firmware-prepare event stream to wizard transitions. The
//! coordinator owns at most one [`Subscription`]; it is released on the
//! terminal event, on [`StepCoordinator::deactivate`], or when the coordinator
//! is dropped. Exactly one transition is emitted per activation unless the
//! step is deactivated first, in which case none is.

use crate::progress::ProgressState;
use crate::view::InstallView;
use crate::wizard::{StepId, StepOutcome, WizardContext, WizardHost};
use fwup_core::{has_final_firmware, FirmwareUpdateContext};
use fwup_device::{FirmwarePrepareRequest, FirmwareTransport, StreamMessage, Subscription};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long `run_until_finished` blocks before re-checking its cancel flag.
const CANCEL_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    /// Constructed, not yet activated.
    Idle,
    /// Subscribed and waiting for events.
    Active,
    /// A transition was emitted.
    Finished,
    /// Deactivated before a terminal event.
    Deactivated,
}

/// What a batch of stream messages did to the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PollStatus {
    Idle,
    /// Progress state changed; re-render.
    Updated,
    Finished,
}

impl PollStatus {
    fn merge(self, other: PollStatus) -> PollStatus {
        self.max(other)
    }
}

/// Step after the payload is on the device.
///
/// The MCU step runs first when the update asks for it or when the final
/// firmware ships its own binary.
pub fn step_after_download(firmware: &FirmwareUpdateContext) -> StepId {
    if firmware.should_flash_mcu || has_final_firmware(&firmware.final_firmware) {
        StepId::UpdateMcu
    } else {
        StepId::Updating
    }
}

pub struct StepCoordinator {
    transport: Arc<dyn FirmwareTransport>,
    context: WizardContext,
    state: ProgressState,
    subscription: Option<Subscription>,
    phase: CoordinatorPhase,
    outcome: Option<StepOutcome>,
}

impl StepCoordinator {
    pub fn new(transport: Arc<dyn FirmwareTransport>, context: WizardContext) -> Self {
        Self {
            transport,
            context,
            state: ProgressState::default(),
            subscription: None,
            phase: CoordinatorPhase::Idle,
            outcome: None,
        }
    }

    pub fn context(&self) -> &WizardContext {
        &self.context
    }

    pub fn progress_state(&self) -> &ProgressState {
        &self.state
    }

    pub fn phase(&self) -> CoordinatorPhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<&StepOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Current presentation variant.
    pub fn view(&self) -> InstallView {
        InstallView::select(&self.state, &self.context)
    }

    /// Start the step. Only the first call has any effect.
    pub fn activate(&mut self, host: &mut dyn WizardHost) {
        if self.phase != CoordinatorPhase::Idle {
            log::warn!("Install step already activated ({:?}), ignoring", self.phase);
            return;
        }

        if self.context.firmware.osu.is_none() {
            log::info!("No firmware payload to install, skipping to {}", StepId::Finish);
            self.finish(host, StepOutcome::AdvanceTo(StepId::Finish));
            return;
        }

        let request = FirmwarePrepareRequest::new(
            self.context.device_id.clone().unwrap_or_default(),
            self.context.firmware.clone(),
        );
        log::info!(
            "Preparing firmware {} on device {:?}",
            self.context.firmware.final_firmware.name,
            request.device_id
        );
        self.subscription = Some(self.transport.firmware_prepare(&request));
        self.phase = CoordinatorPhase::Active;
    }

    /// Apply one stream message.
    ///
    /// Messages that arrive once the step has finished or been deactivated
    /// are dropped without touching any state.
    pub fn handle(&mut self, message: StreamMessage, host: &mut dyn WizardHost) -> PollStatus {
        if self.phase != CoordinatorPhase::Active {
            log::debug!("Ignoring {:?} in phase {:?}", message, self.phase);
            return self.settled_status();
        }

        match message {
            StreamMessage::Next(event) => {
                if self.state.apply_event(event) {
                    log::debug!(
                        "Firmware progress {}% (on device: {})",
                        self.state.percent(),
                        self.state.displayed_on_device
                    );
                    PollStatus::Updated
                } else {
                    PollStatus::Idle
                }
            }
            StreamMessage::Complete => {
                let next = step_after_download(&self.context.firmware);
                self.finish(host, StepOutcome::AdvanceTo(next));
                PollStatus::Finished
            }
            StreamMessage::Error(err) => {
                self.finish(host, StepOutcome::Fail(err));
                PollStatus::Finished
            }
        }
    }

    /// Apply every message already delivered, without blocking.
    pub fn poll(&mut self, host: &mut dyn WizardHost) -> PollStatus {
        let mut status = self.settled_status();
        while self.phase == CoordinatorPhase::Active {
            let Some(message) = self.subscription.as_mut().and_then(Subscription::try_next) else {
                break;
            };
            status = status.merge(self.handle(message, host));
        }
        status
    }

    /// Block up to `timeout` for a message, then drain whatever else arrived.
    pub fn wait(&mut self, host: &mut dyn WizardHost, timeout: Duration) -> PollStatus {
        if self.phase != CoordinatorPhase::Active {
            return self.settled_status();
        }
        let Some(message) = self
            .subscription
            .as_mut()
            .and_then(|sub| sub.next_timeout(timeout))
        else {
            return PollStatus::Idle;
        };
        let status = self.handle(message, host);
        status.merge(self.poll(host))
    }

    /// Drive the stream until it settles or `cancel` is raised.
    ///
    /// `on_update` runs after every batch that changed the progress state.
    /// Returns the outcome, or `None` when cancelled (the step is then
    /// deactivated and no transition is emitted).
    pub fn run_until_finished(
        &mut self,
        host: &mut dyn WizardHost,
        cancel: &AtomicBool,
        mut on_update: impl FnMut(&ProgressState),
    ) -> Option<&StepOutcome> {
        while self.phase == CoordinatorPhase::Active {
            if cancel.load(Ordering::SeqCst) {
                log::info!("Install step cancelled");
                self.deactivate();
                break;
            }
            if self.wait(host, CANCEL_POLL) != PollStatus::Idle {
                on_update(&self.state);
            }
        }
        self.outcome.as_ref()
    }

    /// Tear the step down. Releases the stream if it is still live and never
    /// emits a transition. Safe to call any number of times.
    pub fn deactivate(&mut self) {
        match self.phase {
            CoordinatorPhase::Active => {
                log::info!("Install step deactivated before the stream settled");
                self.release();
                self.phase = CoordinatorPhase::Deactivated;
            }
            CoordinatorPhase::Idle => self.phase = CoordinatorPhase::Deactivated,
            CoordinatorPhase::Finished | CoordinatorPhase::Deactivated => {}
        }
    }

    fn finish(&mut self, host: &mut dyn WizardHost, outcome: StepOutcome) {
        self.release();
        self.phase = CoordinatorPhase::Finished;
        match &outcome {
            StepOutcome::AdvanceTo(step) => host.transition_to(*step),
            StepOutcome::Fail(err) => {
                log::error!("Firmware preparation failed: {}", err);
                host.set_error(err.clone());
                host.transition_to(StepId::Finish);
            }
        }
        self.outcome = Some(outcome);
    }

    fn release(&mut self) {
        if let Some(mut sub) = self.subscription.take() {
            sub.unsubscribe();
        }
    }

    fn settled_status(&self) -> PollStatus {
        if self.phase == CoordinatorPhase::Finished {
            PollStatus::Finished
        } else {
            PollStatus::Idle
        }
    }
}

impl Drop for StepCoordinator {
    fn drop(&mut self) {
        self.deactivate();
    }
}
