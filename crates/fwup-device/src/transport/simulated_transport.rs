//! Simulated firmware transport.
//!
//! Records every request without touching a device. Streams are either
//! replayed from a script on a worker thread, or driven by hand through
//! `emit_*` (tests and demo tooling).

use super::{FirmwarePrepareRequest, FirmwareTransport};
use crate::subscription::{self, EventSink, FirmwarePrepareEvent, Subscription};
use fwup_core::SimulationConfig;
use fwup_error::TransportError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Operation records for verification.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    FirmwarePrepare {
        device_id: String,
        osu_name: Option<String>,
    },
}

/// One step of a scripted stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatedStep {
    Next(FirmwarePrepareEvent),
    Delay(Duration),
    Complete,
    Fail(TransportError),
}

#[derive(Debug, Clone)]
enum Mode {
    Scripted(Vec<SimulatedStep>),
    Manual,
}

#[derive(Debug, Default)]
struct SimulatedState {
    operations: Vec<Operation>,
    /// Producer half of the latest manual stream.
    live: Option<EventSink>,
    /// Cancel flag of the latest stream, kept after the sink is consumed.
    last_cancel: Option<Arc<AtomicBool>>,
}

#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    mode: Mode,
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedTransport {
    /// Replay `steps` on a worker thread for every request.
    pub fn scripted(steps: Vec<SimulatedStep>) -> Self {
        Self {
            mode: Mode::Scripted(steps),
            state: Arc::default(),
        }
    }

    /// Streams stay open until driven with `emit_*`.
    pub fn manual() -> Self {
        Self {
            mode: Mode::Manual,
            state: Arc::default(),
        }
    }

    /// A download ramp of `cfg.steps` events, the on-device prompt, then
    /// completion (or `cfg.fail_with`).
    pub fn from_config(cfg: &SimulationConfig) -> Self {
        let steps = cfg.steps.max(1);
        let delay = cfg.step_delay();
        let mut script = Vec::with_capacity(steps as usize * 2 + 3);
        for i in 1..=steps {
            script.push(SimulatedStep::Next(FirmwarePrepareEvent::new(
                f64::from(i) / f64::from(steps),
                false,
            )));
            script.push(SimulatedStep::Delay(delay));
        }
        script.push(SimulatedStep::Next(FirmwarePrepareEvent::new(1.0, true)));
        script.push(SimulatedStep::Delay(delay));
        script.push(match cfg.fail_with.as_deref() {
            Some(msg) => SimulatedStep::Fail(TransportError::from_message(msg)),
            None => SimulatedStep::Complete,
        });
        Self::scripted(script)
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    pub fn operation_count(&self) -> usize {
        self.lock().operations.len()
    }

    /// Whether the consumer released the most recent stream.
    ///
    /// `None` when no stream was ever requested.
    pub fn last_stream_released(&self) -> Option<bool> {
        self.lock()
            .last_cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
    }

    /// Push a progress event into the live manual stream.
    pub fn emit_next(&self, progress: f64, displayed_on_device: bool) -> bool {
        let state = self.lock();
        match state.live.as_ref() {
            Some(sink) => sink.next(FirmwarePrepareEvent::new(progress, displayed_on_device)),
            None => false,
        }
    }

    pub fn emit_complete(&self) -> bool {
        match self.take_live() {
            Some(sink) => {
                sink.complete();
                true
            }
            None => false,
        }
    }

    pub fn emit_error(&self, err: TransportError) -> bool {
        match self.take_live() {
            Some(sink) => {
                sink.error(err);
                true
            }
            None => false,
        }
    }

    fn take_live(&self) -> Option<EventSink> {
        self.lock().live.take()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl FirmwareTransport for SimulatedTransport {
    fn firmware_prepare(&self, request: &FirmwarePrepareRequest) -> Subscription {
        log::info!(
            "SIMULATED: firmware prepare for device {:?}",
            request.device_id
        );
        let mut state = self.lock();
        state.operations.push(Operation::FirmwarePrepare {
            device_id: request.device_id.clone(),
            osu_name: request.firmware.osu.as_ref().map(|osu| osu.name.clone()),
        });

        match &self.mode {
            Mode::Manual => {
                let (sink, sub) = subscription::channel("simulated");
                state.last_cancel = Some(sink.cancel_flag());
                state.live = Some(sink);
                sub
            }
            Mode::Scripted(steps) => {
                let steps = steps.clone();
                let (sink, sub) = subscription::channel("simulated");
                state.last_cancel = Some(sink.cancel_flag());
                std::thread::spawn(move || replay(steps, sink));
                sub
            }
        }
    }
}

fn replay(steps: Vec<SimulatedStep>, sink: EventSink) {
    for step in steps {
        if sink.is_cancelled() {
            log::debug!("SIMULATED: stream released, stopping replay");
            return;
        }
        match step {
            SimulatedStep::Next(event) => {
                if !sink.next(event) {
                    return;
                }
            }
            SimulatedStep::Delay(d) => std::thread::sleep(d),
            SimulatedStep::Complete => {
                sink.complete();
                return;
            }
            SimulatedStep::Fail(err) => {
                sink.error(err);
                return;
            }
        }
    }
    // A script without a terminal step ends like a dropped connection.
    log::debug!("SIMULATED: script ended without a terminal step");
}
