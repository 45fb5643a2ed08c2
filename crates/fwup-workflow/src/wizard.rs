//! Firmware update wizard: steps, the host seam, and a concrete host.

use fwup_core::{DeviceInfo, DeviceModelId, FirmwareUpdateContext};
use fwup_error::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Steps of the firmware update wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepId {
    /// Download the OSU and confirm its identifier on the device.
    #[serde(rename = "idCheck")]
    IdCheck,
    #[serde(rename = "updateMCU")]
    UpdateMcu,
    #[serde(rename = "updating")]
    Updating,
    #[serde(rename = "finish")]
    Finish,
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::IdCheck => "idCheck",
            StepId::UpdateMcu => "updateMCU",
            StepId::Updating => "updating",
            StepId::Finish => "finish",
        }
    }

    pub fn all() -> &'static [StepId] {
        &[
            StepId::IdCheck,
            StepId::UpdateMcu,
            StepId::Updating,
            StepId::Finish,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            StepId::IdCheck => "Install firmware payload",
            StepId::UpdateMcu => "Update MCU",
            StepId::Updating => "Update firmware",
            StepId::Finish => "Finish",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one step activation, as forwarded to the wizard.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    AdvanceTo(StepId),
    Fail(TransportError),
}

/// Per-activation input handed to a step by its wizard.
///
/// Fixed for the lifetime of one activation: a wizard that needs different
/// firmware or another device starts a new activation.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardContext {
    pub firmware: FirmwareUpdateContext,
    pub device_id: Option<String>,
    pub device_model_id: DeviceModelId,
    pub device_info: DeviceInfo,
}

impl WizardContext {
    pub fn new(firmware: FirmwareUpdateContext) -> Self {
        Self {
            firmware,
            device_id: None,
            device_model_id: DeviceModelId::default(),
            device_info: DeviceInfo::default(),
        }
    }

    pub fn with_device(mut self, device_id: impl Into<String>, model: DeviceModelId) -> Self {
        self.device_id = Some(device_id.into());
        self.device_model_id = model;
        self
    }

    pub fn with_device_info(mut self, info: DeviceInfo) -> Self {
        self.device_info = info;
        self
    }
}

/// Callbacks a step uses to drive its parent wizard.
pub trait WizardHost {
    fn transition_to(&mut self, step: StepId);
    fn set_error(&mut self, err: TransportError);
}

/// Wizard state for the firmware update modal.
#[derive(Debug, Clone, PartialEq)]
pub struct FirmwareUpdateWizard {
    current_step: StepId,
    error: Option<TransportError>,
    history: Vec<StepId>,
}

impl Default for FirmwareUpdateWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl FirmwareUpdateWizard {
    pub fn new() -> Self {
        Self {
            current_step: StepId::IdCheck,
            error: None,
            history: Vec::new(),
        }
    }

    pub fn current_step(&self) -> StepId {
        self.current_step
    }

    pub fn error(&self) -> Option<&TransportError> {
        self.error.as_ref()
    }

    /// Steps transitioned to, in order.
    pub fn history(&self) -> &[StepId] {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.current_step == StepId::Finish
    }
}

impl WizardHost for FirmwareUpdateWizard {
    fn transition_to(&mut self, step: StepId) {
        log::info!("Wizard: {} -> {}", self.current_step, step);
        self.current_step = step;
        self.history.push(step);
    }

    fn set_error(&mut self, err: TransportError) {
        log::error!("Wizard error: {}", err);
        self.error = Some(err);
    }
}
