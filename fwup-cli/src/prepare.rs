//! `fwup prepare` command implementation

use anyhow::{Context, Result};
use fwup_core::{Config, DeviceInfo, DeviceModelId, FirmwareUpdateContext, TransportMode};
use fwup_device::{CommandTransport, FirmwareTransport, SimulatedTransport};
use fwup_error::TransportError;
use fwup_workflow::{FirmwareUpdateWizard, StepCoordinator, StepId, StepOutcome, WizardContext};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Result of one run of the install step.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareReport {
    /// `None` when the run was cancelled before the stream settled.
    pub outcome: Option<StepOutcome>,
    pub current_step: StepId,
    pub error: Option<TransportError>,
}

impl PrepareReport {
    pub fn cancelled(&self) -> bool {
        self.outcome.is_none()
    }
}

/// Pick the event source for `mode`. This is the only place that decides
/// between the device and the simulation.
pub fn build_transport(cfg: &Config, mode: TransportMode) -> Arc<dyn FirmwareTransport> {
    match mode {
        TransportMode::Device => {
            log::info!("Using device transport: {}", cfg.transport.program);
            Arc::new(CommandTransport::from_config(&cfg.transport))
        }
        TransportMode::Simulated => {
            log::info!("Using simulated transport");
            Arc::new(SimulatedTransport::from_config(&cfg.simulation))
        }
    }
}

pub fn load_context(
    firmware: &Path,
    device_id: Option<String>,
    device_model: DeviceModelId,
    device_info: Option<&Path>,
) -> Result<WizardContext> {
    let firmware = FirmwareUpdateContext::load(firmware)
        .with_context(|| format!("Failed to read firmware context {}", firmware.display()))?;
    let info = match device_info {
        Some(path) => DeviceInfo::load(path)
            .with_context(|| format!("Failed to read device info {}", path.display()))?,
        None => DeviceInfo::default(),
    };

    let mut ctx = WizardContext::new(firmware).with_device_info(info);
    ctx.device_id = device_id;
    ctx.device_model_id = device_model;
    Ok(ctx)
}

/// Run the install step to completion, printing each new view to `out`.
pub fn run_prepare(
    transport: Arc<dyn FirmwareTransport>,
    ctx: WizardContext,
    cancel: &AtomicBool,
    out: &mut dyn Write,
) -> Result<PrepareReport> {
    let mut wizard = FirmwareUpdateWizard::new();
    let mut step = StepCoordinator::new(transport, ctx);
    let mut last_line = step.view().to_string();
    let mut write_err = None;

    writeln!(out, "{}", last_line)?;
    step.activate(&mut wizard);

    let mut show = |line: String| {
        if line != last_line && write_err.is_none() {
            if let Err(e) = writeln!(out, "{}", line) {
                write_err = Some(e);
            }
            last_line = line;
        }
    };
    let outcome = {
        let context = step.context().clone();
        step.run_until_finished(&mut wizard, cancel, |state| {
            show(fwup_workflow::InstallView::select(state, &context).to_string())
        })
        .cloned()
    };
    if let Some(e) = write_err {
        return Err(e).context("Failed to write progress");
    }

    Ok(PrepareReport {
        outcome,
        current_step: wizard.current_step(),
        error: wizard.error().cloned(),
    })
}
