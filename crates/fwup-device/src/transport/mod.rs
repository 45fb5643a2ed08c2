//! Firmware event stream sources.
//!
//! [`FirmwareTransport`] is the seam between the update wizard and whatever
//! talks to the device. [`CommandTransport`] drives a real device through a
//! helper program; [`SimulatedTransport`] replays a scripted stream for
//! demos and tests. Callers pick one explicitly and inject it.

pub mod command_transport;
pub mod simulated_transport;

pub use command_transport::CommandTransport;
pub use simulated_transport::{Operation, SimulatedStep, SimulatedTransport};

use crate::subscription::Subscription;
use fwup_core::FirmwareUpdateContext;

/// Arguments of the firmware-prepare command.
#[derive(Debug, Clone, PartialEq)]
pub struct FirmwarePrepareRequest {
    pub device_id: String,
    pub firmware: FirmwareUpdateContext,
}

impl FirmwarePrepareRequest {
    pub fn new(device_id: impl Into<String>, firmware: FirmwareUpdateContext) -> Self {
        Self {
            device_id: device_id.into(),
            firmware,
        }
    }
}

/// Source of firmware-prepare event streams.
///
/// Starting a stream never fails synchronously: problems such as a missing
/// helper program are delivered as the stream's terminal error.
pub trait FirmwareTransport: Send + Sync {
    fn firmware_prepare(&self, request: &FirmwarePrepareRequest) -> Subscription;
}
