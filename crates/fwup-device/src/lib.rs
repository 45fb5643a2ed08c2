//! fwup device layer.
//!
//! Event stream sources for the firmware-update wizard: the cancellable
//! [`Subscription`] handle, the [`FirmwareTransport`] seam and its real
//! (helper process) and simulated implementations.

pub mod subscription;
pub mod transport;

pub use subscription::{EventSink, FirmwarePrepareEvent, StreamMessage, Subscription};
pub use transport::{
    CommandTransport, FirmwarePrepareRequest, FirmwareTransport, Operation, SimulatedStep,
    SimulatedTransport,
};
