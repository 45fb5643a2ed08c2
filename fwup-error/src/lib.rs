use std::io;
use thiserror::Error;

pub type FwupResult<T> = Result<T, FwupError>;

/// Failure reported by a firmware event stream.
///
/// This is the only error kind a step coordinator ever sees; it is recorded on
/// the wizard and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Device disconnected")]
    Disconnected,

    #[error("Failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("Command failed: {program} (exit={code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Device error: {0}")]
    Device(String),
}

impl TransportError {
    /// Map a free-form error string (e.g. from a simulated stream) onto the taxonomy.
    pub fn from_message(msg: &str) -> Self {
        match msg.trim().to_ascii_lowercase().as_str() {
            "disconnected" | "disconnected device" => TransportError::Disconnected,
            _ => TransportError::Device(msg.trim().to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum FwupError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bridge rejected transaction: {0}")]
    Bridge(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_message_maps_to_variant() {
        assert_eq!(
            TransportError::from_message("disconnected"),
            TransportError::Disconnected
        );
        assert_eq!(
            TransportError::from_message(" Disconnected "),
            TransportError::Disconnected
        );
    }

    #[test]
    fn unknown_message_is_kept_as_device_error() {
        assert_eq!(
            TransportError::from_message("user refused on device"),
            TransportError::Device("user refused on device".to_string())
        );
    }

    #[test]
    fn transport_error_converts_into_fwup_error() {
        let err: FwupError = TransportError::Disconnected.into();
        assert_eq!(err.to_string(), "Device disconnected");
    }
}
