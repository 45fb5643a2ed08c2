//! fwup core library.
//!
//! `fwup-core` holds the firmware-update data model, configuration and logging
//! setup shared by the transport, workflow and CLI crates.

pub mod config;
pub mod firmware;
pub mod logging;

pub use config::{Config, SimulationConfig, TransportConfig, TransportMode};
pub use firmware::{
    clean_version, format_hash_name, has_final_firmware, DeviceInfo, DeviceModelId,
    FinalFirmware, FirmwareUpdateContext, OsuFirmware,
};
