//! fwup configuration (TOML).
//!
//! Every section is optional; a missing file and an empty file both yield
//! `Config::default()`.

use fwup_error::{FwupError, FwupResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable that forces the simulated transport.
pub const MOCK_ENV: &str = "FWUP_MOCK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// Talk to the device through the configured helper program.
    #[default]
    Device,
    /// Replay a simulated update stream, no device required.
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub mode: TransportMode,
    pub program: String,
    pub args: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::Device,
            program: "firmware-prepare".to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub step_delay_ms: u64,
    /// Progress events emitted before the device shows its prompt.
    pub steps: u32,
    /// End the simulated stream with this error instead of completing.
    pub fail_with: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: 40,
            steps: 10,
            fail_with: None,
        }
    }
}

impl SimulationConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportConfig,
    pub simulation: SimulationConfig,
}

impl Config {
    pub fn from_toml_str(raw: &str) -> FwupResult<Self> {
        let cfg: Config = toml::from_str(raw).map_err(|e| FwupError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path`; a missing file falls back to defaults.
    pub fn load(path: &Path) -> FwupResult<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> FwupResult<()> {
        if self.transport.mode == TransportMode::Device && self.transport.program.trim().is_empty()
        {
            return Err(FwupError::Config(
                "transport.program must be set when transport.mode = \"device\"".to_string(),
            ));
        }
        if self.simulation.steps == 0 {
            return Err(FwupError::Config(
                "simulation.steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the transport mode at the composition root.
    ///
    /// `--mock` and a truthy `FWUP_MOCK` value both override the file.
    pub fn effective_mode(&self, mock_flag: bool, mock_env: Option<&str>) -> TransportMode {
        if mock_flag || mock_env.is_some_and(is_truthy) {
            TransportMode::Simulated
        } else {
            self.transport.mode
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
