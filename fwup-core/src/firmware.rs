//! Firmware update data model.
//!
//! These mirror the descriptors served by the firmware manager API: the OSU
//! payload that the device confirms by hash, the final firmware it lands on,
//! and the device the update targets.

use fwup_error::{FwupError, FwupResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Hardware model of the connected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceModelId {
    #[serde(rename = "blue")]
    Blue,
    #[default]
    #[serde(rename = "nanoS")]
    NanoS,
    #[serde(rename = "nanoSP")]
    NanoSP,
    #[serde(rename = "nanoX")]
    NanoX,
    #[serde(rename = "stax")]
    Stax,
}

impl DeviceModelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceModelId::Blue => "blue",
            DeviceModelId::NanoS => "nanoS",
            DeviceModelId::NanoSP => "nanoSP",
            DeviceModelId::NanoX => "nanoX",
            DeviceModelId::Stax => "stax",
        }
    }

    pub fn all() -> &'static [DeviceModelId] {
        &[
            DeviceModelId::Blue,
            DeviceModelId::NanoS,
            DeviceModelId::NanoSP,
            DeviceModelId::NanoX,
            DeviceModelId::Stax,
        ]
    }
}

impl fmt::Display for DeviceModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceModelId {
    type Err = FwupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceModelId::all()
            .iter()
            .copied()
            .find(|model| model.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FwupError::InvalidInput(format!("unknown device model: {}", s)))
    }
}

/// What the device reported about itself when the update was planned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub version: String,
    #[serde(default)]
    pub mcu_version: String,
    #[serde(default)]
    pub target_id: u32,
    #[serde(default)]
    pub is_bootloader: bool,
    #[serde(default)]
    pub se_version: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
}

/// The on-device update payload (OSU) confirmed by the user on the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsuFirmware {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub perso: String,
    #[serde(default)]
    pub firmware: String,
    #[serde(default)]
    pub firmware_key: String,
}

impl OsuFirmware {
    /// Hash shown for on-device verification, if the payload carries a usable one.
    pub fn display_hash(&self) -> Option<&str> {
        self.hash.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }
}

/// Firmware the device ends up on once the update is complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalFirmware {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub perso: String,
    #[serde(default)]
    pub firmware: Option<String>,
    #[serde(default)]
    pub firmware_key: Option<String>,
    #[serde(default)]
    pub mcu_versions: Vec<u32>,
}

/// Everything the update wizard knows about the pending update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirmwareUpdateContext {
    #[serde(default)]
    pub osu: Option<OsuFirmware>,
    #[serde(rename = "final")]
    pub final_firmware: FinalFirmware,
    #[serde(rename = "shouldFlashMCU", default)]
    pub should_flash_mcu: bool,
}

impl FirmwareUpdateContext {
    pub fn from_json_str(s: &str) -> FwupResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| FwupError::InvalidInput(format!("invalid firmware context: {}", e)))
    }

    pub fn load(path: &Path) -> FwupResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

impl DeviceInfo {
    pub fn load(path: &Path) -> FwupResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| FwupError::InvalidInput(format!("invalid device info: {}", e)))
    }
}

/// True when the final firmware ships its own binary, which means the MCU
/// step has to run before the main update.
pub fn has_final_firmware(final_firmware: &FinalFirmware) -> bool {
    final_firmware
        .firmware
        .as_deref()
        .is_some_and(|f| !f.trim().is_empty())
}

/// Strip the `-osu` suffix the manager API appends to payload names.
pub fn clean_version(name: &str) -> &str {
    name.strip_suffix("-osu").unwrap_or(name)
}

/// Split a payload hash into the chunks displayed next to the device prompt.
///
/// Blue screens are wide enough for the whole hash on two lines; the other
/// models display a shortened `XXXX...YYYY` form that matches the device.
pub fn format_hash_name(hash: &str, model: DeviceModelId) -> Vec<String> {
    let chars: Vec<char> = hash.trim().to_uppercase().chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    if chars.len() < 8 {
        return vec![chars.into_iter().collect()];
    }

    match model {
        DeviceModelId::Blue => {
            let (head, tail) = chars.split_at(chars.len() / 2);
            vec![head.iter().collect(), tail.iter().collect()]
        }
        _ => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            vec![format!("{}...{}", head, tail)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTEXT_JSON: &str = r#"{
        "osu": {
            "id": 42,
            "name": "2.1.0-osu",
            "hash": "8f1c0a9bd7e3",
            "perso": "perso_11",
            "firmware": "nanos/2.1.0/upgrade_osu_2.1.0",
            "firmware_key": "nanos/2.1.0/upgrade_osu_2.1.0_key"
        },
        "final": {
            "id": 43,
            "name": "2.1.0",
            "version": "2.1.0",
            "perso": "perso_11",
            "mcu_versions": [7]
        },
        "shouldFlashMCU": false
    }"#;

    #[test]
    fn parses_manager_context() {
        let ctx = FirmwareUpdateContext::from_json_str(CONTEXT_JSON).unwrap();
        let osu = ctx.osu.as_ref().unwrap();
        assert_eq!(osu.id, 42);
        assert_eq!(osu.display_hash(), Some("8f1c0a9bd7e3"));
        assert_eq!(ctx.final_firmware.mcu_versions, vec![7]);
        assert!(!ctx.should_flash_mcu);
        assert!(!has_final_firmware(&ctx.final_firmware));
    }

    #[test]
    fn missing_osu_parses_as_none() {
        let ctx =
            FirmwareUpdateContext::from_json_str(r#"{"final": {"id": 1, "name": "2.0.0"}}"#)
                .unwrap();
        assert!(ctx.osu.is_none());
    }

    #[test]
    fn rejects_malformed_context() {
        let err = FirmwareUpdateContext::from_json_str("{").unwrap_err();
        assert!(matches!(err, FwupError::InvalidInput(_)));
    }

    #[test]
    fn final_firmware_predicate_needs_a_binary() {
        let mut final_firmware = FinalFirmware::default();
        assert!(!has_final_firmware(&final_firmware));
        final_firmware.firmware = Some("  ".to_string());
        assert!(!has_final_firmware(&final_firmware));
        final_firmware.firmware = Some("nanox/2.2.1/fw_2.2.1".to_string());
        assert!(has_final_firmware(&final_firmware));
    }

    #[test]
    fn clean_version_strips_osu_suffix() {
        assert_eq!(clean_version("2.1.0-osu"), "2.1.0");
        assert_eq!(clean_version("2.1.0"), "2.1.0");
    }

    #[test]
    fn hash_formatting_by_model() {
        assert!(format_hash_name("", DeviceModelId::NanoX).is_empty());
        assert_eq!(format_hash_name("abc", DeviceModelId::NanoS), vec!["ABC"]);
        assert_eq!(
            format_hash_name("8f1c0a9bd7e3", DeviceModelId::NanoX),
            vec!["8F1C...D7E3"]
        );
        assert_eq!(
            format_hash_name("8f1c0a9bd7e3", DeviceModelId::Blue),
            vec!["8F1C0A", "9BD7E3"]
        );
    }

    #[test]
    fn hash_formatting_counts_characters_not_bytes() {
        assert_eq!(format_hash_name("aéééé", DeviceModelId::NanoX), vec!["AÉÉÉÉ"]);
        assert_eq!(
            format_hash_name("aéééébcdé", DeviceModelId::NanoX),
            vec!["AÉÉÉ...BCDÉ"]
        );
        assert_eq!(
            format_hash_name("ééééabcd", DeviceModelId::Blue),
            vec!["ÉÉÉÉ", "ABCD"]
        );
    }

    #[test]
    fn device_model_round_trips_through_str() {
        assert_eq!("nanoX".parse::<DeviceModelId>().unwrap(), DeviceModelId::NanoX);
        assert_eq!("NANOSP".parse::<DeviceModelId>().unwrap(), DeviceModelId::NanoSP);
        assert!("nanoZ".parse::<DeviceModelId>().is_err());
        assert_eq!(DeviceModelId::Stax.to_string(), "stax");
    }

    #[test]
    fn device_info_uses_camel_case() {
        let info: DeviceInfo = serde_json::from_str(
            r#"{
                "version": "2.0.0",
                "mcuVersion": "2.30",
                "targetId": 823132164,
                "isBootloader": false,
                "providerName": "das"
            }"#,
        )
        .unwrap();
        assert_eq!(info.mcu_version, "2.30");
        assert_eq!(info.provider_name.as_deref(), Some("das"));
        assert_eq!(info.target_id, 823132164);
    }
}
