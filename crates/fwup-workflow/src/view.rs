//! What the install step shows, derived from progress and context.

use crate::progress::ProgressState;
use crate::wizard::WizardContext;
use fwup_core::{clean_version, format_hash_name};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum InstallView {
    /// Payload still downloading to the device.
    Downloading { progress: f64 },
    /// Device shows the payload hash; the user compares it with `identifier`.
    ConfirmIdentifier { identifier: Vec<String> },
    /// Device asks to install the new firmware version.
    ConfirmNewFirmware {
        version: String,
        current_version: String,
    },
}

impl InstallView {
    pub fn select(state: &ProgressState, ctx: &WizardContext) -> InstallView {
        if !state.displayed_on_device {
            return InstallView::Downloading {
                progress: state.progress,
            };
        }

        let hash = ctx
            .firmware
            .osu
            .as_ref()
            .and_then(|osu| osu.display_hash());
        match hash {
            Some(hash) => InstallView::ConfirmIdentifier {
                identifier: format_hash_name(hash, ctx.device_model_id),
            },
            None => InstallView::ConfirmNewFirmware {
                version: clean_version(&ctx.firmware.final_firmware.name).to_string(),
                current_version: ctx.device_info.version.clone(),
            },
        }
    }
}

impl fmt::Display for InstallView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallView::Downloading { progress } => {
                write!(f, "Downloading update... {:.0}%", progress * 100.0)
            }
            InstallView::ConfirmIdentifier { identifier } => {
                write!(f, "Confirm identifier on device: {}", identifier.join(" "))
            }
            InstallView::ConfirmNewFirmware {
                version,
                current_version,
            } => {
                if current_version.is_empty() {
                    write!(f, "Confirm firmware {} on device", version)
                } else {
                    write!(
                        f,
                        "Confirm firmware {} on device (currently {})",
                        version, current_version
                    )
                }
            }
        }
    }
}
