//! Progress tracking for the firmware payload download.

use fwup_device::FirmwarePrepareEvent;

/// Download progress and whether the device is now prompting the user.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressState {
    /// Fraction downloaded, always within `[0, 1]`.
    pub progress: f64,
    pub displayed_on_device: bool,
}

impl ProgressState {
    /// Overwrite both fields from a stream event. Returns `true` if anything
    /// visible changed.
    pub fn apply_event(&mut self, event: FirmwarePrepareEvent) -> bool {
        let progress = clamp_progress(event.progress);
        let changed =
            progress != self.progress || event.displayed_on_device != self.displayed_on_device;
        self.progress = progress;
        self.displayed_on_device = event.displayed_on_device;
        changed
    }

    /// Progress as a whole percentage, for display.
    pub fn percent(&self) -> u8 {
        (self.progress * 100.0).round() as u8
    }
}

fn clamp_progress(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
