//! Ctrl+C cancellation handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static HANDLER_SET: OnceLock<()> = OnceLock::new();

/// Raise `flag` on Ctrl+C. Only the first call installs a handler.
pub fn install_ctrlc_handler(flag: Arc<AtomicBool>) -> anyhow::Result<()> {
    if HANDLER_SET.get().is_some() {
        return Ok(());
    }

    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        log::info!("Cancellation requested (Ctrl+C).");
    })?;

    let _ = HANDLER_SET.set(());
    Ok(())
}
