use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub mod cancel;
pub mod cli;
pub mod memo;
pub mod prepare;

pub fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    fwup_core::logging::init_with(cli.log_file.clone());

    match &cli.command {
        cli::Command::Prepare {
            firmware,
            device_id,
            device_model,
            device_info,
        } => {
            let cfg = fwup_core::Config::load(&cli.config)
                .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
            let mock_env = std::env::var(fwup_core::config::MOCK_ENV).ok();
            let mode = cfg.effective_mode(cli.mock, mock_env.as_deref());
            let transport = prepare::build_transport(&cfg, mode);
            let ctx = prepare::load_context(
                firmware,
                device_id.clone(),
                *device_model,
                device_info.as_deref(),
            )?;

            let cancel = Arc::new(AtomicBool::new(false));
            cancel::install_ctrlc_handler(Arc::clone(&cancel))?;

            log::info!("📦 Preparing firmware update...");
            let report =
                prepare::run_prepare(transport, ctx, &cancel, &mut std::io::stdout().lock())?;

            if report.cancelled() {
                println!("🛑 Cancelled. No step transition was made.");
                return Ok(());
            }
            if let Some(err) = &report.error {
                println!("❌ Firmware preparation failed. Next step: {}", report.current_step);
                anyhow::bail!("Firmware preparation failed: {}", err);
            }
            println!("✅ Next step: {}", report.current_step);
        }
        cli::Command::Memo {
            transaction,
            memo: text,
            account_id,
        } => {
            memo::run(transaction, text, account_id)?;
        }
        cli::Command::Identifier { hash, device_model } => {
            for chunk in fwup_core::format_hash_name(hash, *device_model) {
                println!("{}", chunk);
            }
        }
    }

    Ok(())
}
