//! CLI argument parsing for fwup

use clap::{Parser, Subcommand};
use fwup_core::DeviceModelId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fwup")]
#[command(about = "fwup - firmware update wizard for hardware wallets")]
#[command(long_about = "fwup - firmware update wizard for hardware wallets\n\n\
    Runs the firmware payload install step against a connected device (or a\n\
    simulated one with --mock / FWUP_MOCK=1) and reports the next wizard step.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML). Missing file means defaults.
    #[arg(long, default_value = "fwup.toml", global = true)]
    pub config: PathBuf,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Use the simulated device transport
    #[arg(long, global = true)]
    pub mock: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download the firmware payload and wait for on-device confirmation
    Prepare {
        /// Firmware update context (JSON, as served by the manager API)
        #[arg(long)]
        firmware: PathBuf,

        /// Device identifier passed to the transport
        #[arg(long)]
        device_id: Option<String>,

        /// Device model (blue, nanoS, nanoSP, nanoX, stax)
        #[arg(long, default_value = "nanoS")]
        device_model: DeviceModelId,

        /// Device info reported by the device (JSON)
        #[arg(long)]
        device_info: Option<PathBuf>,
    },

    /// Set the memo of a Hedera transaction and print the summary route
    Memo {
        /// Transaction being built (JSON)
        #[arg(long)]
        transaction: PathBuf,

        /// New memo text
        #[arg(long)]
        memo: String,

        /// Account the transaction is sent from
        #[arg(long, default_value = "")]
        account_id: String,
    },

    /// Print the identifier shown next to the on-device hash prompt
    Identifier {
        /// Payload hash
        hash: String,

        /// Device model (blue, nanoS, nanoSP, nanoX, stax)
        #[arg(long, default_value = "nanoS")]
        device_model: DeviceModelId,
    },
}
