//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Help text for the transport argument
const TRANSPORT_HELP: &str = "Transport to use: linux_i2c[:devdir=/dev] or \
    dummy[:absent=0x51/0x52,size=256] (see list-transports)";

#[derive(Parser)]
#[command(name = "boardid")]
#[command(author, version, about = "Board identification EEPROM tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML)
    /// Defaults to ./boardid.toml, then /etc/boardid/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Board type table (JSON)
    /// Overrides the `board_types` entry of the configuration
    #[arg(long, global = true)]
    pub board_types: Option<PathBuf>,

    #[arg(short, long, global = true, default_value = "linux_i2c", help = TRANSPORT_HELP)]
    pub transport: String,

    /// Answer prompts from a file, one answer per line
    #[arg(long, global = true)]
    pub script: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect which boards are fitted
    Probe,

    /// Read and show the record of every board
    Read,

    /// Prompt for values and program every fitted board
    Write {
        /// Offer the values currently on each device as defaults
        #[arg(long)]
        from_device: bool,
    },

    /// Erase every fitted board
    Clear {
        /// Only erase the first half of each device
        #[arg(long)]
        half: bool,
    },

    /// List the board type table
    ListTypes,

    /// List available transports
    ListTransports,
}
