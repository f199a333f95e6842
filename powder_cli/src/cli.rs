//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "powdersense", version, about = "PowderSense instrument CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/powdersense.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Shape of the simulated charge cycle driving the analog probe.
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct SimArgs {
    /// Raw reading of the empty pan
    #[arg(long = "sim-zero", value_name = "RAW", default_value_t = 1_000)]
    pub zero: i32,
    /// Raw reading with a full charge on the pan
    #[arg(long = "sim-plateau", value_name = "RAW", default_value_t = 1_250)]
    pub plateau: i32,
    /// Time spent ramping from empty to full
    #[arg(long = "sim-ramp-ms", value_name = "MS", default_value_t = 2_000)]
    pub ramp_ms: u64,
    /// Time the full charge stays on the pan
    #[arg(long = "sim-hold-ms", value_name = "MS", default_value_t = 2_000)]
    pub hold_ms: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the instrument loop against simulated hardware.
    ///
    /// JSON commands are read line by line from stdin; broadcasts are
    /// printed to stdout as JSON lines.
    Run {
        /// Stop after this many ticks (runs until Ctrl-C otherwise)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Skip the cooperative delay between ticks
        #[arg(long, action = ArgAction::SetTrue)]
        no_delay: bool,
        #[command(flatten)]
        sim: SimArgs,
    },
    /// Validate config, mount storage and load the settings record
    SelfCheck,
    /// List persisted session logs, or print one session's summary
    Sessions {
        /// Session log index
        #[arg(long, value_name = "I")]
        index: Option<i64>,
    },
}
