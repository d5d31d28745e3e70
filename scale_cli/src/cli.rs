//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "scale", version, about = "Multi-channel load-cell scale")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/scale_config.toml")]
    pub config: PathBuf,

    /// Override the persisted channel-state file from the config
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Log and print results as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); defaults to logging.level, then info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Confirm every calibration prompt without asking
    #[arg(long, short = 'y', action = ArgAction::SetTrue, global = true)]
    pub yes: bool,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Take one datapoint on every channel
    Read,
    /// Zero a channel with nothing on it
    Tare {
        #[arg(long, default_value_t = 0)]
        channel: usize,
    },
    /// Two-point calibration with a known reference weight
    Calibrate {
        #[arg(long, default_value_t = 0)]
        channel: usize,
        /// Reference weight in grams (defaults to calibration.reference_grams)
        #[arg(long, value_name = "GRAMS")]
        grams: Option<u32>,
    },
    /// Check the stored calibration against a known weight
    Verify {
        #[arg(long, default_value_t = 0)]
        channel: usize,
        /// Reference weight in grams (defaults to calibration.reference_grams)
        #[arg(long, value_name = "GRAMS")]
        grams: Option<u32>,
        /// Accepted relative error (defaults to calibration.verify_tolerance)
        #[arg(long, value_name = "RATIO")]
        tolerance: Option<f32>,
    },
    /// Poll all channels, using the short interval while weight is changing
    Watch {
        /// Stop after this many polls (default: until Ctrl-C)
        #[arg(long, value_name = "N")]
        iterations: Option<u64>,
    },
    /// Run the converter's analog front-end calibration and wait for it
    Afe {
        #[arg(long, default_value_t = 0)]
        channel: usize,
    },
    /// Quick health check: bind every converter and take one raw read
    SelfCheck,
}
