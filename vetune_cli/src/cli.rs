//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "vetune", version, about = "Live VE correction from RPM/MAP/AFR telemetry")]
pub struct Cli {
    /// Path to config TOML (typed); built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sparse target AFR CSV (strict header: map_kpa,afr)
    #[arg(long, value_name = "FILE", conflicts_with = "target_grid")]
    pub targets: Option<PathBuf>,

    /// Full RPM x MAP target grid CSV (header: rpm,<map1>,<map2>,...)
    #[arg(long = "target-grid", value_name = "FILE")]
    pub target_grid: Option<PathBuf>,

    /// Engine preset, overriding engine.preset from the config
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Output JSON lines instead of text tables
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a recorded telemetry CSV through the engine and print the result
    Replay {
        /// Telemetry CSV (headers: rpm,map_kpa,afr[,live])
        #[arg(long, value_name = "FILE")]
        log: PathBuf,
        /// Poll rate in Hz for the sampler thread (defaults to sampler.poll_hz)
        #[arg(long, value_name = "HZ", conflicts_with = "direct")]
        hz: Option<u32>,
        /// Read the log inside the tick loop (no sampler thread)
        #[arg(long, action = ArgAction::SetTrue)]
        direct: bool,
        /// Write the correction grid as CSV to this file
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Print per-outcome tick counts
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// List built-in engine presets and their grid layouts
    Presets,
    /// Validate config and target files, then run one synthetic tick
    SelfCheck,
}
