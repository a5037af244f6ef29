//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Bag Replay - Flight-test communication log replay pipeline
#[derive(Parser, Debug)]
#[command(
    name = "bag-replay",
    author,
    version,
    about = "Flight-test communication log replay pipeline",
    long_about = "Replays recorded flight-test communication logs.\n\n\
                  Reads an MCAP container (bare or packed in a .tgz archive), decodes \n\
                  the CDR-encoded messages, normalizes them into a canonical event \n\
                  sequence, and steps a fixed-timestep world-state reconstruction."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BAG_REPLAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BAG_REPLAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded log into world-state frames
    Run(RunArgs),

    /// Dump the canonical event sequence without stepping
    Events(EventsArgs),

    /// Display channel information from a log container
    Info(InfoArgs),

    /// Validate a mission configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to mission configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "mission.toml",
        env = "BAG_REPLAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Path to the recorded log (.mcap file or .tgz archive)
    #[arg(short, long, env = "BAG_REPLAY_BAG")]
    pub bag: PathBuf,

    /// Override replay timestep in seconds from configuration
    #[arg(long, env = "BAG_REPLAY_TIMESTEP")]
    pub timestep: Option<f64>,

    /// Maximum number of frames to produce (0 = unlimited)
    #[arg(long, default_value = "0", env = "BAG_REPLAY_MAX_FRAMES")]
    pub max_frames: u64,

    /// Write produced frames as JSON lines to this path
    #[arg(long, env = "BAG_REPLAY_EXPORT")]
    pub export: Option<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BAG_REPLAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and bag path, then exit without stepping
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `events` command
#[derive(Parser, Debug)]
pub struct EventsArgs {
    /// Path to mission configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "mission.toml",
        env = "BAG_REPLAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Path to the recorded log (.mcap file or .tgz archive)
    #[arg(short, long, env = "BAG_REPLAY_BAG")]
    pub bag: PathBuf,

    /// Output serialization format
    #[arg(long, value_enum, default_value = "jsonl")]
    pub format: ExportFormat,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to the recorded log (.mcap file or .tgz archive)
    #[arg(short, long, env = "BAG_REPLAY_BAG")]
    pub bag: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to mission configuration file to validate
    #[arg(short, long, default_value = "mission.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Event export format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON lines, one event per line
    #[default]
    Jsonl,
    /// CSV with the union of kind-specific columns
    Csv,
}
