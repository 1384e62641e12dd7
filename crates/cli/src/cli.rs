//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use trackloop_cli::overrides::Overrides;

/// trackloop - shared-memory frame to correction control loop
#[derive(Parser, Debug)]
#[command(
    name = "trackloop",
    author,
    version,
    about = "Frame-to-correction tracking control loop",
    long_about = "Polls frames published to a shared-memory region, runs perception, \n\
                  filters and predicts the tracked point, and sends bounded correction \n\
                  vectors to an actuation endpoint over UDP."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TRACKLOOP_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TRACKLOOP_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when absent
    #[arg(short, long, env = "TRACKLOOP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override shared-memory region path
    #[arg(long, env = "TRACKLOOP_REGION")]
    pub region: Option<PathBuf>,

    /// Override correction target (host:port)
    #[arg(long, env = "TRACKLOOP_TARGET")]
    pub target: Option<String>,

    /// Override gain profile (A / B / C or a custom key)
    #[arg(long, env = "TRACKLOOP_PROFILE")]
    pub profile: Option<String>,

    /// Maximum number of frames to process (0 = unlimited)
    #[arg(long, default_value = "0", env = "TRACKLOOP_MAX_FRAMES")]
    pub max_frames: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "TRACKLOOP_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and startup checks, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Publish a synthetic moving figure into the region (no external producer)
    #[arg(long, env = "TRACKLOOP_SYNTHETIC")]
    pub synthetic: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TRACKLOOP_METRICS_PORT")]
    pub metrics_port: u16,
}

impl RunArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            region: self.region.clone(),
            target: self.target.clone(),
            profile: self.profile.clone(),
        }
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "trackloop.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file (defaults apply when absent)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the full gain profile table
    #[arg(long)]
    pub profiles: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
