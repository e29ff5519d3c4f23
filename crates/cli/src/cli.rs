//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// gosync - synchronized start relay and clock-sync client
#[derive(Parser, Debug)]
#[command(
    name = "gosync",
    author,
    version,
    about = "Synchronized start relay and clock-sync client",
    long_about = "Runs a WebSocket relay that hands every member of a room the same\n\
                  start instant, or connects to one as a client that estimates its\n\
                  clock offset and counts down to that instant."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "GOSYNC_VERBOSE")]
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
        env = "GOSYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the start relay
    Serve(ServeArgs),

    /// Connect to a relay, join a room and count down to each start
    Connect(ConnectArgs),

    /// Validate a configuration file without running anything
    Validate(ValidateArgs),
}

/// Arguments for the `serve` command
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "GOSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the bind address
    #[arg(long)]
    pub host: Option<String>,

    /// Override the listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Override the minimum lead time in milliseconds
    #[arg(long)]
    pub min_lead_ms: Option<u64>,

    /// Prometheus exporter port (0 = disabled)
    #[arg(long, env = "GOSYNC_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `connect` command
#[derive(Parser, Debug, Clone)]
pub struct ConnectArgs {
    /// Configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "GOSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Relay WebSocket URL, e.g. ws://localhost:8080/ws
    #[arg(short, long)]
    pub server: Option<String>,

    /// Room to join
    #[arg(short, long)]
    pub room: String,

    /// Request a start this many milliseconds out once joined
    #[arg(long, value_name = "DELAY_MS")]
    pub start: Option<f64>,

    /// Exit after the first GO
    #[arg(long)]
    pub once: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "gosync.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

impl Cli {
    /// Filter applied when `RUST_LOG` is unset
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
