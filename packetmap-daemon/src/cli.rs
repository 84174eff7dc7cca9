//! CLI argument definitions for packetmap-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Packetmap geographic traffic observation daemon.
///
/// Captures TCP traffic, classifies network block tokens to their
/// country of origin, and maintains a decaying per-country activity
/// ledger.
#[derive(Parser, Debug)]
#[command(name = "packetmap-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to packetmap.toml configuration file.
    #[arg(short, long, default_value = "/etc/packetmap/packetmap.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}
