//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};

/// skysync - keep SkyDNS host records in etcd in sync.
#[derive(Parser, Debug)]
#[command(name = "skysync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Comma-separated etcd endpoints, overriding the config file.
    #[arg(long, global = true)]
    pub endpoints: Option<String>,

    /// Certificate directory, overriding the config file.
    #[arg(long, global = true)]
    pub cert_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to etcd and report readiness.
    Check(commands::CheckArgs),
    /// Apply an ipHosts document.
    Apply(commands::ApplyArgs),
}
