//! skysync - unified CLI entrypoint.
//!
//! Usage:
//!   skysync check [--config config/skysync.toml]
//!   skysync apply --records dnsconfig.json [--dry-run]

use anyhow::Result;
use clap::Parser;
use skysync::cli::commands::{init_tracing, load_config, run_apply, run_check};
use skysync::cli::{Cli, Commands};
use skysync::config::ConfigOverrides;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/skysync.toml"));

    let overrides = ConfigOverrides {
        log_level: cli.log_level,
        endpoints: cli.endpoints,
        cert_dir: cli.cert_dir,
    };
    let config = load_config(&config_path, &overrides)?;
    init_tracing(&config.telemetry.log_level);

    match cli.command {
        Commands::Check(args) => run_check(args, &config).await,
        Commands::Apply(args) => run_apply(args, &config).await,
    }
}
