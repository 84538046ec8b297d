//! Check command implementation.

use crate::connection::ConnectionManager;
use crate::core::config::Config;
use anyhow::Result;
use clap::Args;

/// Connect to etcd and report readiness.
#[derive(Args, Debug)]
pub struct CheckArgs {}

/// Run the check command.
pub async fn run_check(_args: CheckArgs, config: &Config) -> Result<()> {
    let settings = config.etcd.connection_settings();
    let manager = ConnectionManager::new();
    let handle = manager.initialize(&settings).await?;

    manager.check_ready().await?;
    println!(
        "etcd ready ({} endpoint(s), generation {})",
        settings.endpoints.len(),
        handle.generation()
    );
    Ok(())
}
