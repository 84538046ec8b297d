//! Apply command implementation.

use crate::connection::ConnectionManager;
use crate::core::config::Config;
use crate::manifest::DnsConfigSpec;
use crate::reconcile::{BatchResult, ReconcileEngine};
use crate::store::MemoryKv;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Apply an ipHosts document.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// JSON file with a DnsConfig resource or a bare spec.
    #[arg(short, long)]
    pub records: PathBuf,

    /// Run against an empty in-memory store instead of etcd.
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the apply command.
pub async fn run_apply(args: ApplyArgs, config: &Config) -> Result<()> {
    let content = std::fs::read_to_string(&args.records)
        .with_context(|| format!("failed to read {}", args.records.display()))?;
    let records = DnsConfigSpec::from_json(&content)?.records()?;

    let manager = Arc::new(ConnectionManager::new());
    if args.dry_run {
        manager.install(Arc::new(MemoryKv::new()));
    } else {
        manager
            .initialize(&config.etcd.connection_settings())
            .await?;
    }

    let engine = ReconcileEngine::new(manager, config.etcd.request_timeout());
    let result = engine.apply(&records).await;
    print_result(&result);

    if let Err(e) = result.readiness {
        anyhow::bail!("batch aborted: {}", e);
    }
    Ok(())
}

fn print_result(result: &BatchResult) {
    for outcome in &result.outcomes {
        let status = match &outcome.error {
            None => "ok".to_string(),
            Some(e) => format!("error: {}", e),
        };
        println!(
            "{:<4} {:<40} {:<30} {}",
            outcome.action,
            outcome.key,
            outcome.value.as_deref().unwrap_or("-"),
            status
        );
    }

    let summary = result.summary();
    println!(
        "{} record(s): {} ok, {} failed",
        summary.total, summary.succeeded, summary.failed
    );
}
