//! CLI command implementations.

mod apply;
mod check;

pub use apply::{run_apply, ApplyArgs};
pub use check::{run_check, CheckArgs};

use crate::core::config::{Config, ConfigOverrides};
use anyhow::Result;
use std::path::Path;

/// Load the config file, apply CLI overrides and validate.
pub fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<Config> {
    let mut config = Config::read(path)?;
    config.apply_overrides(overrides);
    config.validate()?;
    Ok(config)
}

/// Initialize the tracing subscriber if the telemetry feature is enabled.
///
/// `RUST_LOG` wins over the configured level.
#[cfg(feature = "telemetry")]
pub fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[cfg(not(feature = "telemetry"))]
pub fn init_tracing(_level: &str) {}
