//! Configuration parsing and validation.
//!
//! Configuration is loaded from a TOML file and can be adjusted with CLI
//! overrides before validation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::connection::ConnectionSettings;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// etcd connection configuration.
    pub etcd: EtcdConfig,

    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// etcd connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtcdConfig {
    /// Cluster endpoints, e.g. "10.0.0.1:2379". Tried in order.
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Directory with healthcheck-client.crt, healthcheck-client.key, ca.crt.
    pub cert_dir: String,

    /// Server name to verify instead of the endpoint host.
    #[serde(default)]
    pub server_name: Option<String>,

    /// Dial timeout in milliseconds.
    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,

    /// Per-operation timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl EtcdConfig {
    /// Settings for [`crate::connection::ConnectionManager::initialize`].
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::new(self.endpoints.clone(), PathBuf::from(&self.cert_dir))
            .with_dial_timeout(Duration::from_millis(self.dial_timeout_ms))
            .with_server_name(self.server_name.clone())
    }

    /// Bound for each store call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_dial_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file without validating, so overrides can be
    /// applied first.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Parse a TOML string without validating.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "failed to parse config")
    }

    /// Apply CLI overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref log_level) = overrides.log_level {
            self.telemetry.log_level = log_level.clone();
        }
        if let Some(ref endpoints) = overrides.endpoints {
            self.etcd.endpoints = crate::connection::parse_endpoints(endpoints);
        }
        if let Some(ref cert_dir) = overrides.cert_dir {
            self.etcd.cert_dir = cert_dir.clone();
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.validate_etcd()?;
        self.validate_telemetry()?;
        Ok(())
    }

    fn validate_etcd(&self) -> Result<()> {
        if self.etcd.endpoints.iter().all(|e| e.trim().is_empty()) {
            anyhow::bail!("etcd.endpoints must contain at least one endpoint");
        }
        if self.etcd.cert_dir.trim().is_empty() {
            anyhow::bail!("etcd.cert_dir must not be empty");
        }
        if self.etcd.dial_timeout_ms == 0 {
            anyhow::bail!("etcd.dial_timeout_ms must be > 0");
        }
        if self.etcd.request_timeout_ms == 0 {
            anyhow::bail!("etcd.request_timeout_ms must be > 0");
        }
        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }
        Ok(())
    }
}

/// CLI override options that can be applied to configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override log level.
    pub log_level: Option<String>,
    /// Override endpoints with a comma-separated list.
    pub endpoints: Option<String>,
    /// Override certificate directory.
    pub cert_dir: Option<String>,
}
