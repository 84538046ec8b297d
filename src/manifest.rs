//! Desired-state documents.
//!
//! These are the JSON shapes the resource watcher hands over: a `DnsConfig`
//! spec listing `ipHosts`, and an `InitEtcd` spec naming the cluster and the
//! certificate directory. Every field is optional on the wire and defaults to
//! an empty string.

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionSettings;
use crate::core::error::ManifestError;
use crate::reconcile::{Action, DesiredRecord};

/// One `ipHosts` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IpHost {
    /// `put`, `del`, or anything else for a read-back.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub option: String,
    /// Target address.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub conf_ip: String,
    /// Dotted host name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub conf_host: String,
}

impl IpHost {
    pub fn new(option: &str, conf_ip: &str, conf_host: &str) -> Self {
        Self {
            option: option.to_string(),
            conf_ip: conf_ip.to_string(),
            conf_host: conf_host.to_string(),
        }
    }

    /// Convert to a record; `index` is only used in the error.
    pub fn to_record(&self, index: usize) -> Result<DesiredRecord, ManifestError> {
        if self.conf_host.is_empty() {
            return Err(ManifestError::EmptyHost { index });
        }
        Ok(DesiredRecord {
            action: Action::from_option(&self.option),
            address: self.conf_ip.clone(),
            name: self.conf_host.clone(),
        })
    }
}

/// Convert a list of entries, failing on the first invalid one.
pub fn to_records(hosts: &[IpHost]) -> Result<Vec<DesiredRecord>, ManifestError> {
    hosts
        .iter()
        .enumerate()
        .map(|(index, host)| host.to_record(index))
        .collect()
}

/// `DnsConfig` spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsConfigSpec {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_hosts: Vec<IpHost>,
}

impl DnsConfigSpec {
    /// Parse either a bare spec or a whole resource with a `spec` field.
    pub fn from_json(content: &str) -> Result<Self, ManifestError> {
        let mut value: serde_json::Value = serde_json::from_str(content)?;
        if let Some(spec) = value.get_mut("spec") {
            return Ok(serde_json::from_value(spec.take())?);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn records(&self) -> Result<Vec<DesiredRecord>, ManifestError> {
        to_records(&self.ip_hosts)
    }
}

/// `InitEtcd` spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitEtcdSpec {
    /// Comma-separated endpoint list.
    pub init_conf: String,
    /// Directory holding the client TLS material.
    pub cert_dir: String,
}

impl InitEtcdSpec {
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::from_init_conf(&self.init_conf, &self.cert_dir)
    }
}
