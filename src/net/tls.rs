//! Client mTLS material.
//!
//! The etcd client authenticates with the cluster's health-check client
//! certificate. All three PEM files live in one directory under fixed names:
//!
//! ```text
//! <cert_dir>/
//! ├── healthcheck-client.crt   client certificate chain
//! ├── healthcheck-client.key   client private key
//! └── ca.crt                   CA bundle used to verify the servers
//! ```

use std::path::{Path, PathBuf};

use crate::core::error::{ConnError, ConnResult};

/// Client certificate file name.
pub const CLIENT_CERT_FILE: &str = "healthcheck-client.crt";
/// Client private key file name.
pub const CLIENT_KEY_FILE: &str = "healthcheck-client.key";
/// CA bundle file name.
pub const CA_FILE: &str = "ca.crt";

/// Loaded client identity (certificate chain + private key).
#[derive(Debug, Clone)]
pub struct TlsIdentity {
    /// Certificate chain in PEM format.
    pub cert_chain_pem: Vec<u8>,
    /// Private key in PEM format.
    pub key_pem: Vec<u8>,
}

impl TlsIdentity {
    /// Load an identity from PEM files.
    pub fn load(cert_chain_path: &Path, key_path: &Path) -> ConnResult<Self> {
        let cert_chain_pem = read_pem(cert_chain_path, "CERTIFICATE")?;
        let key_pem = read_pem(key_path, "PRIVATE KEY")?;
        Ok(Self {
            cert_chain_pem,
            key_pem,
        })
    }
}

/// Trust store for CA certificates.
#[derive(Debug, Clone)]
pub struct TrustStore {
    /// CA certificates in PEM format.
    pub ca_certs_pem: Vec<u8>,
    /// Number of certificates loaded.
    pub cert_count: usize,
}

impl TrustStore {
    /// Load a trust store from a CA bundle file.
    pub fn load(ca_path: &Path) -> ConnResult<Self> {
        let ca_certs_pem = read_pem(ca_path, "CERTIFICATE")?;
        let cert_count = String::from_utf8_lossy(&ca_certs_pem)
            .matches("-----BEGIN CERTIFICATE-----")
            .count();
        Ok(Self {
            ca_certs_pem,
            cert_count,
        })
    }
}

/// Read a PEM file and check that it carries at least one block whose label
/// ends with `label` (so "PRIVATE KEY" also accepts RSA and EC keys).
fn read_pem(path: &Path, label: &str) -> ConnResult<Vec<u8>> {
    let data = std::fs::read(path).map_err(|e| ConnError::cert_load(path, e.to_string()))?;

    let text = String::from_utf8_lossy(&data);
    let found = text.lines().any(|line| {
        line.trim()
            .strip_prefix("-----BEGIN ")
            .and_then(|rest| rest.strip_suffix("-----"))
            .is_some_and(|found| found.ends_with(label))
    });
    if !found {
        return Err(ConnError::cert_load(
            path,
            format!("no PEM {} block found", label),
        ));
    }
    Ok(data)
}

/// Builder for the client mTLS configuration.
#[derive(Debug, Clone)]
pub struct TlsClientBuilder {
    /// Directory the material was loaded from.
    cert_dir: PathBuf,
    /// Client identity.
    identity: TlsIdentity,
    /// Server CA trust store.
    server_ca: TrustStore,
    /// Server name override for certificate verification.
    server_name: Option<String>,
}

impl TlsClientBuilder {
    /// Load the fixed-name PEM files from `cert_dir`.
    pub fn from_cert_dir(cert_dir: &Path) -> ConnResult<Self> {
        let identity = TlsIdentity::load(
            &cert_dir.join(CLIENT_CERT_FILE),
            &cert_dir.join(CLIENT_KEY_FILE),
        )?;
        let server_ca = TrustStore::load(&cert_dir.join(CA_FILE))?;

        tracing::debug!(
            cert_dir = %cert_dir.display(),
            ca_certs = server_ca.cert_count,
            "loaded etcd client TLS material"
        );

        Ok(Self {
            cert_dir: cert_dir.to_path_buf(),
            identity,
            server_ca,
            server_name: None,
        })
    }

    /// Verify servers against `name` instead of the endpoint host.
    pub fn server_name(mut self, name: Option<String>) -> Self {
        self.server_name = name;
        self
    }

    pub fn cert_dir(&self) -> &Path {
        &self.cert_dir
    }

    pub fn identity(&self) -> &TlsIdentity {
        &self.identity
    }

    pub fn server_ca(&self) -> &TrustStore {
        &self.server_ca
    }

    /// Build the tonic client TLS configuration.
    #[cfg(feature = "grpc")]
    pub fn build(&self) -> tonic::transport::ClientTlsConfig {
        use tonic::transport::{Certificate, ClientTlsConfig, Identity};

        let mut config = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(&self.server_ca.ca_certs_pem))
            .identity(Identity::from_pem(
                &self.identity.cert_chain_pem,
                &self.identity.key_pem,
            ));
        if let Some(ref name) = self.server_name {
            config = config.domain_name(name.clone());
        }
        config
    }
}
