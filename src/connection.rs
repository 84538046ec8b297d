//! Connection lifecycle.
//!
//! [`ConnectionManager`] owns the current [`ConnectionHandle`]. A handle is a
//! cheap clone of an `Arc` to the backend, so a batch takes one at the start
//! and keeps using it even if the manager is re-initialized meanwhile.
//!
//! Re-initialization is drain-then-replace: `initialize` calls are serialized
//! by an internal lock, the new connection is dialed before the swap, and the
//! previous backend is never closed explicitly. Batches still holding the old
//! handle finish against it; the old channel closes once the last clone is
//! dropped.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::core::error::{ConnError, ConnResult};
use crate::store::{ConnState, KvBackend};

/// Split a comma-separated endpoint list, dropping blanks.
pub fn parse_endpoints(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

/// Everything needed to dial the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Endpoints, tried in order.
    pub endpoints: Vec<String>,
    /// Upper bound for establishing the connection.
    pub dial_timeout: Duration,
    /// Directory holding the client certificate, key and CA bundle.
    pub cert_dir: PathBuf,
    /// Server name override for certificate verification.
    pub server_name: Option<String>,
}

impl ConnectionSettings {
    pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(endpoints: Vec<String>, cert_dir: impl Into<PathBuf>) -> Self {
        Self {
            endpoints,
            dial_timeout: Self::DEFAULT_DIAL_TIMEOUT,
            cert_dir: cert_dir.into(),
            server_name: None,
        }
    }

    /// Build settings from a comma-separated endpoint list.
    pub fn from_init_conf(init_conf: &str, cert_dir: impl Into<PathBuf>) -> Self {
        Self::new(parse_endpoints(init_conf), cert_dir)
    }

    pub fn with_dial_timeout(mut self, dial_timeout: Duration) -> Self {
        self.dial_timeout = dial_timeout;
        self
    }

    pub fn with_server_name(mut self, server_name: Option<String>) -> Self {
        self.server_name = server_name;
        self
    }
}

/// Shared reference to a live backend.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    backend: Arc<dyn KvBackend>,
    generation: u64,
}

impl ConnectionHandle {
    pub fn new(backend: Arc<dyn KvBackend>, generation: u64) -> Self {
        Self {
            backend,
            generation,
        }
    }

    pub fn backend(&self) -> &dyn KvBackend {
        self.backend.as_ref()
    }

    /// Initialization count at which this handle was installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> ConnState {
        self.backend.state()
    }

    /// Readiness of this handle from its last observed state.
    pub fn check_ready(&self) -> ConnResult<bool> {
        ready(self.state())
    }

    /// Readiness after letting the backend re-check its transport.
    pub async fn refresh_ready(&self) -> ConnResult<bool> {
        ready(self.backend.refresh_state().await)
    }
}

fn ready(state: ConnState) -> ConnResult<bool> {
    match state {
        ConnState::Ready => Ok(true),
        state => Err(ConnError::NotReady { state }),
    }
}

/// Owner of the current connection handle.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    current: RwLock<Option<ConnectionHandle>>,
    init_lock: tokio::sync::Mutex<()>,
    generation: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the client mTLS material, dial the cluster and install the
    /// resulting handle.
    ///
    /// On failure the previously installed handle, if any, stays current.
    #[cfg(feature = "grpc")]
    pub async fn initialize(&self, settings: &ConnectionSettings) -> ConnResult<ConnectionHandle> {
        use crate::net::tls::TlsClientBuilder;
        use crate::store::EtcdBackend;

        let _guard = self.init_lock.lock().await;

        let tls = TlsClientBuilder::from_cert_dir(&settings.cert_dir)
            .map_err(|e| {
                tracing::error!(error = %e, "etcd load cert failed");
                e
            })?
            .server_name(settings.server_name.clone())
            .build();

        let backend = EtcdBackend::connect(settings, Some(tls)).await.map_err(|e| {
            tracing::error!(error = %e, "etcd connect failed");
            e
        })?;

        let handle = self.swap(Arc::new(backend));
        tracing::info!(
            endpoints = ?settings.endpoints,
            generation = handle.generation(),
            "etcd connection initialized"
        );
        Ok(handle)
    }

    /// Install an already-built backend as the current handle.
    pub fn install(&self, backend: Arc<dyn KvBackend>) -> ConnectionHandle {
        let handle = self.swap(backend);
        tracing::debug!(
            backend = handle.backend().name(),
            generation = handle.generation(),
            "installed connection handle"
        );
        handle
    }

    fn swap(&self, backend: Arc<dyn KvBackend>) -> ConnectionHandle {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let handle = ConnectionHandle::new(backend, generation);
        let previous = self.current.write().replace(handle.clone());
        if let Some(previous) = previous {
            tracing::debug!(
                previous = previous.generation(),
                "replaced connection handle; old one drains with its holders"
            );
        }
        handle
    }

    /// Current handle.
    pub fn handle(&self) -> ConnResult<ConnectionHandle> {
        self.current
            .read()
            .clone()
            .ok_or(ConnError::NotInitialized)
    }

    /// Readiness gate: fails unless a handle exists and its transport is
    /// ready right now.
    ///
    /// A handle that is not ready is re-checked against its transport first,
    /// so a backend that lost its member recovers once the member is back.
    pub async fn check_ready(&self) -> ConnResult<bool> {
        self.ready_handle().await.map(|_| true)
    }

    /// Run the readiness gate and return the handle it passed on, so a
    /// concurrent re-initialization cannot slip in between check and use.
    pub async fn ready_handle(&self) -> ConnResult<ConnectionHandle> {
        let handle = self.handle()?;
        handle.refresh_ready().await?;
        tracing::debug!(generation = handle.generation(), "conn check ok");
        Ok(handle)
    }
}
