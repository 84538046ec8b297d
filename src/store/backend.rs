//! Key-value backend seam.
//!
//! [`RecordStore`](super::RecordStore) talks to the cluster only through
//! [`KvBackend`]. The etcd gRPC client and the in-memory store both implement
//! it, so the reconcile loop can be exercised without a live cluster.

use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;

use crate::core::error::StoreResult;

/// Connectivity state of a backend, named after the gRPC channel states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Idle,
    Connecting,
    Ready,
    TransientFailure,
    Shutdown,
}

impl ConnState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Connecting => 1,
            Self::Ready => 2,
            Self::TransientFailure => 3,
            Self::Shutdown => 4,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Ready,
            3 => Self::TransientFailure,
            _ => Self::Shutdown,
        }
    }
}

impl std::fmt::Display for ConnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Ready => write!(f, "READY"),
            Self::TransientFailure => write!(f, "TRANSIENT_FAILURE"),
            Self::Shutdown => write!(f, "SHUTDOWN"),
        }
    }
}

/// Lock-free holder for a backend's current [`ConnState`].
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: ConnState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub fn get(&self) -> ConnState {
        ConnState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Store a new state, returning the previous one.
    pub fn set(&self, state: ConnState) -> ConnState {
        ConnState::from_u8(self.0.swap(state.as_u8(), Ordering::AcqRel))
    }
}

/// Minimal put / get / delete / health surface of the distributed store.
///
/// Implementations must be safe to share between concurrent callers. They do
/// not bound their own latency; [`RecordStore`](super::RecordStore) wraps
/// every call in its timeout.
#[async_trait]
pub trait KvBackend: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Last observed connectivity state.
    fn state(&self) -> ConnState;

    /// Re-check connectivity against the transport and return the new state.
    ///
    /// Backends without a transport report [`state`](Self::state) unchanged.
    async fn refresh_state(&self) -> ConnState {
        self.state()
    }

    /// Upsert `value` under `key`.
    async fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Fetch the value under `key`, `None` when absent.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Remove `key`. Absent keys are not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}
