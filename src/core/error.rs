//! Error types.
//!
//! Connection errors abort a whole reconciliation pass. Store errors are
//! recorded on a single record's outcome and the pass continues. A key that
//! is simply absent is not an error at all (see [`crate::store::Lookup`]).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::store::ConnState;

/// Connection lifecycle errors.
///
/// `CertLoad` and `Dial` are raised while initializing; `NotInitialized` and
/// `NotReady` come from the readiness gate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnError {
    /// No connection has been initialized yet.
    #[error("client not connected")]
    NotInitialized,

    /// A handle exists but its transport is not in the ready state.
    #[error("client connection not ready: {state}")]
    NotReady { state: ConnState },

    /// Certificate material is missing or unusable.
    #[error("failed to load TLS material {}: {message}", path.display())]
    CertLoad { path: PathBuf, message: String },

    /// No endpoint could be reached within the dial timeout.
    #[error("failed to connect to {endpoints:?}: {message}")]
    Dial {
        endpoints: Vec<String>,
        message: String,
    },
}

impl ConnError {
    pub(crate) fn cert_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CertLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn dial(endpoints: &[String], message: impl Into<String>) -> Self {
        Self::Dial {
            endpoints: endpoints.to_vec(),
            message: message.into(),
        }
    }

    /// True for errors raised by the readiness gate rather than by setup.
    pub fn is_readiness_failure(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::NotReady { .. })
    }
}

/// Store operation kind, carried by [`StoreError`] for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Put,
    Get,
    Delete,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Put => write!(f, "put"),
            Self::Get => write!(f, "get"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Per-operation store failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The operation did not complete within its bounded scope.
    #[error("etcd {op} timed out after {after:?}")]
    Timeout { op: StoreOp, after: Duration },

    /// The transport or the server rejected the operation.
    #[error("etcd {op} failed: {message}")]
    Transport { op: StoreOp, message: String },
}

impl StoreError {
    pub fn transport(op: StoreOp, message: impl Into<String>) -> Self {
        Self::Transport {
            op,
            message: message.into(),
        }
    }

    /// Operation that failed.
    pub fn op(&self) -> StoreOp {
        match self {
            Self::Timeout { op, .. } | Self::Transport { op, .. } => *op,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors converting a desired-state document into records.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// An ipHosts entry has no host name.
    #[error("ipHosts[{index}]: confHost must not be empty")]
    EmptyHost { index: usize },

    /// The document could not be parsed.
    #[error("failed to parse desired state: {message}")]
    Parse { message: String },
}

impl From<serde_json::Error> for ManifestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}

/// Result type for connection operations.
pub type ConnResult<T> = Result<T, ConnError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_error_display() {
        let err = ConnError::NotReady {
            state: ConnState::TransientFailure,
        };
        assert_eq!(
            err.to_string(),
            "client connection not ready: TRANSIENT_FAILURE"
        );
        assert_eq!(ConnError::NotInitialized.to_string(), "client not connected");
    }

    #[test]
    fn test_readiness_failure_classification() {
        assert!(ConnError::NotInitialized.is_readiness_failure());
        assert!(ConnError::NotReady {
            state: ConnState::Connecting
        }
        .is_readiness_failure());
        assert!(!ConnError::cert_load("/pki/ca.crt", "missing").is_readiness_failure());
        assert!(!ConnError::dial(&["a:2379".to_string()], "refused").is_readiness_failure());
    }

    #[test]
    fn test_store_error_op() {
        let err = StoreError::Timeout {
            op: StoreOp::Get,
            after: Duration::from_secs(5),
        };
        assert_eq!(err.op(), StoreOp::Get);
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "etcd get timed out after 5s");

        let err = StoreError::transport(StoreOp::Delete, "unavailable");
        assert_eq!(err.op(), StoreOp::Delete);
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "etcd delete failed: unavailable");
    }
}
