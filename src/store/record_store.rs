//! Timeout-bounded record operations.

use std::future::Future;
use std::time::Duration;

use crate::connection::ConnectionHandle;
use crate::core::error::{StoreError, StoreOp, StoreResult};

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Raw stored payload.
    Found(String),
    /// No entry under the key.
    NotFound,
}

impl Lookup {
    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found(value) => write!(f, "{}", value),
            Self::NotFound => write!(f, "<not found>"),
        }
    }
}

/// Put / get / delete against one connection handle.
///
/// Every call runs inside a `timeout` scope of `op_timeout`. The scope is a
/// future that is dropped on success, error and expiry alike, so nothing
/// outlives the call. An expired call does not affect the next one.
#[derive(Debug, Clone)]
pub struct RecordStore {
    handle: ConnectionHandle,
    op_timeout: Duration,
}

impl RecordStore {
    /// Bound used when the configuration does not set one.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(handle: ConnectionHandle, op_timeout: Duration) -> Self {
        Self { handle, op_timeout }
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    /// Upsert `value` under `key`.
    pub async fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        tracing::debug!(key = %key, "store put");
        self.bounded(StoreOp::Put, self.handle.backend().put(key, value))
            .await
    }

    /// Read `key`, distinguishing an absent key from a failed read.
    pub async fn get(&self, key: &str) -> StoreResult<Lookup> {
        tracing::debug!(key = %key, "store get");
        let value = self
            .bounded(StoreOp::Get, self.handle.backend().get(key))
            .await?;
        Ok(match value {
            Some(bytes) => Lookup::Found(String::from_utf8_lossy(&bytes).into_owned()),
            None => Lookup::NotFound,
        })
    }

    /// Remove `key`; removing an absent key succeeds.
    pub async fn delete(&self, key: &str) -> StoreResult<()> {
        tracing::debug!(key = %key, "store delete");
        self.bounded(StoreOp::Delete, self.handle.backend().delete(key))
            .await
    }

    async fn bounded<T, F>(&self, op: StoreOp, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                op,
                after: self.op_timeout,
            }),
        }
    }
}
