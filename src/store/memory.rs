//! In-process key-value backend.
//!
//! Backs dry runs and tests. Besides plain storage it can report an arbitrary
//! connectivity state, fail operations on chosen keys, add latency, and keeps
//! a journal of every call it receives.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use super::backend::{ConnState, KvBackend, StateCell};
use crate::core::error::{StoreError, StoreOp, StoreResult};

/// A call observed by [`MemoryKv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: StoreOp,
    pub key: String,
}

/// In-memory [`KvBackend`].
#[derive(Debug)]
pub struct MemoryKv {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    state: StateCell,
    failing_keys: RwLock<HashSet<String>>,
    latency: Mutex<Option<Duration>>,
    journal: Mutex<Vec<Call>>,
}

impl MemoryKv {
    /// Create an empty store in the ready state.
    pub fn new() -> Self {
        Self::with_state(ConnState::Ready)
    }

    /// Create an empty store reporting `state`.
    pub fn with_state(state: ConnState) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            state: StateCell::new(state),
            failing_keys: RwLock::new(HashSet::new()),
            latency: Mutex::new(None),
            journal: Mutex::new(Vec::new()),
        }
    }

    pub fn set_state(&self, state: ConnState) {
        self.state.set(state);
    }

    /// Make every operation on `key` fail with a transport error.
    pub fn fail_key(&self, key: impl Into<String>) {
        self.failing_keys.write().insert(key.into());
    }

    pub fn clear_faults(&self) {
        self.failing_keys.write().clear();
    }

    /// Delay every operation by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Seed a value without journaling the write.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// Read a value without journaling the read.
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<Call> {
        self.journal.lock().clone()
    }

    /// Number of received calls of kind `op`.
    pub fn count(&self, op: StoreOp) -> usize {
        self.journal.lock().iter().filter(|c| c.op == op).count()
    }

    async fn enter(&self, op: StoreOp, key: &str) -> StoreResult<()> {
        self.journal.lock().push(Call {
            op,
            key: key.to_string(),
        });

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing_keys.read().contains(key) {
            return Err(StoreError::transport(op, format!("injected fault on {}", key)));
        }
        Ok(())
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn state(&self) -> ConnState {
        self.state.get()
    }

    async fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.enter(StoreOp::Put, key).await?;
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.enter(StoreOp::Get, key).await?;
        Ok(self.entries.read().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.enter(StoreOp::Delete, key).await?;
        self.entries.write().remove(key);
        Ok(())
    }
}
