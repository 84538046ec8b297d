//! Reconciliation pass.
//!
//! A pass has two phases: the readiness gate, then one independent store
//! round trip per desired record, in input order.
//!
//! ```text
//! apply(records)
//!   │
//!   ├─ ready_handle() ── Err ──▶ BatchResult { readiness: Err, outcomes: [] }
//!   │
//!   └─ for record in records
//!        key = encode_key(name)
//!        Write  : put(key, {"host": address}) → get(key)
//!        Delete : get(key) → delete(key)
//!        Read   : get(key)
//!        outcome { value, error } ──▶ next record
//! ```
//!
//! A failing record never stops the pass. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use crate::codec;
use crate::connection::ConnectionManager;
use crate::core::error::{ConnError, ConnResult, ManifestError, StoreError, StoreResult};
use crate::manifest::{self, IpHost};
use crate::store::{Lookup, RecordStore};

/// What to do with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Write,
    Delete,
    Read,
}

impl Action {
    /// Map the wire option: `put`, `del`, anything else reads.
    pub fn from_option(option: &str) -> Self {
        match option {
            "put" => Self::Write,
            "del" => Self::Delete,
            _ => Self::Read,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Write => "put",
            Self::Delete => "del",
            Self::Read => "get",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record the caller wants the store to reflect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    pub action: Action,
    /// Target address, passed through unvalidated.
    pub address: String,
    /// Dotted host name, non-empty.
    pub name: String,
}

impl DesiredRecord {
    pub fn write(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            action: Action::Write,
            address: address.into(),
            name: name.into(),
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self {
            action: Action::Delete,
            address: String::new(),
            name: name.into(),
        }
    }

    pub fn read(name: impl Into<String>) -> Self {
        Self {
            action: Action::Read,
            address: String::new(),
            name: name.into(),
        }
    }

    pub fn key(&self) -> String {
        codec::encode_key(&self.name)
    }
}

/// Result of applying one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub name: String,
    pub action: Action,
    pub key: String,
    /// Value observed for reporting: after the write, before the delete, or
    /// the current value for a read. `None` when the key was absent or the
    /// read did not happen.
    pub value: Option<String>,
    /// First store error hit while applying the record.
    pub error: Option<StoreError>,
}

impl RecordOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Counts for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted: bool,
}

/// Result of one pass.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Readiness gate result. On `Err`, `outcomes` is empty.
    pub readiness: ConnResult<()>,
    /// One outcome per input record, in input order.
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchResult {
    fn aborted(err: ConnError) -> Self {
        Self {
            readiness: Err(err),
            outcomes: Vec::new(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.readiness.is_err()
    }

    /// Outcomes that carry an error.
    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn summary(&self) -> BatchSummary {
        let failed = self.failures().count();
        BatchSummary {
            total: self.outcomes.len(),
            succeeded: self.outcomes.len() - failed,
            failed,
            aborted: self.is_aborted(),
        }
    }
}

/// Applies desired records through the current connection handle.
#[derive(Debug, Clone)]
pub struct ReconcileEngine {
    connections: Arc<ConnectionManager>,
    op_timeout: Duration,
}

impl ReconcileEngine {
    /// `op_timeout` bounds every individual store call.
    pub fn new(connections: Arc<ConnectionManager>, op_timeout: Duration) -> Self {
        Self {
            connections,
            op_timeout,
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Run one pass over `records`.
    pub async fn apply(&self, records: &[DesiredRecord]) -> BatchResult {
        let handle = match self.connections.ready_handle().await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, records = records.len(), "etcd not ready; batch skipped");
                return BatchResult::aborted(e);
            }
        };

        let store = RecordStore::new(handle, self.op_timeout);
        tracing::info!(records = records.len(), "etcd batch started");

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            outcomes.push(apply_record(&store, record).await);
        }

        let result = BatchResult {
            readiness: Ok(()),
            outcomes,
        };
        let summary = result.summary();
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "etcd batch finished"
        );
        result
    }

    /// Convert wire entries and run one pass over them.
    pub async fn apply_hosts(&self, hosts: &[IpHost]) -> Result<BatchResult, ManifestError> {
        let records = manifest::to_records(hosts)?;
        Ok(self.apply(&records).await)
    }
}

async fn apply_record(store: &RecordStore, record: &DesiredRecord) -> RecordOutcome {
    let key = record.key();

    let (value, error) = match record.action {
        Action::Write => {
            let payload = codec::encode_value(&record.address);
            match store.put(&key, &payload).await {
                Ok(()) => observed(store.get(&key).await),
                Err(e) => (None, Some(e)),
            }
        }
        Action::Delete => {
            let (value, read_error) = observed(store.get(&key).await);
            match store.delete(&key).await {
                Ok(()) => (value, read_error),
                Err(e) => (value, read_error.or(Some(e))),
            }
        }
        Action::Read => observed(store.get(&key).await),
    };

    match &error {
        None => tracing::info!(
            action = %record.action,
            key = %key,
            value = value.as_deref().unwrap_or("<not found>"),
            "etcd record applied"
        ),
        Some(e) => tracing::warn!(
            action = %record.action,
            key = %key,
            error = %e,
            "etcd record failed"
        ),
    }

    RecordOutcome {
        name: record.name.clone(),
        action: record.action,
        key,
        value,
        error,
    }
}

fn observed(lookup: StoreResult<Lookup>) -> (Option<String>, Option<StoreError>) {
    match lookup {
        Ok(lookup) => (lookup.into_option(), None),
        Err(e) => (None, Some(e)),
    }
}
