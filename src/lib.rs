//! skysync - SkyDNS host records synchronized into etcd.
//!
//! A caller hands over a list of desired host records, each tagged put, del
//! or read-back, and the engine converges an etcd v3 cluster to match using
//! the SkyDNS key layout.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Caller (resource watcher, CLI)                  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │ Vec<DesiredRecord>
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ReconcileEngine                          │
//! │        readiness gate  →  per-record apply, continue-on-error   │
//! └─────────────────────────────────────────────────────────────────┘
//!            │                     │                        │
//! ┌────────────────────┐ ┌──────────────────┐ ┌──────────────────────┐
//! │ ConnectionManager  │ │    KeyCodec      │ │     RecordStore      │
//! │ mTLS dial, handle  │ │ name ↔ /skydns/… │ │ bounded put/get/del  │
//! └────────────────────┘ └──────────────────┘ └──────────────────────┘
//!            │                                          │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │           KvBackend: etcd v3 gRPC  │  in-memory                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - [`connection`] - connection lifecycle and readiness gate
//! - [`codec`] - key and value encoding
//! - [`store`] - backends and the timeout-bounded record store
//! - [`reconcile`] - the reconciliation pass
//! - [`manifest`] - desired-state wire types
//! - [`net::tls`] - client mTLS material
//! - [`core::config`] - configuration
//! - [`core::error`] - error types
//!
//! # Key Invariants
//!
//! - A key is a pure function of the host name, whatever the action.
//! - No store call is issued unless the readiness gate passes.
//! - One record's failure never prevents the next record from being applied.
//! - An absent key (`Lookup::NotFound`) is distinct from a failed read.

// Core infrastructure
pub mod core;

// Networking
pub mod net;

pub mod codec;
pub mod connection;
pub mod manifest;
pub mod reconcile;
pub mod store;

// CLI
#[cfg(feature = "grpc")]
pub mod cli;

// Re-exports for convenience
pub use self::core::{config, error};
pub use connection::{ConnectionHandle, ConnectionManager, ConnectionSettings};
pub use error::{ConnError, ManifestError, StoreError, StoreOp};
pub use reconcile::{Action, BatchResult, DesiredRecord, ReconcileEngine, RecordOutcome};
pub use store::{ConnState, KvBackend, Lookup, MemoryKv, RecordStore};
