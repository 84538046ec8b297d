//! Store access.
//!
//! - [`backend`] - `KvBackend` trait and connectivity state
//! - [`record_store`] - timeout-bounded put / get / delete
//! - [`memory`] - in-process backend for dry runs and tests
//! - [`etcd`] - etcd v3 gRPC backend
//! - [`proto`] - etcd wire messages

pub mod backend;
#[cfg(feature = "grpc")]
pub mod etcd;
pub mod memory;
#[cfg(feature = "grpc")]
pub mod proto;
pub mod record_store;

pub use backend::{ConnState, KvBackend, StateCell};
#[cfg(feature = "grpc")]
pub use etcd::EtcdBackend;
pub use memory::{Call, MemoryKv};
pub use record_store::{Lookup, RecordStore};
