//! Networking layer.
//!
//! - [`tls`] - client mTLS material

pub mod tls;
