//! SkyDNS key and value encoding.
//!
//! A host name maps to a slash-delimited path with its labels reversed, so
//! `svc.cluster.local` is stored under `/skydns/local/cluster/svc/`. The value
//! is the JSON object `{"host":"<address>"}` that SkyDNS and CoreDNS's etcd
//! plugin read as an A/AAAA target.

use serde::{Deserialize, Serialize};

/// Key prefix for every record.
pub const KEY_PREFIX: &str = "/skydns/";

#[derive(Serialize)]
struct HostValueRef<'a> {
    host: &'a str,
}

#[derive(Deserialize)]
struct HostValue {
    host: String,
}

/// Derive the store key for a dotted domain name.
///
/// Total: an empty name gives `/skydns//`, so callers reject empty names
/// before they get here.
pub fn encode_key(name: &str) -> String {
    let labels: Vec<&str> = name.split('.').rev().collect();
    format!("{}{}/", KEY_PREFIX, labels.join("/"))
}

/// Recover the domain name from a key produced by [`encode_key`].
pub fn decode_key(key: &str) -> Option<String> {
    let path = key.strip_prefix(KEY_PREFIX)?.strip_suffix('/')?;
    let labels: Vec<&str> = path.split('/').rev().collect();
    Some(labels.join("."))
}

/// Encode the stored payload for `address`.
pub fn encode_value(address: &str) -> Vec<u8> {
    // A struct of one string field cannot fail to serialize.
    serde_json::to_vec(&HostValueRef { host: address }).unwrap_or_default()
}

/// Extract the `host` field from a stored payload.
///
/// Returns `None` for payloads that are not a host object.
pub fn decode_value(payload: &[u8]) -> Option<String> {
    serde_json::from_slice::<HostValue>(payload)
        .ok()
        .map(|v| v.host)
}
