//! Canonical signing-message construction
//!
//! Every signature in the system is made over a deterministic, key-sorted
//! JSON serialization of the fields being attested, prefixed with a format
//! version tag. Independent signers must be able to reproduce the exact
//! bytes, so any change to field order, encoding, or the version tag
//! invalidates all outstanding signatures. Treat this as a wire contract.

use std::collections::BTreeMap;

use serde_json::Value;

use super::hash::sha256;

/// Version tag baked into every canonical message
pub const MESSAGE_FORMAT_VERSION: &str = "v1";

/// Serialize a field map into canonical message bytes.
///
/// A `BTreeMap` keeps fields sorted by key, and `serde_json` emits maps in
/// iteration order, so the output is byte-stable for a given field set.
pub fn canonical_message(fields: &BTreeMap<&str, Value>) -> Vec<u8> {
    let body = serde_json::to_string(fields).unwrap_or_default();
    let mut out = Vec::with_capacity(MESSAGE_FORMAT_VERSION.len() + 1 + body.len());
    out.extend_from_slice(MESSAGE_FORMAT_VERSION.as_bytes());
    out.push(b'|');
    out.extend_from_slice(body.as_bytes());
    out
}

/// SHA-256 digest of a canonical message, the actual bytes that get signed
pub fn canonical_digest(fields: &BTreeMap<&str, Value>) -> Vec<u8> {
    sha256(&canonical_message(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_order_does_not_matter() {
        let mut a = BTreeMap::new();
        a.insert("amount", json!(50));
        a.insert("capsule_id", json!("cap-1"));

        let mut b = BTreeMap::new();
        b.insert("capsule_id", json!("cap-1"));
        b.insert("amount", json!(50));

        assert_eq!(canonical_message(&a), canonical_message(&b));
    }

    #[test]
    fn test_message_carries_version_prefix() {
        let mut fields = BTreeMap::new();
        fields.insert("id", json!("tx-1"));
        let msg = canonical_message(&fields);
        assert!(msg.starts_with(b"v1|"));
    }

    #[test]
    fn test_value_change_changes_digest() {
        let mut a = BTreeMap::new();
        a.insert("amount", json!(50));
        let mut b = BTreeMap::new();
        b.insert("amount", json!(51));

        assert_ne!(canonical_digest(&a), canonical_digest(&b));
    }

    #[test]
    fn test_digest_is_32_bytes() {
        let mut fields = BTreeMap::new();
        fields.insert("nonce", json!("abc"));
        assert_eq!(canonical_digest(&fields).len(), 32);
    }
}
