//! Canonical serialization for record fingerprints.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: all record maps are `BTreeMap`
//! - Stable slot order: children are sorted by their own fingerprint, so
//!   two trees with the same membership hash equal regardless of order
//! - Identities are excluded: a fingerprint describes content, not storage

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

use crate::types::{FieldValue, Record};
use std::collections::BTreeMap;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[derive(Serialize)]
struct ContentView<'a> {
    kind: &'a str,
    fields: &'a BTreeMap<String, FieldValue>,
    related: BTreeMap<&'a str, Vec<String>>,
}

/// Content fingerprint of a record tree, ignoring identities and slot order.
pub fn record_fingerprint(record: &Record) -> String {
    let related = record
        .related
        .iter()
        .map(|(name, children)| {
            let mut hashes: Vec<String> = children.iter().map(record_fingerprint).collect();
            hashes.sort();
            (name.as_str(), hashes)
        })
        .collect();

    canonical_hash_hex(&ContentView {
        kind: &record.kind,
        fields: &record.fields,
        related,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;
    use uuid::Uuid;

    #[derive(Serialize)]
    struct TestStruct {
        name: String,
        value: i32,
    }

    #[test]
    fn test_determinism() {
        let s = TestStruct {
            name: "test".to_string(),
            value: 42,
        };

        let h1 = canonical_hash(&s);
        let h2 = canonical_hash(&s);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_fingerprint_ignores_identity() {
        let a = Record::with_id("k", RecordId::new(Uuid::from_u128(1))).field("x", 1i64);
        let b = Record::new("k").field("x", 1i64);
        assert_eq!(record_fingerprint(&a), record_fingerprint(&b));

        let c = Record::new("k").field("x", 2i64);
        assert_ne!(record_fingerprint(&a), record_fingerprint(&c));
    }

    #[test]
    fn test_fingerprint_ignores_slot_order() {
        let l1 = Record::new("leaf").field("n", "one");
        let l2 = Record::new("leaf").field("n", "two");

        let a = Record::new("p").child("s", l1.clone()).child("s", l2.clone());
        let b = Record::new("p").child("s", l2).child("s", l1);
        assert_eq!(record_fingerprint(&a), record_fingerprint(&b));
    }
}
