//! Canonical serialization for deterministic hashing.
//!
//! Plan fingerprints and policy hashes are computed over canonical JSON
//! and hashed with xxh64, rendered as 16 lowercase hex digits.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use BTreeMap for maps in hashed data
//!
//! ## Plan fingerprint
//!
//! [`plan_fingerprint`] covers exactly:
//!
//! 1. bucket membership: for each classification in [`Classification::ALL`]
//!    order, the identifiers in that bucket in bucket order
//! 2. review order: `(id, display_order, strategy)` per working-set entry
//!
//! Names, recommendations, diffs and resolved dependencies are presentation
//! and stay outside the hash, so rewording guidance never changes a
//! fingerprint while moving an object between buckets or positions always
//! does.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

use crate::classify::ClassificationResult;
use crate::types::{Classification, ObjectId, OrderedChange, Strategy};

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Only used on plain data types whose serialization cannot fail
/// (no non-string map keys, no custom serializers that error).
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
struct FingerprintInput<'a> {
    buckets: Vec<(Classification, Vec<&'a ObjectId>)>,
    working_set: Vec<(&'a ObjectId, usize, Strategy)>,
}

/// Fingerprint of bucket membership and review order.
pub fn plan_fingerprint(classification: &ClassificationResult, working_set: &[OrderedChange]) -> String {
    let input = FingerprintInput {
        buckets: Classification::ALL
            .iter()
            .map(|c| (*c, classification.bucket(*c).iter().map(|x| &x.id).collect()))
            .collect(),
        working_set: working_set
            .iter()
            .map(|o| (o.id(), o.display_order, o.guidance.strategy))
            .collect(),
    };
    canonical_hash_hex(&input)
}
