//! Catalog records.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::builder::FingerprintSet;

/// Opaque catalog identifier.
///
/// Ordered by length first, then bytewise. For decimal ids without leading
/// zeros this coincides with numeric order, so `"9" < "10"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.as_bytes().cmp(other.0.as_bytes()))
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// A catalog entry: identifier, zero to four orientation fingerprints, and
/// passthrough metadata the matcher never interprets.
///
/// A record without fingerprints is inert and skipped during matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub id: RecordId,
    #[serde(default)]
    pub fingerprints: FingerprintSet,
    /// SHA3-256 of the source image bytes the fingerprints were computed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_digest: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl CatalogRecord {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fingerprints: FingerprintSet::default(),
            source_digest: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_fingerprints(mut self, fingerprints: FingerprintSet) -> Self {
        self.fingerprints = fingerprints;
        self
    }

    pub fn with_source_digest(mut self, digest: impl Into<String>) -> Self {
        self.source_digest = Some(digest.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// True when there is nothing to compare against.
    pub fn is_inert(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

/// Hex-encoded SHA3-256 digest of source image bytes.
///
/// Fingerprinting is deterministic, so an unchanged digest means an
/// unchanged fingerprint set.
pub fn source_digest(data: &[u8]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_numeric_order() {
        let mut ids: Vec<RecordId> = ["10", "9", "100", "11"].into_iter().map(RecordId::from).collect();
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(RecordId::as_str).collect();
        assert_eq!(sorted, vec!["9", "10", "11", "100"]);
    }

    #[test]
    fn test_record_id_from_u64() {
        assert_eq!(RecordId::from(42u64), RecordId::from("42"));
    }

    #[test]
    fn test_new_record_is_inert() {
        assert!(CatalogRecord::new("a").is_inert());
    }

    #[test]
    fn test_source_digest_is_stable() {
        let a = source_digest(b"card bytes");
        assert_eq!(a.len(), 64);
        assert_eq!(a, source_digest(b"card bytes"));
        assert_ne!(a, source_digest(b"other bytes"));
    }

    #[test]
    fn test_record_json_shape() {
        let record = CatalogRecord::new("base1-4")
            .with_metadata(serde_json::json!({ "name": "Charizard" }));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "base1-4");
        assert_eq!(json["metadata"]["name"], "Charizard");
        assert!(json.get("sourceDigest").is_none());

        let restored: CatalogRecord = serde_json::from_value(json).unwrap();
        assert_eq!(restored, record);
    }
}
