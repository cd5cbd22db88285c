/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Batch integrity hashing (C8).

use crate::canonical::canonicalize;
use crate::model::SyncLogEntry;
use sha2::{Digest, Sha256};

const FIELD_SEPARATOR: u8 = 0x1f; // ASCII unit separator

/// Computes the canonical hash of an ordered batch of entries. Identical for
/// byte-identical inputs regardless of platform; changes whenever any
/// canonical field of any entry changes.
pub fn compute_batch_hash(entries: &[SyncLogEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.version.to_string().as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(entry.table_name.as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(canonicalize(&entry.pk_value).as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(operation_tag(entry.operation).as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        match &entry.payload {
            Some(p) => hasher.update(canonicalize(p).as_bytes()),
            None => hasher.update(b"null"),
        }
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(entry.origin.as_bytes());
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(entry.timestamp.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

fn operation_tag(op: crate::model::Operation) -> &'static str {
    match op {
        crate::model::Operation::Insert => "insert",
        crate::model::Operation::Update => "update",
        crate::model::Operation::Delete => "delete",
    }
}

/// Verifies a previously computed hash against a batch, returning
/// [`crate::Error::HashMismatch`] on mismatch.
pub fn verify_batch_hash(entries: &[SyncLogEntry], expected: &str) -> crate::Result<()> {
    let actual = compute_batch_hash(entries);
    if actual == expected {
        Ok(())
    } else {
        Err(crate::Error::HashMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Operation;
    use serde_json::json;
    use sync_guid::Guid;

    fn entry(version: i64, payload: Option<serde_json::Value>) -> SyncLogEntry {
        SyncLogEntry {
            version,
            table_name: "widgets".into(),
            pk_value: json!({"id": version}),
            operation: if payload.is_some() {
                Operation::Insert
            } else {
                Operation::Delete
            },
            payload,
            origin: Guid::from("11111111-1111-1111-1111-111111111111"),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn test_hash_is_stable() {
        let entries = vec![entry(1, Some(json!({"name": "a"})))];
        assert_eq!(compute_batch_hash(&entries), compute_batch_hash(&entries));
    }

    #[test]
    fn test_hash_changes_with_any_field() {
        let base = compute_batch_hash(&[entry(1, Some(json!({"name": "a"})))]);
        let changed_payload = compute_batch_hash(&[entry(1, Some(json!({"name": "b"})))]);
        let changed_version = compute_batch_hash(&[entry(2, Some(json!({"name": "a"})))]);
        assert_ne!(base, changed_payload);
        assert_ne!(base, changed_version);
    }

    #[test]
    fn test_verify_mismatch() {
        let entries = vec![entry(1, None)];
        let err = verify_batch_hash(&entries, "not-the-real-hash").unwrap_err();
        assert!(matches!(err, crate::Error::HashMismatch { .. }));
    }
}
