/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Mapping engine (C12): applies per-table rename/exclude/constant/LQL
//! column mappings to entries crossing mismatched schemas.

use crate::config::{ColumnMapping, MappingDirection, TableMapping, UnmappedTableBehavior};
use crate::lql;
use crate::Result;
use serde_json::Map as JsonMap;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use sync_core::model::payload_bindings;
use sync_core::{CanonicalValue, Operation, SyncLogEntry};

/// One entry produced by applying a single enabled [`TableMapping`] to an
/// incoming [`SyncLogEntry`]. A source entry can fan out into several of
/// these, one per matching mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedEntry {
    pub mapping_id: String,
    pub target_table: String,
    pub target_pk_value: CanonicalValue,
    pub operation: Operation,
    pub payload: Option<CanonicalValue>,
    /// Hex-encoded SHA-256 of the canonicalized payload, `None` for deletes.
    /// Callers use this to key `_sync_record_hashes` and suppress re-sending
    /// an identical mapped row.
    pub payload_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MappingOutcome {
    Success { entries: Vec<MappedEntry> },
    Skipped { reason: String },
}

fn hash_payload(payload: &CanonicalValue) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sync_core::canonical::canonicalize(payload).as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolves the target PK value from `entry.pk_value` - never from the
/// payload bindings, since `Delete` entries carry no payload at all but
/// still need their target PK computed (§4.11 step 2).
fn resolve_pk_value(entry: &SyncLogEntry, source_column: &str) -> CanonicalValue {
    entry
        .pk_value
        .get(source_column)
        .cloned()
        .unwrap_or(CanonicalValue::Null)
}

fn apply_one_mapping(
    entry: &SyncLogEntry,
    mapping: &TableMapping,
    bindings: &BTreeMap<String, CanonicalValue>,
) -> Result<MappedEntry> {
    let target_pk_value = resolve_pk_value(entry, &mapping.pk_mapping.source_column);

    let payload = match entry.operation {
        Operation::Delete => None,
        _ => {
            let mut target = JsonMap::new();
            for column_mapping in &mapping.column_mappings {
                match column_mapping {
                    ColumnMapping::Rename { source, target: target_col } => {
                        if mapping.excluded_columns.contains(target_col) {
                            continue;
                        }
                        if let Some(value) = bindings.get(source) {
                            target.insert(target_col.clone(), value.clone());
                        }
                    }
                    ColumnMapping::Excluded { .. } => {}
                    ColumnMapping::Constant { target: target_col, value } => {
                        if mapping.excluded_columns.contains(target_col) {
                            continue;
                        }
                        target.insert(target_col.clone(), value.clone());
                    }
                    ColumnMapping::Lql { target: target_col, expr } => {
                        if mapping.excluded_columns.contains(target_col) {
                            continue;
                        }
                        let value = lql::eval_str(expr, bindings)?;
                        target.insert(target_col.clone(), value);
                    }
                }
            }
            Some(CanonicalValue::Object(target))
        }
    };

    let payload_hash = payload.as_ref().map(hash_payload);

    Ok(MappedEntry {
        mapping_id: mapping.id.clone(),
        target_table: mapping.target_table.clone(),
        target_pk_value,
        operation: entry.operation,
        payload,
        payload_hash,
    })
}

/// Applies every enabled mapping whose `source_table`/`direction` matches
/// `entry`/`direction` (§4.11). `unmapped_behavior` governs what happens
/// when no mapping matches at all.
pub fn apply_mapping(
    entry: &SyncLogEntry,
    config: &[TableMapping],
    direction: MappingDirection,
    unmapped_behavior: UnmappedTableBehavior,
) -> Result<MappingOutcome> {
    let matching: Vec<&TableMapping> = config
        .iter()
        .filter(|m| m.enabled && m.source_table == entry.table_name && m.direction.matches(direction))
        .collect();

    if matching.is_empty() {
        return match unmapped_behavior {
            UnmappedTableBehavior::Strict => Ok(MappingOutcome::Skipped {
                reason: "no mapping".to_string(),
            }),
            UnmappedTableBehavior::Passthrough => {
                let payload_hash = entry.payload.as_ref().map(hash_payload);
                Ok(MappingOutcome::Success {
                    entries: vec![MappedEntry {
                        mapping_id: String::new(),
                        target_table: entry.table_name.clone(),
                        target_pk_value: entry.pk_value.clone(),
                        operation: entry.operation,
                        payload: entry.payload.clone(),
                        payload_hash,
                    }],
                })
            }
        };
    }

    let bindings = entry
        .payload
        .as_ref()
        .map(payload_bindings)
        .unwrap_or_default();

    let mut entries = Vec::with_capacity(matching.len());
    for mapping in matching {
        entries.push(apply_one_mapping(entry, mapping, &bindings)?);
    }
    Ok(MappingOutcome::Success { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PkMapping;
    use serde_json::json;

    fn entry() -> SyncLogEntry {
        SyncLogEntry {
            version: 1,
            table_name: "widgets".into(),
            pk_value: json!({"id": 1}),
            operation: Operation::Update,
            payload: Some(json!({"id": 1, "full_name": "Ada Lovelace", "secret": "x"})),
            origin: "origin-a".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    fn mapping() -> TableMapping {
        TableMapping {
            id: "m1".into(),
            source_table: "widgets".into(),
            target_table: "gadgets".into(),
            direction: MappingDirection::Both,
            enabled: true,
            pk_mapping: PkMapping {
                source_column: "id".into(),
                target_column: "gadget_id".into(),
            },
            column_mappings: vec![
                ColumnMapping::Rename {
                    source: "full_name".into(),
                    target: "name".into(),
                },
                ColumnMapping::Constant {
                    target: "source_system".into(),
                    value: json!("widgets-v1"),
                },
                ColumnMapping::Lql {
                    target: "name_upper".into(),
                    expr: "full_name |> upper()".into(),
                },
            ],
            excluded_columns: vec!["secret".into()],
            filter: None,
        }
    }

    #[test]
    fn test_strict_unmapped_table_is_skipped() {
        let e = SyncLogEntry {
            table_name: "unrelated".into(),
            ..entry()
        };
        let outcome = apply_mapping(&e, &[mapping()], MappingDirection::Push, UnmappedTableBehavior::Strict).unwrap();
        assert!(matches!(outcome, MappingOutcome::Skipped { .. }));
    }

    #[test]
    fn test_passthrough_unmapped_table_is_identity() {
        let e = SyncLogEntry {
            table_name: "unrelated".into(),
            ..entry()
        };
        let outcome = apply_mapping(&e, &[mapping()], MappingDirection::Push, UnmappedTableBehavior::Passthrough).unwrap();
        match outcome {
            MappingOutcome::Success { entries } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].target_table, "unrelated");
                assert_eq!(entries[0].payload, e.payload);
            }
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn test_rename_constant_and_lql_mappings() {
        let outcome = apply_mapping(&entry(), &[mapping()], MappingDirection::Push, UnmappedTableBehavior::Strict).unwrap();
        match outcome {
            MappingOutcome::Success { entries } => {
                assert_eq!(entries.len(), 1);
                let mapped = &entries[0];
                assert_eq!(mapped.target_table, "gadgets");
                assert_eq!(mapped.target_pk_value, json!(1));
                let payload = mapped.payload.as_ref().unwrap();
                assert_eq!(payload["name"], json!("Ada Lovelace"));
                assert_eq!(payload["source_system"], json!("widgets-v1"));
                assert_eq!(payload["name_upper"], json!("ADA LOVELACE"));
                assert!(payload.get("secret").is_none());
            }
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn test_delete_has_no_payload_but_computed_pk() {
        let e = SyncLogEntry {
            operation: Operation::Delete,
            payload: None,
            ..entry()
        };
        let outcome = apply_mapping(&e, &[mapping()], MappingDirection::Push, UnmappedTableBehavior::Strict).unwrap();
        match outcome {
            MappingOutcome::Success { entries } => {
                assert_eq!(entries[0].target_pk_value, json!(1));
                assert!(entries[0].payload.is_none());
                assert!(entries[0].payload_hash.is_none());
            }
            _ => panic!("expected success"),
        }
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let a = apply_mapping(&entry(), &[mapping()], MappingDirection::Push, UnmappedTableBehavior::Strict).unwrap();
        let b = apply_mapping(&entry(), &[mapping()], MappingDirection::Push, UnmappedTableBehavior::Strict).unwrap();
        assert_eq!(a, b);
    }
}
