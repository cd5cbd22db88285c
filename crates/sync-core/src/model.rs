/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sync_guid::Guid;

/// The kind of mutation a [`SyncLogEntry`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

/// A dynamically typed JSON value tree, used for both `pk_value` and `payload`.
///
/// Kept as an explicit tagged tree (rather than passing `serde_json::Value`
/// around unwrapped) so canonicalization - key order, number formatting - is
/// owned by one small module instead of being re-derived at every call site.
pub type CanonicalValue = serde_json::Value;

/// One row of the unified, append-only change log (`_sync_log`).
///
/// See the crate-level documentation for the invariants this type is
/// expected to uphold: strictly increasing `version`, unique `(origin,
/// version)` pairs, and a `None` payload exactly when `operation` is
/// `Delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub version: i64,
    #[serde(rename = "tableName")]
    pub table_name: String,
    #[serde(rename = "pkValue")]
    pub pk_value: CanonicalValue,
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<CanonicalValue>,
    pub origin: Guid,
    pub timestamp: String,
}

impl SyncLogEntry {
    /// Two entries are for the same logical row if they target the same table
    /// and carry the same (canonicalized) primary-key value.
    pub fn same_row(&self, other: &SyncLogEntry) -> bool {
        self.table_name == other.table_name
            && crate::canonical::canonicalize(&self.pk_value)
                == crate::canonical::canonicalize(&other.pk_value)
    }

    /// Extracts the single primary-key column's value from `pk_value`.
    ///
    /// `pk_value` is a JSON object produced by the trigger generator
    /// (`json_object(pk_col, NEW.pk_col)`); composite primary keys are
    /// rejected at trigger-install time (see [`crate::Error::CompositePrimaryKey`]),
    /// so exactly one entry is expected here.
    pub fn single_pk_value(&self) -> Option<(&str, &CanonicalValue)> {
        self.pk_value
            .as_object()
            .and_then(|obj| obj.iter().next())
            .map(|(k, v)| (k.as_str(), v))
    }
}

/// A row-version column value, used by the applier to decide whether an
/// incoming change is stale (§4.5). Any JSON number or string-encoded
/// integer found under the configured version-column name is treated as
/// comparable via ordinary integer ordering.
pub fn extract_version_column(payload: &CanonicalValue, column: &str) -> Option<i64> {
    payload.as_object()?.get(column).and_then(|v| {
        if let Some(n) = v.as_i64() {
            Some(n)
        } else {
            v.as_str().and_then(|s| s.parse().ok())
        }
    })
}

/// Converts a payload's top-level object into a flat `(column, value)` map,
/// used by the mapping engine when evaluating column transforms. Keeps the
/// lookup ordered for deterministic iteration in tests.
pub fn payload_bindings(payload: &CanonicalValue) -> BTreeMap<String, CanonicalValue> {
    payload
        .as_object()
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default()
}
