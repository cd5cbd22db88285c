/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Mapping configuration types (§3, §6.4).
//!
//! This config is consumed in-memory; `serde` derives exist so a host can
//! load a mapping set from its own JSON/TOML tooling, not because this
//! crate ever reads one itself.

use serde::{Deserialize, Serialize};
use sync_core::CanonicalValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingDirection {
    Push,
    Pull,
    Both,
}

impl MappingDirection {
    /// True if a mapping declared with this direction applies when entries
    /// are flowing in `direction`.
    pub fn matches(&self, direction: MappingDirection) -> bool {
        *self == MappingDirection::Both || *self == direction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedTableBehavior {
    Strict,
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkMapping {
    pub source_column: String,
    pub target_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ColumnMapping {
    Rename { source: String, target: String },
    Excluded { column: String },
    Constant { target: String, value: CanonicalValue },
    Lql { target: String, expr: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMapping {
    pub id: String,
    pub source_table: String,
    pub target_table: String,
    pub direction: MappingDirection,
    pub enabled: bool,
    pub pk_mapping: PkMapping,
    #[serde(default)]
    pub column_mappings: Vec<ColumnMapping>,
    #[serde(default)]
    pub excluded_columns: Vec<String>,
    #[serde(default)]
    pub filter: Option<String>,
}
