/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Optional transport-side layer: the mapping engine (C12) and the LQL
//! expression evaluator (C13) it uses for computed column transforms.
//! Pure and database-free - persistence of mapping state and record hashes
//! is the embedder's responsibility.

mod config;
mod engine;
mod error;
pub mod lql;

pub use config::{ColumnMapping, MappingDirection, PkMapping, TableMapping, UnmappedTableBehavior};
pub use engine::{apply_mapping, MappedEntry, MappingOutcome};
pub use error::{Error, Result};
