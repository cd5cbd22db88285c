/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Pure, database-free building blocks shared by the sync engine and the
//! mapping layer: the error taxonomy, the change-log data model and its
//! canonical encoding, the conflict resolver, and the batch hash verifier.

pub mod canonical;
pub mod conflict;
mod error;
pub mod hash;
pub mod model;
pub mod timestamp;

pub use conflict::{is_conflict, resolve_lww, Winner};
pub use error::{Error, Result};
pub use model::{CanonicalValue, Operation, SyncLogEntry};
