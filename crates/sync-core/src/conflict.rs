/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Deterministic last-writer-wins conflict resolution (C7).
//!
//! This module is pure: it decides who wins, but never mutates anything.
//! The applier (`sync-engine`) is responsible for actually discarding the
//! loser's write.

use crate::model::SyncLogEntry;

/// Two entries conflict if they touch the same row (same table, same
/// primary-key value) but originated at different replicas.
pub fn is_conflict(a: &SyncLogEntry, b: &SyncLogEntry) -> bool {
    a.same_row(b) && a.origin != b.origin
}

/// Which of two conflicting entries should win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    A,
    B,
}

/// Resolves a conflict between `a` and `b` using last-writer-wins over
/// `(timestamp, origin)`. Ties are not possible given globally unique
/// origins, but the origin comparison keeps the function total.
pub fn resolve_lww(a: &SyncLogEntry, b: &SyncLogEntry) -> Winner {
    let key_a = (&a.timestamp, a.origin.as_str());
    let key_b = (&b.timestamp, b.origin.as_str());
    if key_a >= key_b {
        Winner::A
    } else {
        Winner::B
    }
}
