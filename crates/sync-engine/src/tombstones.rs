/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Tombstone retention and safe-purge (C9).
//!
//! A tombstone (a `delete` entry in `_sync_log`) must stay retained until
//! every tracked client has pulled past it, otherwise a client that hasn't
//! yet seen the delete has no way to learn about it short of a full resync.

use crate::clients::min_known_version;
use crate::log_repo;
use crate::Result;
use rusqlite::Connection;

/// The version below which log entries are safe to purge: the lowest
/// `last_sync_version` across tracked clients not older than
/// `stale_before`, or `None` if there are no such clients (nothing is safe
/// to purge in that case, since an as-yet-unregistered or merely slow
/// client could still need the whole log).
pub fn safe_purge_floor(conn: &Connection, stale_before: &str) -> Result<Option<i64>> {
    min_known_version(conn, stale_before)
}

/// Deletes tombstones (`delete` log entries) at or below the safe floor.
/// This is the mandatory half of gc (§4.8) - non-tombstone rows are left
/// retained; compacting those away requires a caller to explicitly opt in
/// via [`compact`].
pub fn purge(conn: &Connection, stale_before: &str) -> Result<usize> {
    let floor = match safe_purge_floor(conn, stale_before)? {
        Some(v) => v,
        None => return Ok(0),
    };
    log_repo::purge_tombstones_below(conn, floor)
}

/// Full-log compaction: deletes every entry, tombstones included, at or
/// below the safe floor. An opt-in power operation (§4.8/§4.9) - callers
/// must invoke this deliberately rather than have it run on every gc.
pub fn compact(conn: &Connection, stale_before: &str) -> Result<usize> {
    let floor = match safe_purge_floor(conn, stale_before)? {
        Some(v) => v,
        None => return Ok(0),
    };
    log_repo::purge_below(conn, floor)
}

/// True if `client_version` has fallen below the oldest version still
/// retained in `_sync_log` - the client has missed entries that were
/// already purged and must perform a full resync rather than an
/// incremental pull (§4.6/§7 `FullResyncRequired`).
pub fn requires_full_resync(conn: &Connection, client_version: i64) -> Result<bool> {
    match log_repo::min_version(conn)? {
        Some(oldest) => Ok(client_version < oldest - 1),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients;
    use crate::schema;
    use sql_support::open_database::test_utils::open_memory_database;
    use sync_core::{Operation, SyncLogEntry};

    fn setup() -> Connection {
        open_memory_database(schema::migration_logic()).unwrap()
    }

    fn sample(version: i64, op: Operation) -> SyncLogEntry {
        SyncLogEntry {
            version,
            table_name: "widgets".into(),
            pk_value: serde_json::json!({"id": version}),
            operation: op,
            payload: if op == Operation::Delete {
                None
            } else {
                Some(serde_json::json!({"id": version}))
            },
            origin: "origin-a".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    const EPOCH: &str = "1970-01-01T00:00:00.000Z";

    #[test]
    fn test_no_clients_means_nothing_is_safe() {
        let conn = setup();
        log_repo::append(&conn, &sample(1, Operation::Insert)).unwrap();
        assert_eq!(safe_purge_floor(&conn, EPOCH).unwrap(), None);
        assert_eq!(purge(&conn, EPOCH).unwrap(), 0);
    }

    #[test]
    fn test_purge_only_removes_tombstones_below_the_floor() {
        let conn = setup();
        log_repo::append(&conn, &sample(1, Operation::Insert)).unwrap();
        log_repo::append(&conn, &sample(2, Operation::Insert)).unwrap();
        log_repo::append(&conn, &sample(3, Operation::Delete)).unwrap();
        clients::register(&conn, &"client-fast".into()).unwrap();
        clients::register(&conn, &"client-slow".into()).unwrap();
        clients::advance(&conn, &"client-fast".into(), 3).unwrap();
        clients::advance(&conn, &"client-slow".into(), 1).unwrap();
        assert_eq!(safe_purge_floor(&conn, EPOCH).unwrap(), Some(1));
        let purged = purge(&conn, EPOCH).unwrap();
        assert_eq!(purged, 0);
        assert_eq!(log_repo::entry_count(&conn).unwrap(), 3);
    }

    #[test]
    fn test_compact_removes_everything_below_the_floor() {
        let conn = setup();
        log_repo::append(&conn, &sample(1, Operation::Insert)).unwrap();
        log_repo::append(&conn, &sample(2, Operation::Delete)).unwrap();
        clients::register(&conn, &"client-a".into()).unwrap();
        clients::advance(&conn, &"client-a".into(), 2).unwrap();
        let purged = compact(&conn, EPOCH).unwrap();
        assert_eq!(purged, 2);
        assert_eq!(log_repo::entry_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_stale_client_does_not_block_purge() {
        let conn = setup();
        log_repo::append(&conn, &sample(1, Operation::Delete)).unwrap();
        clients::register(&conn, &"client-caught-up".into()).unwrap();
        clients::advance(&conn, &"client-caught-up".into(), 1).unwrap();
        clients::register(&conn, &"client-ghost".into()).unwrap();
        // The ghost client never advanced past version 0 and is old enough
        // to count as stale, so it must not pin the floor at 0.
        conn.execute(
            "UPDATE _sync_clients SET last_sync_timestamp = '2000-01-01T00:00:00.000Z'
             WHERE origin_id = 'client-ghost'",
            [],
        )
        .unwrap();
        let cutoff = clients::stale_cutoff("2026-01-01T00:00:00.000Z", clients::default_stale_window()).unwrap();
        assert_eq!(safe_purge_floor(&conn, &cutoff).unwrap(), Some(1));
        assert_eq!(purge(&conn, &cutoff).unwrap(), 1);
    }

    #[test]
    fn test_requires_full_resync_when_behind_retention() {
        let conn = setup();
        log_repo::append(&conn, &sample(5, Operation::Insert)).unwrap();
        assert!(!requires_full_resync(&conn, 5).unwrap());
        assert!(requires_full_resync(&conn, 3).unwrap());
    }
}
