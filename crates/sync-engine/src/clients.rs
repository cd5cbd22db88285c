/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Client tracker (C10): bookkeeping of what each known peer has pulled so
//! far, which in turn drives tombstone retention (`tombstones.rs`).

use crate::Result;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use sync_core::timestamp::now_iso8601_ms;
use sync_guid::Guid;

/// Clients unseen for longer than this no longer count toward the safe
/// purge version (§4.8/§4.9) - an unreachable peer shouldn't block
/// tombstone cleanup for the rest of the fleet indefinitely.
pub fn default_stale_window() -> Duration {
    Duration::days(30)
}

/// The `last_sync_timestamp` cutoff below which a client counts as stale,
/// given the caller's `now` and a staleness window. `now` and the result
/// are both ISO-8601 UTC timestamps, so callers can compare them directly
/// against `_sync_clients.last_sync_timestamp` as plain strings.
pub fn stale_cutoff(now: &str, window: Duration) -> Result<String> {
    let now: DateTime<Utc> = DateTime::parse_from_rfc3339(now)
        .map_err(|e| sync_core::Error::Database(format!("invalid timestamp {now:?}: {e}")))?
        .with_timezone(&Utc);
    Ok((now - window).to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub origin_id: Guid,
    pub last_sync_version: i64,
    pub last_sync_timestamp: String,
    pub created_at: String,
}

/// Registers a new client, or is a no-op if the client is already known.
pub fn register(conn: &Connection, origin_id: &Guid) -> Result<()> {
    let now = now_iso8601_ms();
    conn.execute(
        "INSERT OR IGNORE INTO _sync_clients(origin_id, last_sync_version, last_sync_timestamp, created_at)
         VALUES (?, 0, ?, ?)",
        rusqlite::params![origin_id.as_str(), now, now],
    )?;
    Ok(())
}

/// Advances a client's cursor to `version`, if `version` is greater than
/// what's already recorded - cursors are monotonic, a client re-pulling an
/// older range must never rewind its bookmark.
pub fn advance(conn: &Connection, origin_id: &Guid, version: i64) -> Result<()> {
    register(conn, origin_id)?;
    let now = now_iso8601_ms();
    conn.execute(
        "UPDATE _sync_clients
         SET last_sync_version = MAX(last_sync_version, ?), last_sync_timestamp = ?
         WHERE origin_id = ?",
        rusqlite::params![version, now, origin_id.as_str()],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, origin_id: &Guid) -> Result<Option<ClientRecord>> {
    Ok(conn
        .query_row(
            "SELECT origin_id, last_sync_version, last_sync_timestamp, created_at
             FROM _sync_clients WHERE origin_id = ?",
            [origin_id.as_str()],
            |row| {
                Ok(ClientRecord {
                    origin_id: Guid::from(row.get::<_, String>(0)?),
                    last_sync_version: row.get(1)?,
                    last_sync_timestamp: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?)
}

pub fn list(conn: &Connection) -> Result<Vec<ClientRecord>> {
    let mut stmt = conn.prepare(
        "SELECT origin_id, last_sync_version, last_sync_timestamp, created_at FROM _sync_clients",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ClientRecord {
            origin_id: Guid::from(row.get::<_, String>(0)?),
            last_sync_version: row.get(1)?,
            last_sync_timestamp: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// The lowest `last_sync_version` across every tracked client whose
/// `last_sync_timestamp` is at or after `stale_before`, or `None` if there
/// are no such clients. Clients last seen before `stale_before` are
/// excluded - see [`stale_clients`].
pub fn min_known_version(conn: &Connection, stale_before: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT MIN(last_sync_version) FROM _sync_clients WHERE last_sync_timestamp >= ?",
            [stale_before],
            |r| r.get(0),
        )
        .optional()?
        .flatten())
}

/// Clients whose `last_sync_timestamp` predates `stale_before` - excluded
/// from the safe purge version computation since they might still need
/// entries the rest of the fleet has already purged.
pub fn stale_clients(conn: &Connection, stale_before: &str) -> Result<Vec<ClientRecord>> {
    let mut stmt = conn.prepare(
        "SELECT origin_id, last_sync_version, last_sync_timestamp, created_at
         FROM _sync_clients WHERE last_sync_timestamp < ?",
    )?;
    let rows = stmt.query_map([stale_before], |row| {
        Ok(ClientRecord {
            origin_id: Guid::from(row.get::<_, String>(0)?),
            last_sync_version: row.get(1)?,
            last_sync_timestamp: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn forget(conn: &Connection, origin_id: &Guid) -> Result<()> {
    conn.execute("DELETE FROM _sync_clients WHERE origin_id = ?", [origin_id.as_str()])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use sql_support::open_database::test_utils::open_memory_database;

    #[test]
    fn test_register_and_advance() {
        let conn = open_memory_database(schema::migration_logic()).unwrap();
        let client: Guid = "client-a".into();
        register(&conn, &client).unwrap();
        advance(&conn, &client, 5).unwrap();
        let record = get(&conn, &client).unwrap().unwrap();
        assert_eq!(record.last_sync_version, 5);
    }

    #[test]
    fn test_advance_never_rewinds() {
        let conn = open_memory_database(schema::migration_logic()).unwrap();
        let client: Guid = "client-a".into();
        advance(&conn, &client, 10).unwrap();
        advance(&conn, &client, 3).unwrap();
        let record = get(&conn, &client).unwrap().unwrap();
        assert_eq!(record.last_sync_version, 10);
    }

    #[test]
    fn test_min_known_version_across_clients() {
        let conn = open_memory_database(schema::migration_logic()).unwrap();
        advance(&conn, &"client-a".into(), 10).unwrap();
        advance(&conn, &"client-b".into(), 3).unwrap();
        assert_eq!(min_known_version(&conn, "1970-01-01T00:00:00.000Z").unwrap(), Some(3));
    }

    #[test]
    fn test_stale_client_excluded_from_min_known_version() {
        let conn = open_memory_database(schema::migration_logic()).unwrap();
        let fresh: Guid = "client-fresh".into();
        let stale: Guid = "client-stale".into();
        advance(&conn, &fresh, 10).unwrap();
        advance(&conn, &stale, 1).unwrap();
        conn.execute(
            "UPDATE _sync_clients SET last_sync_timestamp = ? WHERE origin_id = ?",
            rusqlite::params!["2000-01-01T00:00:00.000Z", stale.as_str()],
        )
        .unwrap();

        let cutoff = stale_cutoff("2026-01-01T00:00:00.000Z", default_stale_window()).unwrap();
        assert_eq!(min_known_version(&conn, &cutoff).unwrap(), Some(10));
        let stale_list = stale_clients(&conn, &cutoff).unwrap();
        assert_eq!(stale_list.len(), 1);
        assert_eq!(stale_list[0].origin_id, stale);
    }
}
