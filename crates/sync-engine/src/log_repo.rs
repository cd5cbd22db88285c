/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Change log repository (C4): read/write access to `_sync_log`.

use crate::Result;
use rusqlite::{Connection, OptionalExtension, Row};
use sync_core::{Operation, SyncLogEntry};

fn row_to_entry(row: &Row) -> rusqlite::Result<SyncLogEntry> {
    let pk_value: String = row.get("pk_value")?;
    let payload: Option<String> = row.get("payload")?;
    let operation: String = row.get("operation")?;
    Ok(SyncLogEntry {
        version: row.get("version")?,
        table_name: row.get("table_name")?,
        pk_value: serde_json::from_str(&pk_value).unwrap_or(serde_json::Value::Null),
        operation: match operation.as_str() {
            "insert" => Operation::Insert,
            "update" => Operation::Update,
            _ => Operation::Delete,
        },
        payload: payload.and_then(|p| serde_json::from_str(&p).ok()),
        origin: row.get::<_, String>("origin")?.into(),
        timestamp: row.get("timestamp")?,
    })
}

/// Returns up to `limit` entries with `version > since_version`, ordered by
/// version ascending.
pub fn fetch_since(conn: &Connection, since_version: i64, limit: u32) -> Result<Vec<SyncLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT version, table_name, pk_value, operation, payload, origin, timestamp
         FROM _sync_log WHERE version > ? ORDER BY version ASC LIMIT ?",
    )?;
    let rows = stmt.query_map(rusqlite::params![since_version, limit], row_to_entry)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// The highest `version` currently present in `_sync_log`, or 0 if empty.
pub fn max_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _sync_log", [], |r| r.get(0))?)
}

/// The lowest `version` currently retained in `_sync_log`, or `None` if
/// empty - this is the floor below which a client must full-resync.
pub fn min_version(conn: &Connection) -> Result<Option<i64>> {
    Ok(conn
        .query_row("SELECT MIN(version) FROM _sync_log", [], |r| r.get(0))
        .optional()?
        .flatten())
}

pub fn entry_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM _sync_log", [], |r| r.get(0))?)
}

/// Inserts a single remotely-received entry, preserving its original
/// version number so cursor bookkeeping on the receiving side stays
/// consistent with the sender's log. Used only by test fixtures and
/// the applier's own bookkeeping; production capture always goes
/// through the triggers in `triggers.rs`.
pub fn append(conn: &Connection, entry: &SyncLogEntry) -> Result<()> {
    let operation = match entry.operation {
        Operation::Insert => "insert",
        Operation::Update => "update",
        Operation::Delete => "delete",
    };
    conn.execute(
        "INSERT INTO _sync_log(version, table_name, pk_value, operation, payload, origin, timestamp)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            entry.version,
            entry.table_name,
            sync_core::canonical::canonicalize(&entry.pk_value),
            operation,
            entry.payload.as_ref().map(sync_core::canonical::canonicalize),
            entry.origin.as_str(),
            entry.timestamp,
        ],
    )?;
    Ok(())
}

/// Deletes every log entry with `version <= floor`, tombstones included.
/// Full-log compaction - an opt-in power operation (§4.8): a client that
/// hasn't pulled past `floor` loses the ability to learn about a delete in
/// that range short of a full resync, so callers must invoke this
/// deliberately rather than have it run as part of routine gc.
pub fn purge_below(conn: &Connection, floor: i64) -> Result<usize> {
    Ok(conn.execute("DELETE FROM _sync_log WHERE version <= ?", [floor])?)
}

/// Deletes only tombstone (delete) entries with `version <= floor`. This is
/// the mandatory half of gc - non-tombstone rows are left retained until a
/// caller opts into full compaction via [`purge_below`].
pub fn purge_tombstones_below(conn: &Connection, floor: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM _sync_log WHERE version <= ? AND operation = 'delete'",
        [floor],
    )?)
}
