/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Sync metadata schema (C2).
//!
//! All tables here are prefixed `_sync_` and owned by the engine; callers
//! must never write to them directly. Schema lifecycle follows the same
//! `PRAGMA user_version`-keyed migration runner the rest of the workspace
//! uses (see `sql_support::open_database`), so future column additions are
//! added as numbered `upgrade_from` steps rather than ad-hoc `IF NOT EXISTS`
//! calls scattered at call sites.

use rusqlite::Connection;
use sql_support::open_database::{ErrorHandling, MigrationLogic};
use sql_support::ConnExt;

/// The current schema version. Bump this, and add an entry to `upgrades`,
/// whenever `_sync_*` table shapes change.
pub const VERSION: u32 = 1;

const CREATE_SYNC_STATE: &str = "
    CREATE TABLE IF NOT EXISTS _sync_state (
        key   TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    );
";

const CREATE_SYNC_SESSION: &str = "
    CREATE TABLE IF NOT EXISTS _sync_session (
        id          INTEGER PRIMARY KEY CHECK (id = 0),
        sync_active INTEGER NOT NULL DEFAULT 0
    );
";

const CREATE_SYNC_LOG: &str = "
    CREATE TABLE IF NOT EXISTS _sync_log (
        version    INTEGER PRIMARY KEY AUTOINCREMENT,
        table_name TEXT NOT NULL,
        pk_value   TEXT NOT NULL,
        operation  TEXT NOT NULL CHECK (operation IN ('insert', 'update', 'delete')),
        payload    TEXT,
        origin     TEXT NOT NULL,
        timestamp  TEXT NOT NULL
    );
";

const CREATE_SYNC_LOG_TABLE_VERSION_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_sync_log_table_version ON _sync_log(table_name, version);";

const CREATE_SYNC_CLIENTS: &str = "
    CREATE TABLE IF NOT EXISTS _sync_clients (
        origin_id          TEXT PRIMARY KEY NOT NULL,
        last_sync_version  INTEGER NOT NULL DEFAULT 0,
        last_sync_timestamp TEXT NOT NULL,
        created_at         TEXT NOT NULL
    );
";

const CREATE_SYNC_SUBSCRIPTIONS: &str = "
    CREATE TABLE IF NOT EXISTS _sync_subscriptions (
        subscription_id TEXT PRIMARY KEY NOT NULL,
        origin_id       TEXT NOT NULL,
        type            TEXT NOT NULL CHECK (type IN ('record', 'table', 'query')),
        table_name      TEXT,
        filter          TEXT,
        created_at      TEXT NOT NULL,
        expires_at      TEXT
    );
";

const CREATE_SYNC_SUBSCRIPTIONS_ORIGIN_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_sync_subscriptions_origin ON _sync_subscriptions(origin_id);";
const CREATE_SYNC_SUBSCRIPTIONS_TABLE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_sync_subscriptions_table ON _sync_subscriptions(table_name);";

const CREATE_SYNC_MAPPING_STATE: &str = "
    CREATE TABLE IF NOT EXISTS _sync_mapping_state (
        mapping_id          TEXT PRIMARY KEY NOT NULL,
        last_synced_version INTEGER NOT NULL DEFAULT 0
    );
";

const CREATE_SYNC_RECORD_HASHES: &str = "
    CREATE TABLE IF NOT EXISTS _sync_record_hashes (
        mapping_id   TEXT NOT NULL,
        source_pk    TEXT NOT NULL,
        payload_hash TEXT NOT NULL,
        PRIMARY KEY (mapping_id, source_pk)
    );
";

/// Reserved `_sync_state` keys.
pub const ORIGIN_ID_KEY: &str = "origin_id";
pub const LAST_SERVER_VERSION_KEY: &str = "last_server_version";

fn create(conn: &Connection) -> sql_support::open_database::Result<()> {
    conn.execute_all(&[
        CREATE_SYNC_STATE,
        CREATE_SYNC_SESSION,
        CREATE_SYNC_LOG,
        CREATE_SYNC_LOG_TABLE_VERSION_INDEX,
        CREATE_SYNC_CLIENTS,
        CREATE_SYNC_SUBSCRIPTIONS,
        CREATE_SYNC_SUBSCRIPTIONS_ORIGIN_INDEX,
        CREATE_SYNC_SUBSCRIPTIONS_TABLE_INDEX,
        CREATE_SYNC_MAPPING_STATE,
        CREATE_SYNC_RECORD_HASHES,
    ])?;
    conn.execute(
        "INSERT OR IGNORE INTO _sync_state (key, value) VALUES (?, '')",
        [ORIGIN_ID_KEY],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO _sync_state (key, value) VALUES (?, '0')",
        [LAST_SERVER_VERSION_KEY],
    )?;
    conn.execute("INSERT OR IGNORE INTO _sync_session (id, sync_active) VALUES (0, 0)", [])?;
    Ok(())
}

pub fn migration_logic() -> MigrationLogic {
    MigrationLogic {
        name: "sync-engine".to_string(),
        start_version: VERSION,
        end_version: VERSION,
        prepare: None,
        init: create,
        upgrades: Vec::new(),
        finish: None,
        error_handling: ErrorHandling::ReturnError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_support::open_database::test_utils::open_memory_database;

    #[test]
    fn test_create_schema() {
        let conn = open_memory_database(migration_logic()).unwrap();
        let origin: String = conn
            .query_row(
                "SELECT value FROM _sync_state WHERE key = ?",
                [ORIGIN_ID_KEY],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(origin, "");
        let active: i64 = conn
            .query_row("SELECT sync_active FROM _sync_session", [], |r| r.get(0))
            .unwrap();
        assert_eq!(active, 0);
    }
}
