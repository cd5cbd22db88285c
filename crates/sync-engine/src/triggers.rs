/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Trigger generator (C3).
//!
//! Emits the three AFTER-triggers that capture every local mutation of a
//! tracked table into `_sync_log`, gated on `_sync_session.sync_active`
//! being 0. The session flag is the only mechanism preventing echo on
//! apply (§4.2); nothing outside `session::SuppressionGuard` may toggle it.

use crate::catalog::{quote_ident, single_primary_key, table_columns};
use crate::Result;
use rusqlite::Connection;
use sql_support::ConnExt;

const SUPPRESSION_GUARD: &str = "(SELECT sync_active FROM _sync_session WHERE id = 0) = 0";
const ORIGIN_EXPR: &str = "(SELECT value FROM _sync_state WHERE key = 'origin_id')";
const TIMESTAMP_EXPR: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

fn trigger_name(table: &str, suffix: &str) -> String {
    format!("_sync_trig_{}_{}", table, suffix)
}

fn json_object_expr(columns: &[String], prefix: &str) -> String {
    let mut parts = Vec::with_capacity(columns.len());
    for col in columns {
        parts.push(format!("'{}', {}.{}", col, prefix, quote_ident(col)));
    }
    format!("json_object({})", parts.join(", "))
}

/// Drops any previously installed capture triggers for `table`. Safe to call
/// on a table that was never instrumented.
pub fn drop_triggers(conn: &Connection, table: &str) -> Result<()> {
    for suffix in ["ai", "au", "ad"] {
        conn.execute_batch(&format!(
            "DROP TRIGGER IF EXISTS {}",
            quote_ident(&trigger_name(table, suffix))
        ))?;
    }
    Ok(())
}

/// (Re-)installs the INSERT/UPDATE/DELETE capture triggers for `table`.
///
/// Column and primary-key discovery goes through `PRAGMA table_info`
/// (`catalog::table_columns`/`single_primary_key`); composite primary keys
/// are rejected here rather than silently mis-capturing half the key.
pub fn install_triggers(conn: &Connection, table: &str) -> Result<()> {
    let pk_col = single_primary_key(conn, table)?;
    let all_cols: Vec<String> = table_columns(conn, table)?
        .into_iter()
        .map(|c| c.name)
        .collect();

    drop_triggers(conn, table)?;

    let pk_cols = vec![pk_col.clone()];
    let insert_sql = format!(
        "CREATE TRIGGER {name} AFTER INSERT ON {table} WHEN {guard}
         BEGIN
           INSERT INTO _sync_log(table_name, pk_value, operation, payload, origin, timestamp)
           VALUES ('{table}', {pk_json}, 'insert', {payload_json}, {origin}, {ts});
         END;",
        name = quote_ident(&trigger_name(table, "ai")),
        table = table,
        guard = SUPPRESSION_GUARD,
        pk_json = json_object_expr(&pk_cols, "NEW"),
        payload_json = json_object_expr(&all_cols, "NEW"),
        origin = ORIGIN_EXPR,
        ts = TIMESTAMP_EXPR,
    );

    let update_sql = format!(
        "CREATE TRIGGER {name} AFTER UPDATE ON {table} WHEN {guard}
         BEGIN
           INSERT INTO _sync_log(table_name, pk_value, operation, payload, origin, timestamp)
           VALUES ('{table}', {pk_json}, 'update', {payload_json}, {origin}, {ts});
         END;",
        name = quote_ident(&trigger_name(table, "au")),
        table = table,
        guard = SUPPRESSION_GUARD,
        pk_json = json_object_expr(&pk_cols, "NEW"),
        payload_json = json_object_expr(&all_cols, "NEW"),
        origin = ORIGIN_EXPR,
        ts = TIMESTAMP_EXPR,
    );

    let delete_sql = format!(
        "CREATE TRIGGER {name} AFTER DELETE ON {table} WHEN {guard}
         BEGIN
           INSERT INTO _sync_log(table_name, pk_value, operation, payload, origin, timestamp)
           VALUES ('{table}', {pk_json}, 'delete', NULL, {origin}, {ts});
         END;",
        name = quote_ident(&trigger_name(table, "ad")),
        table = table,
        guard = SUPPRESSION_GUARD,
        pk_json = json_object_expr(&pk_cols, "OLD"),
        origin = ORIGIN_EXPR,
        ts = TIMESTAMP_EXPR,
    );

    conn.execute_all(&[&insert_sql, &update_sql, &delete_sql])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use sql_support::open_database::test_utils::open_memory_database;

    fn setup() -> Connection {
        let conn = open_memory_database(schema::migration_logic()).unwrap();
        conn.execute_batch("CREATE TABLE widgets(id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        conn.execute(
            "UPDATE _sync_state SET value = ? WHERE key = 'origin_id'",
            ["origin-a"],
        )
        .unwrap();
        install_triggers(&conn, "widgets").unwrap();
        conn
    }

    fn log_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM _sync_log", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_is_captured() {
        let conn = setup();
        conn.execute("INSERT INTO widgets(id, name) VALUES (1, 'a')", [])
            .unwrap();
        assert_eq!(log_count(&conn), 1);
        let (op, pk, payload, origin): (String, String, Option<String>, String) = conn
            .query_row(
                "SELECT operation, pk_value, payload, origin FROM _sync_log",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!(op, "insert");
        assert_eq!(pk, r#"{"id":1}"#);
        assert_eq!(payload.unwrap(), r#"{"id":1,"name":"a"}"#);
        assert_eq!(origin, "origin-a");
    }

    #[test]
    fn test_update_and_delete_are_captured() {
        let conn = setup();
        conn.execute("INSERT INTO widgets(id, name) VALUES (1, 'a')", [])
            .unwrap();
        conn.execute("UPDATE widgets SET name = 'b' WHERE id = 1", [])
            .unwrap();
        conn.execute("DELETE FROM widgets WHERE id = 1", []).unwrap();
        assert_eq!(log_count(&conn), 3);
        let ops: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT operation FROM _sync_log ORDER BY version")
                .unwrap();
            stmt.query_map([], |r| r.get(0))
                .unwrap()
                .map(|r| r.unwrap())
                .collect()
        };
        assert_eq!(ops, vec!["insert", "update", "delete"]);
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM _sync_log WHERE operation = 'delete'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert!(payload.is_none());
    }

    #[test]
    fn test_suppression_prevents_capture() {
        let conn = setup();
        conn.execute("UPDATE _sync_session SET sync_active = 1", [])
            .unwrap();
        conn.execute("INSERT INTO widgets(id, name) VALUES (1, 'a')", [])
            .unwrap();
        assert_eq!(log_count(&conn), 0);
    }

    #[test]
    fn test_composite_pk_rejected_at_install() {
        let conn = open_memory_database(schema::migration_logic()).unwrap();
        conn.execute_batch(
            "CREATE TABLE pairs(a INTEGER, b INTEGER, name TEXT, PRIMARY KEY(a, b))",
        )
        .unwrap();
        assert!(install_triggers(&conn, "pairs").is_err());
    }
}
