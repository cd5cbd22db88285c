/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Change applier (C6): idempotently replays a remote [`SyncLogEntry`]
//! against the local tables.
//!
//! Callers must apply entries under a [`crate::SuppressionGuard`] - nothing
//! here touches `_sync_session` itself, it assumes the caller already has.

use crate::catalog::{quote_ident, single_primary_key, table_columns};
use crate::{Error, Result};
use rusqlite::Connection;
use sync_core::model::extract_version_column;
use sync_core::{Operation, SyncLogEntry};

/// The outcome of attempting to apply one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The row was inserted, updated, or deleted.
    Applied,
    /// A version-column comparison found the incoming change no newer than
    /// what's already stored; applying it would be a regression, so it was
    /// dropped. This counts as success, not a conflict - see §7.
    SkippedStale,
    /// The statement hit a foreign-key violation; the caller should retry
    /// this entry in a later pass, once whatever it depends on has landed.
    Deferred,
}

fn local_version(
    conn: &Connection,
    table: &str,
    pk_col: &str,
    pk_value: &serde_json::Value,
    version_column: &str,
) -> Result<Option<i64>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        quote_ident(version_column),
        quote_ident(table),
        quote_ident(pk_col)
    );
    let bound = pk_value_to_sql(pk_value);
    conn.query_row(&sql, [bound], |row| row.get::<_, Option<i64>>(0))
        .or_else(|e| {
            if matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                Ok(None)
            } else {
                Err(e)
            }
        })
        .map_err(Error::from)
}

fn pk_value_to_sql(v: &serde_json::Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as SqlValue;
    match v {
        serde_json::Value::Null => SqlValue::Null,
        serde_json::Value::Bool(b) => SqlValue::Integer(*b as i64),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn upsert(
    conn: &Connection,
    table: &str,
    pk_col: &str,
    payload: &serde_json::Value,
) -> Result<()> {
    let known_cols: Vec<String> = table_columns(conn, table)?.into_iter().map(|c| c.name).collect();
    let obj = payload
        .as_object()
        .ok_or_else(|| sync_core::Error::DeferredChangeFailed("payload is not an object".into()))?;

    for key in obj.keys() {
        if !known_cols.iter().any(|c| c == key) {
            return Err(Error::UnknownColumn {
                table: table.to_string(),
                column: key.clone(),
            });
        }
    }

    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    let mut values: Vec<rusqlite::types::Value> = Vec::new();
    for col in &known_cols {
        if let Some(v) = obj.get(col) {
            cols.push(quote_ident(col));
            placeholders.push("?".to_string());
            values.push(pk_value_to_sql(v));
        }
    }

    let update_clause = known_cols
        .iter()
        .filter(|c| *c != pk_col && obj.contains_key(*c))
        .map(|c| format!("{} = excluded.{}", quote_ident(c), quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = if update_clause.is_empty() {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) DO NOTHING",
            quote_ident(table),
            cols.join(", "),
            placeholders.join(", "),
            quote_ident(pk_col)
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) DO UPDATE SET {}",
            quote_ident(table),
            cols.join(", "),
            placeholders.join(", "),
            quote_ident(pk_col),
            update_clause
        )
    };

    let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
    conn.execute(&sql, params.as_slice())?;
    Ok(())
}

fn delete_row(conn: &Connection, table: &str, pk_col: &str, pk_value: &serde_json::Value) -> Result<()> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        quote_ident(table),
        quote_ident(pk_col)
    );
    conn.execute(&sql, [pk_value_to_sql(pk_value)])?;
    Ok(())
}

/// Applies one entry against `table`. `version_column`, when given, names a
/// column in the row's own payload (e.g. an `updated_at` or `version`
/// field) used to reject stale incoming writes - see §4.5.
pub fn apply(
    conn: &Connection,
    entry: &SyncLogEntry,
    version_column: Option<&str>,
) -> Result<ApplyOutcome> {
    let pk_col = single_primary_key(conn, &entry.table_name)?;
    let (_, pk_value) = entry
        .single_pk_value()
        .ok_or_else(|| sync_core::Error::DeferredChangeFailed("missing pk_value".into()))?;

    match entry.operation {
        Operation::Insert | Operation::Update => {
            let payload = entry
                .payload
                .as_ref()
                .ok_or_else(|| sync_core::Error::DeferredChangeFailed("missing payload".into()))?;

            if let Some(column) = version_column {
                if let Some(incoming) = extract_version_column(payload, column) {
                    if let Some(local) = local_version(conn, &entry.table_name, &pk_col, pk_value, column)? {
                        if incoming <= local {
                            return Ok(ApplyOutcome::SkippedStale);
                        }
                    }
                }
            }

            match upsert(conn, &entry.table_name, &pk_col, payload) {
                Ok(()) => Ok(ApplyOutcome::Applied),
                Err(e) if is_fk_violation(&e) => Ok(ApplyOutcome::Deferred),
                Err(e) => Err(e),
            }
        }
        Operation::Delete => match delete_row(conn, &entry.table_name, &pk_col, pk_value) {
            Ok(()) => Ok(ApplyOutcome::Applied),
            Err(e) if is_fk_violation(&e) => Ok(ApplyOutcome::Deferred),
            Err(e) => Err(e),
        },
    }
}

fn is_fk_violation(e: &Error) -> bool {
    e.is_foreign_key_violation()
}
