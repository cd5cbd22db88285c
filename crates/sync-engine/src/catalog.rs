/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Reads table shape from SQLite's own catalog (`PRAGMA table_info`), so the
//! trigger generator and the applier never need a column list to be handed
//! to them by the caller.

use crate::Result;
use rusqlite::Connection;

#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub is_primary_key: bool,
}

/// Returns every column of `table`, in declaration order, via
/// `PRAGMA table_info`.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let sql = format!("PRAGMA table_info({})", quote_ident(table));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(ColumnInfo {
            name: row.get::<_, String>(1)?,
            is_primary_key: row.get::<_, i64>(5)? > 0,
        })
    })?;
    let mut cols = Vec::new();
    for row in rows {
        cols.push(row?);
    }
    Ok(cols)
}

/// Returns the table's single primary-key column.
///
/// Errors with [`sync_core::Error::CompositePrimaryKey`] if the table has
/// zero or more than one primary-key column - the apply path (§4.5) only
/// supports single-column primary keys, so we reject the ambiguous case up
/// front, at trigger-install time, rather than fail unpredictably later.
pub fn single_primary_key(conn: &Connection, table: &str) -> Result<String> {
    let cols = table_columns(conn, table)?;
    let mut pk_cols = cols.into_iter().filter(|c| c.is_primary_key);
    let first = pk_cols
        .next()
        .ok_or_else(|| sync_core::Error::CompositePrimaryKey(table.to_string()))?;
    if pk_cols.next().is_some() {
        return Err(sync_core::Error::CompositePrimaryKey(table.to_string()).into());
    }
    Ok(first.name)
}

/// Quotes an identifier for interpolation into generated DDL/DML. Table and
/// column names here always come from `sqlite_master`/`PRAGMA table_info`,
/// never from untrusted input, but we still quote defensively since SQLite
/// permits identifiers that would otherwise need escaping (reserved words,
/// embedded punctuation).
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_primary_key() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE widgets(id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        assert_eq!(single_primary_key(&conn, "widgets").unwrap(), "id");
    }

    #[test]
    fn test_composite_primary_key_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE widgets(a INTEGER, b INTEGER, name TEXT, PRIMARY KEY(a, b))",
        )
        .unwrap();
        let err = single_primary_key(&conn, "widgets").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Core(sync_core::Error::CompositePrimaryKey(_))
        ));
    }

    #[test]
    fn test_missing_primary_key_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE widgets(name TEXT)").unwrap();
        assert!(single_primary_key(&conn, "widgets").is_err());
    }
}
