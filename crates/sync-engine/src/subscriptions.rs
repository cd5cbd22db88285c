/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Subscription repository (C11): per-client interest filters that narrow
//! what a `pull` returns to a record, a table, or a stored query.

use crate::Result;
use rusqlite::{Connection, OptionalExtension};
use sync_core::timestamp::now_iso8601_ms;
use sync_guid::Guid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionType {
    Record,
    Table,
    Query,
}

impl SubscriptionType {
    fn as_str(&self) -> &'static str {
        match self {
            SubscriptionType::Record => "record",
            SubscriptionType::Table => "table",
            SubscriptionType::Query => "query",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "record" => SubscriptionType::Record,
            "table" => SubscriptionType::Table,
            _ => SubscriptionType::Query,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub subscription_id: Guid,
    pub origin_id: Guid,
    pub kind: SubscriptionType,
    pub table_name: Option<String>,
    pub filter: Option<String>,
    pub created_at: String,
    pub expires_at: Option<String>,
}

fn row_to_subscription(row: &rusqlite::Row) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        subscription_id: Guid::from(row.get::<_, String>(0)?),
        origin_id: Guid::from(row.get::<_, String>(1)?),
        kind: SubscriptionType::from_str(&row.get::<_, String>(2)?),
        table_name: row.get(3)?,
        filter: row.get(4)?,
        created_at: row.get(5)?,
        expires_at: row.get(6)?,
    })
}

pub fn create(
    conn: &Connection,
    origin_id: &Guid,
    kind: SubscriptionType,
    table_name: Option<&str>,
    filter: Option<&str>,
    expires_at: Option<&str>,
) -> Result<Guid> {
    let id = Guid::random();
    let now = now_iso8601_ms();
    conn.execute(
        "INSERT INTO _sync_subscriptions(subscription_id, origin_id, type, table_name, filter, created_at, expires_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id.as_str(),
            origin_id.as_str(),
            kind.as_str(),
            table_name,
            filter,
            now,
            expires_at,
        ],
    )?;
    Ok(id)
}

pub fn delete(conn: &Connection, subscription_id: &Guid) -> Result<()> {
    conn.execute(
        "DELETE FROM _sync_subscriptions WHERE subscription_id = ?",
        [subscription_id.as_str()],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, subscription_id: &Guid) -> Result<Option<Subscription>> {
    Ok(conn
        .query_row(
            "SELECT subscription_id, origin_id, type, table_name, filter, created_at, expires_at
             FROM _sync_subscriptions WHERE subscription_id = ?",
            [subscription_id.as_str()],
            row_to_subscription,
        )
        .optional()?)
}

pub fn by_origin(conn: &Connection, origin_id: &Guid) -> Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(
        "SELECT subscription_id, origin_id, type, table_name, filter, created_at, expires_at
         FROM _sync_subscriptions WHERE origin_id = ?",
    )?;
    let rows = stmt.query_map([origin_id.as_str()], row_to_subscription)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn by_table(conn: &Connection, table_name: &str) -> Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(
        "SELECT subscription_id, origin_id, type, table_name, filter, created_at, expires_at
         FROM _sync_subscriptions WHERE table_name = ? OR table_name IS NULL",
    )?;
    let rows = stmt.query_map([table_name], row_to_subscription)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Deletes subscriptions whose `expires_at` is in the past relative to
/// `now_iso8601`, which the caller supplies so this stays pure-SQL and
/// doesn't need its own clock dependency.
pub fn delete_expired(conn: &Connection, now_iso8601: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM _sync_subscriptions WHERE expires_at IS NOT NULL AND expires_at <= ?",
        [now_iso8601],
    )?)
}
