/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Orchestration facade (C14): the single entry point embedders use to
//! drive the engine, tying together schema creation, trigger installation,
//! the log repository, the applier, client tracking, and tombstone gc.

use crate::applier;
pub use crate::applier::ApplyOutcome;
use crate::clients::{self, ClientRecord};
use crate::log_repo;
use crate::schema;
use crate::session::SuppressionGuard;
use crate::subscriptions::{self, Subscription, SubscriptionType};
use crate::tombstones;
use crate::triggers;
use crate::Result;
use interrupt_support::{Interruptee, SqlInterruptHandle, SqlInterruptScope};
use rusqlite::{Connection, OpenFlags};
use sql_support::open_database::{open_database, open_database_with_flags, DatabaseLocation};
use std::path::Path;
use std::sync::Arc;
use sync_core::SyncLogEntry;
use sync_guid::Guid;

pub struct PullResult {
    pub entries: Vec<SyncLogEntry>,
    pub next_version: i64,
    pub full_resync_required: bool,
}

pub struct PushResult {
    pub applied: usize,
    pub skipped_stale: usize,
    pub deferred: Vec<SyncLogEntry>,
}

pub struct GcResult {
    pub tombstones_purged: usize,
    pub subscriptions_expired: usize,
    /// Clients excluded from the safe purge version because they haven't
    /// been seen within the configured staleness window (§4.8/§4.9).
    pub stale_clients: Vec<ClientRecord>,
}

/// Embedder-facing handle onto one local replica's sync-enabled database.
pub struct SyncEngine {
    conn: Connection,
    interrupt_handle: Arc<SqlInterruptHandle>,
    interrupt_scope: SqlInterruptScope,
}

impl SyncEngine {
    /// Opens (creating if necessary) the `_sync_*` metadata schema at
    /// `path`, and assigns `origin` as this replica's id the first time
    /// it's opened - subsequent opens reuse the stored value and ignore
    /// this argument.
    pub fn initialize(path: impl AsRef<Path>, origin: Option<Guid>) -> Result<Self> {
        let conn = open_database(path.as_ref().to_path_buf(), schema::migration_logic())?;
        Self::from_connection(conn, origin)
    }

    pub fn initialize_in_memory(origin: Option<Guid>) -> Result<Self> {
        let conn = open_database_with_flags(
            DatabaseLocation::Memory,
            OpenFlags::default(),
            schema::migration_logic(),
        )?;
        Self::from_connection(conn, origin)
    }

    fn from_connection(conn: Connection, origin: Option<Guid>) -> Result<Self> {
        let existing: String = conn.query_row(
            "SELECT value FROM _sync_state WHERE key = ?",
            [schema::ORIGIN_ID_KEY],
            |r| r.get(0),
        )?;
        if existing.is_empty() {
            let origin = origin.unwrap_or_else(Guid::random);
            conn.execute(
                "UPDATE _sync_state SET value = ? WHERE key = ?",
                rusqlite::params![origin.as_str(), schema::ORIGIN_ID_KEY],
            )?;
        }
        let interrupt_handle = Arc::new(SqlInterruptHandle::new(&conn));
        let interrupt_scope = SqlInterruptScope::for_handle(&interrupt_handle);
        Ok(SyncEngine {
            conn,
            interrupt_handle,
            interrupt_scope,
        })
    }

    pub fn origin(&self) -> Result<Guid> {
        let value: String = self.conn.query_row(
            "SELECT value FROM _sync_state WHERE key = ?",
            [schema::ORIGIN_ID_KEY],
            |r| r.get(0),
        )?;
        Ok(Guid::from(value))
    }

    /// Installs (or reinstalls) local capture triggers on `table`. Must be
    /// called once per tracked table before any of its mutations will show
    /// up in `_sync_log`.
    pub fn track_table(&self, table: &str) -> Result<()> {
        triggers::install_triggers(&self.conn, table)
    }

    pub fn untrack_table(&self, table: &str) -> Result<()> {
        triggers::drop_triggers(&self.conn, table)
    }

    /// Returns up to `limit` locally captured entries after `since_version`,
    /// for shipping out to a peer.
    pub fn pull(&self, since_version: i64, limit: u32) -> Result<PullResult> {
        self.interrupt_scope
            .err_if_interrupted()
            .map_err(sync_core::Error::from)?;
        let full_resync_required = tombstones::requires_full_resync(&self.conn, since_version)?;
        let entries = log_repo::fetch_since(&self.conn, since_version, limit)?;
        let next_version = entries
            .last()
            .map(|e| e.version)
            .unwrap_or(since_version);
        Ok(PullResult {
            entries,
            next_version,
            full_resync_required,
        })
    }

    /// Applies a batch of entries received from a peer. Entries that hit a
    /// foreign-key violation are retried once, after the rest of the batch
    /// has landed (§4.5's deferral pass), since a dependency earlier in the
    /// same batch may unblock them; anything still failing after that is
    /// returned in `PushResult::deferred` for the caller to retry on a
    /// later `push`.
    pub fn push(&self, entries: &[SyncLogEntry], version_column: Option<&str>) -> Result<PushResult> {
        self.interrupt_scope
            .err_if_interrupted()
            .map_err(sync_core::Error::from)?;
        let mut applied = 0;
        let mut skipped_stale = 0;
        let mut deferred = Vec::new();

        {
            let _guard = SuppressionGuard::new(&self.conn)?;
            for entry in entries {
                self.interrupt_scope
                    .err_if_interrupted()
                    .map_err(sync_core::Error::from)?;
                match applier::apply(&self.conn, entry, version_column)? {
                    ApplyOutcome::Applied => applied += 1,
                    ApplyOutcome::SkippedStale => skipped_stale += 1,
                    ApplyOutcome::Deferred => deferred.push(entry.clone()),
                }
            }

            if !deferred.is_empty() {
                let mut still_deferred = Vec::new();
                for entry in &deferred {
                    self.interrupt_scope
                        .err_if_interrupted()
                        .map_err(sync_core::Error::from)?;
                    match applier::apply(&self.conn, entry, version_column)? {
                        ApplyOutcome::Applied => applied += 1,
                        ApplyOutcome::SkippedStale => skipped_stale += 1,
                        ApplyOutcome::Deferred => still_deferred.push(entry.clone()),
                    }
                }
                deferred = still_deferred;
            }
        }

        Ok(PushResult {
            applied,
            skipped_stale,
            deferred,
        })
    }

    pub fn register_client(&self, origin_id: &Guid) -> Result<()> {
        clients::register(&self.conn, origin_id)
    }

    pub fn advance_client(&self, origin_id: &Guid, version: i64) -> Result<()> {
        clients::advance(&self.conn, origin_id, version)
    }

    pub fn client_state(&self, origin_id: &Guid) -> Result<Option<ClientRecord>> {
        clients::get(&self.conn, origin_id)
    }

    pub fn clients(&self) -> Result<Vec<ClientRecord>> {
        clients::list(&self.conn)
    }

    pub fn subscribe(
        &self,
        origin_id: &Guid,
        kind: SubscriptionType,
        table_name: Option<&str>,
        filter: Option<&str>,
        expires_at: Option<&str>,
    ) -> Result<Guid> {
        subscriptions::create(&self.conn, origin_id, kind, table_name, filter, expires_at)
    }

    pub fn unsubscribe(&self, subscription_id: &Guid) -> Result<()> {
        subscriptions::delete(&self.conn, subscription_id)
    }

    pub fn subscriptions_for(&self, origin_id: &Guid) -> Result<Vec<Subscription>> {
        subscriptions::by_origin(&self.conn, origin_id)
    }

    /// Runs routine maintenance (§4.13): purges subscriptions expired as of
    /// `now`, and purges tombstones that every non-stale tracked client has
    /// pulled past. `now` and the staleness cutoff derived from it use
    /// [`clients::default_stale_window`]; clients unseen for longer than
    /// that window are excluded from the safe purge version and reported
    /// in [`GcResult::stale_clients`]. This never compacts non-tombstone
    /// log entries - see [`SyncEngine::compact`] for that opt-in operation.
    pub fn gc(&self, now: &str) -> Result<GcResult> {
        let subscriptions_expired = subscriptions::delete_expired(&self.conn, now)?;
        let stale_before = clients::stale_cutoff(now, clients::default_stale_window())?;
        let tombstones_purged = tombstones::purge(&self.conn, &stale_before)?;
        let stale_clients = clients::stale_clients(&self.conn, &stale_before)?;
        Ok(GcResult {
            tombstones_purged,
            subscriptions_expired,
            stale_clients,
        })
    }

    /// Full-log compaction (§4.8): deletes every change-log entry, including
    /// tombstones, that every non-stale tracked client has pulled past. An
    /// opt-in power operation - a client unseen since before `now` minus the
    /// staleness window, or one that hasn't pulled past a compacted range,
    /// loses the ability to learn about deletes in that range short of a
    /// full resync. Not run automatically by [`SyncEngine::gc`].
    pub fn compact(&self, now: &str) -> Result<usize> {
        let stale_before = clients::stale_cutoff(now, clients::default_stale_window())?;
        tombstones::compact(&self.conn, &stale_before)
    }

    /// A cloneable, `Send`-able handle that can interrupt an in-flight
    /// `pull`/`push` from another thread.
    pub fn interrupt_handle(&self) -> Arc<SqlInterruptHandle> {
        self.interrupt_handle.clone()
    }

    /// Direct access to the underlying connection, for callers that need to
    /// run their own DML against tracked tables within the same connection
    /// (e.g. inside a transaction alongside app-level writes).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
