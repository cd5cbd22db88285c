/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! A small tool for poking at a sync-enabled database from the command
//! line: track tables, inspect the change log, and exercise pull/push/gc
//! without wiring up a real peer. Not part of the library's public
//! contract - see `sync-engine`'s own integration tests for that.

use clap::{Parser, Subcommand};
use sync_engine::SyncEngine;
use sync_core::timestamp::now_iso8601_ms;

#[derive(Parser)]
#[command(name = "sync-engine-cli", about = "Inspect and drive a sync-engine database")]
struct Cli {
    /// Path to the sqlite database (created if it doesn't exist).
    #[arg(short, long, value_name = "DATABASE", default_value = "./sync-engine.db")]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Install capture triggers on a table.
    Track { table: String },
    /// Stop capturing changes for a table.
    Untrack { table: String },
    /// Print entries captured after `since`.
    Pull {
        #[arg(long, default_value_t = 0)]
        since: i64,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Purge expired subscriptions and tombstones no tracked client still needs.
    Gc,
    /// Opt into full-log compaction: also purge non-tombstone entries.
    Compact,
    /// Print this replica's origin id.
    Origin,
    /// List known clients and their last-synced cursor.
    Clients,
}

fn init_logging() {
    env_logger::init_from_env(env_logger::Env::default().filter_or("RUST_LOG", "info"));
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let engine = SyncEngine::initialize(&cli.database, None)?;

    match cli.command {
        Command::Track { table } => {
            engine.track_table(&table)?;
            println!("tracking {table}");
        }
        Command::Untrack { table } => {
            engine.untrack_table(&table)?;
            println!("no longer tracking {table}");
        }
        Command::Pull { since, limit } => {
            let result = engine.pull(since, limit)?;
            if result.full_resync_required {
                println!("full resync required: cursor {since} is below retained history");
            }
            for entry in &result.entries {
                println!(
                    "v{} {:?} {} {} {}",
                    entry.version, entry.operation, entry.table_name, entry.pk_value, entry.origin
                );
            }
            println!("next_version={}", result.next_version);
        }
        Command::Gc => {
            let result = engine.gc(&now_iso8601_ms())?;
            println!(
                "purged {} tombstones, {} expired subscriptions, {} stale clients",
                result.tombstones_purged,
                result.subscriptions_expired,
                result.stale_clients.len()
            );
        }
        Command::Compact => {
            let purged = engine.compact(&now_iso8601_ms())?;
            println!("compacted {purged} change-log entries");
        }
        Command::Origin => {
            println!("{}", engine.origin()?);
        }
        Command::Clients => {
            for client in engine.clients()? {
                println!(
                    "{} last_sync_version={} last_sync_timestamp={}",
                    client.origin_id, client.last_sync_version, client.last_sync_timestamp
                );
            }
        }
    }

    Ok(())
}
