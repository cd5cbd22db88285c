/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! End-to-end scenarios driven through the public `SyncEngine` facade,
//! exercising capture, apply, conflict resolution, and retention together
//! rather than one module at a time.

use sync_engine::{Operation, SubscriptionType, SyncEngine, SyncLogEntry};
use sync_guid::Guid;

fn engine_with_person_table() -> SyncEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let engine = SyncEngine::initialize_in_memory(None).unwrap();
    engine
        .connection()
        .execute_batch(
            "CREATE TABLE Person(Id TEXT PRIMARY KEY, Name TEXT, Email TEXT);",
        )
        .unwrap();
    engine.track_table("Person").unwrap();
    engine
}

#[test]
fn local_insert_is_captured() {
    let engine = engine_with_person_table();
    engine
        .connection()
        .execute(
            "INSERT INTO Person(Id, Name, Email) VALUES ('p1', 'Alice', 'alice@x')",
            [],
        )
        .unwrap();

    let result = engine.pull(0, 10).unwrap();
    assert_eq!(result.entries.len(), 1);
    let entry = &result.entries[0];
    assert_eq!(entry.table_name, "Person");
    assert_eq!(entry.operation, Operation::Insert);
    assert_eq!(entry.pk_value, serde_json::json!({"Id": "p1"}));
    assert_eq!(
        entry.payload,
        Some(serde_json::json!({"Id": "p1", "Name": "Alice", "Email": "alice@x"}))
    );
    assert_eq!(entry.origin, engine.origin().unwrap());
    assert!(!result.full_resync_required);
}

#[test]
fn applying_a_remote_entry_does_not_echo_back_into_the_log() {
    let peer_b = engine_with_person_table();
    let remote_entry = SyncLogEntry {
        version: 1,
        table_name: "Person".into(),
        pk_value: serde_json::json!({"Id": "p1"}),
        operation: Operation::Insert,
        payload: Some(serde_json::json!({"Id": "p1", "Name": "Alice", "Email": "alice@x"})),
        origin: Guid::from("replica-a"),
        timestamp: "2026-01-01T00:00:00.000Z".into(),
    };

    let push_result = peer_b.push(&[remote_entry], None).unwrap();
    assert_eq!(push_result.applied, 1);

    let name: String = peer_b
        .connection()
        .query_row("SELECT Name FROM Person WHERE Id = 'p1'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(name, "Alice");

    let local_log = peer_b.pull(0, 10).unwrap();
    assert!(local_log.entries.is_empty());
}

#[test]
fn delete_propagates_as_a_tombstone() {
    let replica_a = engine_with_person_table();
    replica_a
        .connection()
        .execute(
            "INSERT INTO Person(Id, Name, Email) VALUES ('p1', 'Alice', 'alice@x')",
            [],
        )
        .unwrap();

    let replica_b = engine_with_person_table();
    let initial = replica_a.pull(0, 10).unwrap();
    replica_b.push(&initial.entries, None).unwrap();

    replica_a
        .connection()
        .execute("DELETE FROM Person WHERE Id = 'p1'", [])
        .unwrap();
    let tombstone_batch = replica_a.pull(initial.next_version, 10).unwrap();
    assert_eq!(tombstone_batch.entries.len(), 1);
    assert_eq!(tombstone_batch.entries[0].operation, Operation::Delete);

    let push_result = replica_b.push(&tombstone_batch.entries, None).unwrap();
    assert_eq!(push_result.applied, 1);

    let count: i64 = replica_b
        .connection()
        .query_row("SELECT COUNT(*) FROM Person", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn version_aware_push_rejects_a_stale_write() {
    let engine = SyncEngine::initialize_in_memory(None).unwrap();
    engine
        .connection()
        .execute_batch(
            "CREATE TABLE Practitioner(Id TEXT PRIMARY KEY, Name TEXT, Version INTEGER);",
        )
        .unwrap();
    engine.track_table("Practitioner").unwrap();
    engine
        .connection()
        .execute(
            "INSERT INTO Practitioner(Id, Name, Version) VALUES ('pr', 'John', 5)",
            [],
        )
        .unwrap();

    let stale_entry = SyncLogEntry {
        version: 1,
        table_name: "Practitioner".into(),
        pk_value: serde_json::json!({"Id": "pr"}),
        operation: Operation::Update,
        payload: Some(serde_json::json!({"Id": "pr", "Name": "Jane", "Version": 3})),
        origin: Guid::from("replica-b"),
        timestamp: "2026-01-01T00:00:00.000Z".into(),
    };

    let push_result = engine.push(&[stale_entry], Some("Version")).unwrap();
    assert_eq!(push_result.applied, 0);
    assert_eq!(push_result.skipped_stale, 1);

    let (name, version): (String, i64) = engine
        .connection()
        .query_row(
            "SELECT Name, Version FROM Practitioner WHERE Id = 'pr'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(name, "John");
    assert_eq!(version, 5);
}

#[test]
fn pull_past_the_retention_window_requires_a_full_resync() {
    let engine = engine_with_person_table();
    for i in 0..150 {
        engine
            .connection()
            .execute(
                "INSERT INTO Person(Id, Name, Email) VALUES (?, 'x', 'x@x')",
                [format!("p{i}")],
            )
            .unwrap();
    }

    // One client has fully caught up; compacting (the opt-in full-log
    // operation, since these are plain inserts with no tombstones for the
    // mandatory gc to purge) is then free to drop everything at or below
    // its cursor, leaving a retained window that starts well past version 1.
    let caught_up_client = Guid::from("caught-up");
    engine.register_client(&caught_up_client).unwrap();
    let latest = engine.pull(0, 1000).unwrap().next_version;
    engine.advance_client(&caught_up_client, latest).unwrap();
    let purged = engine.compact("2026-01-01T00:00:00.000Z").unwrap();
    assert!(purged > 0);

    // A peer stuck at an old cursor has missed entries gc already
    // dropped, so it must perform a full resync rather than an
    // incremental pull.
    let stale_result = engine.pull(3, 10).unwrap();
    assert!(stale_result.full_resync_required);
}

#[test]
fn gc_purges_tombstones_expires_subscriptions_and_excludes_stale_clients() {
    let engine = engine_with_person_table();
    engine
        .connection()
        .execute(
            "INSERT INTO Person(Id, Name, Email) VALUES ('p1', 'Alice', 'alice@x')",
            [],
        )
        .unwrap();
    engine
        .connection()
        .execute("DELETE FROM Person WHERE Id = 'p1'", [])
        .unwrap();
    let latest = engine.pull(0, 10).unwrap().next_version;

    let caught_up = Guid::from("caught-up");
    engine.register_client(&caught_up).unwrap();
    engine.advance_client(&caught_up, latest).unwrap();

    // A client that hasn't been heard from in years must not pin the safe
    // purge version at its stale cursor.
    let ghost = Guid::from("ghost");
    engine.register_client(&ghost).unwrap();
    engine
        .connection()
        .execute(
            "UPDATE _sync_clients SET last_sync_timestamp = '2000-01-01T00:00:00.000Z' WHERE origin_id = 'ghost'",
            [],
        )
        .unwrap();

    let origin = Guid::from("some-peer");
    engine
        .subscribe(&origin, SubscriptionType::Table, Some("Person"), None, Some("2020-01-01T00:00:00.000Z"))
        .unwrap();

    let result = engine.gc("2026-01-01T00:00:00.000Z").unwrap();
    assert_eq!(result.tombstones_purged, 1);
    assert_eq!(result.subscriptions_expired, 1);
    assert_eq!(result.stale_clients.len(), 1);
    assert_eq!(result.stale_clients[0].origin_id, ghost);
}
