/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! End-to-end mapping scenarios, run through the public `apply_mapping`
//! entry point rather than the individual lexer/parser/builtin pieces.

use serde_json::json;
use sync_core::{Operation, SyncLogEntry};
use sync_mapping::{
    apply_mapping, ColumnMapping, MappingDirection, MappingOutcome, PkMapping, TableMapping,
    UnmappedTableBehavior,
};

fn user_to_customer_mapping() -> TableMapping {
    TableMapping {
        id: "user-to-customer".into(),
        source_table: "User".into(),
        target_table: "customer".into(),
        direction: MappingDirection::Push,
        enabled: true,
        pk_mapping: PkMapping {
            source_column: "Id".into(),
            target_column: "customer_id".into(),
        },
        column_mappings: vec![
            ColumnMapping::Rename {
                source: "FullName".into(),
                target: "name".into(),
            },
            ColumnMapping::Rename {
                source: "EmailAddress".into(),
                target: "email".into(),
            },
            ColumnMapping::Lql {
                target: "name_upper".into(),
                expr: "FullName |> upper()".into(),
            },
            ColumnMapping::Constant {
                target: "source".into(),
                value: json!("mobile-app"),
            },
            ColumnMapping::Lql {
                target: "registered_date".into(),
                expr: "CreatedAt |> dateFormat('yyyy-MM-dd')".into(),
            },
        ],
        excluded_columns: vec![],
        filter: None,
    }
}

#[test]
fn mapping_renames_computes_and_drops_sensitive_columns() {
    let entry = SyncLogEntry {
        version: 1,
        table_name: "User".into(),
        pk_value: json!({"Id": "u456"}),
        operation: Operation::Insert,
        payload: Some(json!({
            "Id": "u456",
            "FullName": "Bob Jones",
            "EmailAddress": "bob@x",
            "PasswordHash": "h",
            "SecurityStamp": "s",
            "CreatedAt": "2024-07-20T14:00:00Z",
        })),
        origin: "mobile-app".into(),
        timestamp: "2024-07-20T14:00:00.000Z".into(),
    };

    let outcome = apply_mapping(
        &entry,
        &[user_to_customer_mapping()],
        MappingDirection::Push,
        UnmappedTableBehavior::Strict,
    )
    .unwrap();

    let entries = match outcome {
        MappingOutcome::Success { entries } => entries,
        MappingOutcome::Skipped { reason } => panic!("expected a mapped entry, got skip: {reason}"),
    };
    assert_eq!(entries.len(), 1);
    let mapped = &entries[0];

    assert_eq!(mapped.target_table, "customer");
    // `target_pk_value` carries the bare value for `pk_mapping.target_column`
    // ("customer_id"); callers that need the `{"customer_id": ...}` shape
    // wrap it themselves using the mapping's own `pk_mapping`.
    assert_eq!(mapped.target_pk_value, json!("u456"));
    let payload = mapped.payload.as_ref().unwrap();
    assert_eq!(payload["name"], json!("Bob Jones"));
    assert_eq!(payload["email"], json!("bob@x"));
    assert_eq!(payload["name_upper"], json!("BOB JONES"));
    assert_eq!(payload["source"], json!("mobile-app"));
    assert_eq!(payload["registered_date"], json!("2024-07-20"));
    assert!(payload.get("PasswordHash").is_none());
    assert!(payload.get("SecurityStamp").is_none());
}
