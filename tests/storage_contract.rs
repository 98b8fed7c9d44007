//! Storage contract conformance tests.
//!
//! Both backends must behave identically for inserts, equality selects,
//! projections, updates, deletes and sequences.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use tempfile::TempDir;
use test_case::test_case;
use vercat::Error;
use vercat::storage::schema::{DAG_EDGE_TABLE, ITEM_TABLE, NODE_VERSION_TABLE, TAG_TABLE};
use vercat::storage::value::{Field, Projection, Value};
use vercat::storage::{InMemoryStorage, SqliteStorage, StorageBackend};

#[derive(Debug, Clone, Copy)]
enum Backend {
    Memory,
    Sqlite,
}

fn open(backend: Backend, dir: &TempDir) -> Arc<dyn StorageBackend> {
    match backend {
        Backend::Memory => Arc::new(InMemoryStorage::new()),
        Backend::Sqlite => Arc::new(
            SqliteStorage::new(dir.path().join("contract.db")).expect("Failed to open SQLite"),
        ),
    }
}

fn dag_edge(item: i64, parent: i64, child: i64) -> Vec<Field> {
    vec![
        Field::new("item_id", item),
        Field::new("parent_id", parent),
        Field::new("child_id", child),
    ]
}

#[test_case(Backend::Memory; "memory")]
#[test_case(Backend::Sqlite; "sqlite")]
fn test_select_is_conjunctive_and_ordered(backend: Backend) {
    let dir = TempDir::new().unwrap();
    let storage = open(backend, &dir);
    storage.insert(DAG_EDGE_TABLE, &dag_edge(1, 10, 11)).unwrap();
    storage.insert(DAG_EDGE_TABLE, &dag_edge(2, 10, 11)).unwrap();
    storage.insert(DAG_EDGE_TABLE, &dag_edge(1, 10, 12)).unwrap();

    let mut rs = storage
        .equality_select(
            DAG_EDGE_TABLE,
            &Projection::columns(["child_id"]),
            &[Field::new("item_id", 1_i64), Field::new("parent_id", 10_i64)],
        )
        .unwrap();
    assert_eq!(rs.len(), 2);
    assert_eq!(rs.get_long("child_id").unwrap(), 11);
    assert!(rs.advance());
    assert_eq!(rs.get_long("child_id").unwrap(), 12);
    assert!(!rs.advance());
    assert!(rs.get_long("child_id").is_err());

    let row = &rs.rows()[0];
    assert!(row.get("item_id").is_none());
}

#[test_case(Backend::Memory; "memory")]
#[test_case(Backend::Sqlite; "sqlite")]
fn test_empty_result(backend: Backend) {
    let dir = TempDir::new().unwrap();
    let storage = open(backend, &dir);
    let rs = storage
        .equality_select(ITEM_TABLE, &Projection::All, &[Field::new("item_id", 1_i64)])
        .unwrap();
    assert!(rs.is_empty());
    assert!(rs.current().is_none());
    assert!(!storage.exists(ITEM_TABLE, &[]).unwrap());
}

#[test_case(Backend::Memory; "memory")]
#[test_case(Backend::Sqlite; "sqlite")]
fn test_null_and_typed_values(backend: Backend) {
    let dir = TempDir::new().unwrap();
    let storage = open(backend, &dir);
    storage
        .insert(
            NODE_VERSION_TABLE,
            &[
                Field::new("id", 1_i64),
                Field::new("node_id", 5_i64),
                Field::new("reference", Value::Null),
            ],
        )
        .unwrap();
    storage
        .insert(
            NODE_VERSION_TABLE,
            &[
                Field::new("id", 2_i64),
                Field::new("node_id", 5_i64),
                Field::new("reference", "git:abc"),
            ],
        )
        .unwrap();

    let rs = storage
        .equality_select(NODE_VERSION_TABLE, &Projection::All, &[Field::new("node_id", 5_i64)])
        .unwrap();
    let refs: Vec<Option<String>> = rs
        .rows()
        .iter()
        .map(|r| r.get_optional_string("reference").unwrap())
        .collect();
    assert_eq!(refs, vec![None, Some("git:abc".to_string())]);
    assert!(rs.get_string("node_id").is_err());
}

#[test_case(Backend::Memory; "memory")]
#[test_case(Backend::Sqlite; "sqlite")]
fn test_null_predicate_matches_null_columns(backend: Backend) {
    let dir = TempDir::new().unwrap();
    let storage = open(backend, &dir);
    storage
        .insert(
            NODE_VERSION_TABLE,
            &[
                Field::new("id", 1_i64),
                Field::new("node_id", 5_i64),
                Field::new("reference", Value::Null),
            ],
        )
        .unwrap();
    storage
        .insert(
            NODE_VERSION_TABLE,
            &[Field::new("id", 2_i64), Field::new("node_id", 5_i64)],
        )
        .unwrap();
    storage
        .insert(
            NODE_VERSION_TABLE,
            &[
                Field::new("id", 3_i64),
                Field::new("node_id", 5_i64),
                Field::new("reference", "git:abc"),
            ],
        )
        .unwrap();

    let rs = storage
        .equality_select(
            NODE_VERSION_TABLE,
            &Projection::columns(["id"]),
            &[Field::new("reference", Value::Null)],
        )
        .unwrap();
    let ids: Vec<i64> = rs.rows().iter().map(|r| r.get_long("id").unwrap()).collect();
    assert_eq!(ids, vec![1, 2]);

    let changed = storage
        .update(
            NODE_VERSION_TABLE,
            &[Field::new("reference", "git:def")],
            &[Field::new("reference", Value::Null), Field::new("id", 2_i64)],
        )
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(
        storage
            .delete(NODE_VERSION_TABLE, &[Field::new("reference", Value::Null)])
            .unwrap(),
        1
    );
}

#[test_case(Backend::Memory; "memory")]
#[test_case(Backend::Sqlite; "sqlite")]
fn test_update_and_delete_by_predicate(backend: Backend) {
    let dir = TempDir::new().unwrap();
    let storage = open(backend, &dir);
    for owner in [1_i64, 1, 2] {
        storage
            .insert(TAG_TABLE, &[Field::new("owner_id", owner), Field::new("key", "k")])
            .unwrap();
    }

    let changed = storage
        .update(
            TAG_TABLE,
            &[Field::new("value", "\"x\"")],
            &[Field::new("owner_id", 1_i64)],
        )
        .unwrap();
    assert_eq!(changed, 2);

    assert_eq!(storage.delete(TAG_TABLE, &[Field::new("owner_id", 1_i64)]).unwrap(), 2);
    assert_eq!(
        storage
            .equality_select(TAG_TABLE, &Projection::All, &[])
            .unwrap()
            .len(),
        1
    );
    assert_eq!(storage.delete(TAG_TABLE, &[Field::new("owner_id", 9_i64)]).unwrap(), 0);
}

#[test_case(Backend::Memory; "memory")]
#[test_case(Backend::Sqlite; "sqlite")]
fn test_schema_is_enforced(backend: Backend) {
    let dir = TempDir::new().unwrap();
    let storage = open(backend, &dir);

    let cases = [
        storage.insert("users", &[Field::new("id", 1_i64)]),
        storage.insert(ITEM_TABLE, &[Field::new("item_id", 1_i64)]),
        storage.insert(
            ITEM_TABLE,
            &[Field::new("item_id", "one"), Field::new("kind", "node")],
        ),
        storage
            .update(ITEM_TABLE, &[Field::new("kind", "edge")], &[])
            .map(|_| ()),
        storage.delete(ITEM_TABLE, &[]).map(|_| ()),
        storage
            .equality_select(ITEM_TABLE, &Projection::columns(["nope"]), &[])
            .map(|_| ()),
    ];
    for result in cases {
        assert!(matches!(result, Err(Error::InvalidInput(_))), "{result:?}");
    }
}

#[test_case(Backend::Memory; "memory")]
#[test_case(Backend::Sqlite; "sqlite")]
fn test_sequences(backend: Backend) {
    let dir = TempDir::new().unwrap();
    let storage = open(backend, &dir);
    assert_eq!(storage.next_sequence_value("ids").unwrap(), 1);
    assert_eq!(storage.next_sequence_value("ids").unwrap(), 2);
    assert_eq!(storage.next_sequence_value("other").unwrap(), 1);
}

#[test]
fn test_sqlite_sequence_is_durable() {
    let dir = TempDir::new().unwrap();
    {
        let storage = open(Backend::Sqlite, &dir);
        storage.next_sequence_value("ids").unwrap();
        storage.next_sequence_value("ids").unwrap();
    }
    let storage = open(Backend::Sqlite, &dir);
    assert_eq!(storage.next_sequence_value("ids").unwrap(), 3);
}
