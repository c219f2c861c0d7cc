//! Mirror tests against a schema loaded from disk

use ovsdb_core::{CommitStatus, Datum, Error, Idl, TxnHandle};
use ovsdb_lookup::{resolve, Record};
use ovsdb_storage::{FileSchemaSource, MemoryIdl};
use std::fs;

const SCHEMA: &str = r#"{
    "name": "Open_vSwitch",
    "version": "8.3.0",
    "tables": {
        "Open_vSwitch": {
            "columns": {
                "bridges": {"type": {"key": {"type": "uuid", "refTable": "Bridge"}, "min": 0, "max": "unlimited"}}
            },
            "isRoot": true,
            "maxRows": 1
        },
        "Bridge": {
            "columns": {
                "name": {"type": "string"},
                "external_ids": {"type": {"key": "string", "value": "string", "min": 0, "max": "unlimited"}}
            },
            "indexes": [["name"]],
            "isRoot": true
        }
    }
}"#;

fn open() -> (tempfile::TempDir, MemoryIdl) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Open_vSwitch.ovsschema"), SCHEMA).unwrap();
    let source = FileSchemaSource::new(dir.path());
    let idl = MemoryIdl::connect("unix:/run/openvswitch/db.sock", &source, "Open_vSwitch").unwrap();
    (dir, idl)
}

#[test]
fn test_connect_reads_schema_file() {
    let (_dir, idl) = open();
    assert_eq!(idl.schema().version, "8.3.0");
    assert!(idl.schema().get_table("Bridge").is_ok());
}

#[test]
fn test_missing_schema_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileSchemaSource::new(dir.path());
    let err = MemoryIdl::connect("tcp:127.0.0.1:6640", &source, "Open_vSwitch").unwrap_err();
    assert!(matches!(err, Error::SchemaRetrieval(_)));
}

#[test]
fn test_bad_connection_string() {
    let (dir, _) = open();
    let source = FileSchemaSource::new(dir.path());
    let err = MemoryIdl::connect("bogus", &source, "Open_vSwitch").unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}

#[test]
fn test_committed_rows_resolve_by_name() {
    let (_dir, idl) = open();
    let mut txn = idl.begin();
    let temp = txn.insert("Bridge").unwrap();
    txn.set("Bridge", &temp, "name", Datum::scalar("br-int")).unwrap();
    txn.set("Bridge", &temp, "external_ids", Datum::map(vec![("owner", "test")]))
        .unwrap();
    // visible to the transaction before commit
    assert_eq!(
        resolve(txn.database(), "Bridge", &Record::from("br-int")).unwrap().uuid(),
        temp
    );
    assert_eq!(txn.commit_block(), CommitStatus::Success);
    let real = txn.real_uuid(&temp).unwrap();
    drop(txn);

    idl.read(|db| {
        let row = resolve(db, "Bridge", &Record::from("br-int")).unwrap();
        assert_eq!(row.uuid(), real);
    });
}
