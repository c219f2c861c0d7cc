//! Connections committing against the in-memory mirror

use crate::common::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn bridge_count(idl: &MemoryIdl) -> usize {
    idl.read(|db| db.table("Bridge").map(|t| t.len())).unwrap()
}

// ============================================================================
// Serialized commits
// ============================================================================

#[test]
fn test_concurrent_submitters_all_commit() {
    let mirror = TestMirror::new();
    let conn = Arc::new(mirror.connection(strict_config()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let conn = Arc::clone(&conn);
            thread::spawn(move || {
                let results = commit_ok(&conn, |txn| {
                    txn.add(DbCreate::new("Bridge").column("name", format!("br{}", i)));
                });
                results[0].as_uuid().unwrap()
            })
        })
        .collect();
    let uuids: BTreeSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(uuids.len(), 8);
    assert_eq!(bridge_count(&mirror.idl), 8);
    for uuid in uuids {
        assert!(mirror.idl.read(|db| db.row("Bridge", &uuid).unwrap().is_some()));
    }
}

#[test]
fn test_results_follow_command_order() {
    let mirror = TestMirror::new();
    let conn = mirror.connection(strict_config());
    populate(&conn);

    let results = commit_ok(&conn, |txn| {
        txn.add(DbGet::new("Port", "p0", "name"))
            .add(DbSet::new("Bridge", "br0").column("fail_mode", "standalone"))
            .add(DbFind::new("Bridge", vec![Condition::eq("fail_mode", "standalone")]).columns(&["name"]));
    });

    assert_eq!(results[0].as_value(), Some(&Value::from("p0")));
    assert_eq!(results[1], CommandResult::None);
    let rows = results[2].as_rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], Value::from("br0"));
}

// ============================================================================
// Retries and failure policy
// ============================================================================

#[test]
fn test_try_again_is_retried() {
    let mirror = TestMirror::new();
    let conn = mirror.connection(strict_config());
    mirror.idl.inject_fault(CommitStatus::TryAgain, None);
    mirror.idl.inject_fault(CommitStatus::TryAgain, None);

    commit_ok(&conn, |txn| {
        txn.add(DbCreate::new("Bridge").column("name", "br0"));
    });

    assert_eq!(mirror.idl.pending_faults(), 0);
    assert_eq!(bridge_count(&mirror.idl), 1);
}

#[test]
fn test_error_status_in_strict_mode() {
    let mirror = TestMirror::new();
    let conn = mirror.connection(strict_config());
    mirror.idl.inject_fault(CommitStatus::Error, Some("referential integrity violation"));

    let mut txn = conn.transaction();
    txn.add(DbCreate::new("Bridge").column("name", "br0"));
    match txn.commit() {
        Err(Error::CommitFailed { message }) => {
            assert_eq!(message, "OVSDB Error: referential integrity violation");
        }
        other => panic!("expected CommitFailed, got {:?}", other),
    }
    assert_eq!(bridge_count(&mirror.idl), 0);
}

#[test]
fn test_error_status_swallowed_without_check_error() {
    let mirror = TestMirror::new();
    let conn = mirror.connection(ConnectionConfig {
        check_error: false,
        log_errors: false,
        ..strict_config()
    });
    mirror.idl.inject_fault(CommitStatus::Error, Some("boom"));

    let mut txn = conn.transaction();
    txn.add(DbCreate::new("Bridge").column("name", "br0"));
    assert!(txn.commit().unwrap().is_none());
}

#[test]
fn test_not_locked() {
    let mirror = TestMirror::new();
    let conn = mirror.connection(strict_config());
    mirror.idl.require_lock(true);

    let mut txn = conn.transaction();
    txn.add(DbCreate::new("Bridge").column("name", "br0"));
    let err = txn.commit().unwrap_err();
    assert!(err.to_string().contains(NOT_LOCKED_MESSAGE));

    mirror.idl.set_lock_held(true);
    commit_ok(&conn, |txn| {
        txn.add(DbCreate::new("Bridge").column("name", "br0"));
    });
}

#[test]
fn test_unchanged_commit_still_returns_results() {
    let mirror = TestMirror::new();
    let conn = mirror.connection(strict_config());
    populate(&conn);
    let seqno = mirror.idl.change_seqno();

    let results = commit_ok(&conn, |txn| {
        txn.add(DbSet::new("Port", "p0").column("name", "p0"));
    });

    assert_eq!(results, vec![CommandResult::None]);
    assert_eq!(mirror.idl.change_seqno(), seqno);
}

// ============================================================================
// Timeouts
// ============================================================================

#[test]
fn test_stopped_connection_times_out_naming_commands() {
    let mirror = TestMirror::new();
    let conn = Connection::new(Arc::clone(&mirror.idl), strict_config()).unwrap();
    assert!(!conn.is_running());

    let mut txn = conn.transaction_with(
        TransactionOptions::from(conn.config()).with_timeout(Duration::from_millis(50)),
    );
    txn.add(DbCreate::new("Bridge").column("name", "br0"));
    match txn.commit() {
        Err(Error::Timeout { commands, timeout }) => {
            assert_eq!(timeout, Duration::from_millis(50));
            assert_eq!(commands.len(), 1);
            assert!(commands[0].contains("DbCreate"));
        }
        other => panic!("expected Timeout, got {:?}", other),
    }
    assert_eq!(conn.queued(), 1);
}

#[test]
fn test_wait_for_committed_change() {
    let mirror = TestMirror::new();
    let conn = Arc::new(mirror.connection(strict_config()));
    let seqno = mirror.idl.change_seqno();

    let writer = {
        let conn = Arc::clone(&conn);
        thread::spawn(move || {
            commit_ok(&conn, |txn| {
                txn.add(DbCreate::new("Bridge").column("name", "br0"));
            });
        })
    };
    wait_for_change(mirror.idl.as_ref(), SETTLE, Some(seqno)).unwrap();
    writer.join().unwrap();
    assert!(mirror.idl.change_seqno() > seqno);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_connection_from_config_file() {
    let mirror = TestMirror::new();
    let path = mirror.dir.path().join("ovsdb.toml");
    std::fs::write(&path, "timeout_ms = 2000\npoll_interval_ms = 5\ncheck_error = true\n").unwrap();

    let config = ConnectionConfig::from_file(&path).unwrap();
    let conn = mirror.connection(config);
    let txn = conn.transaction();
    assert_eq!(txn.timeout(), Duration::from_secs(2));
    assert!(txn.check_error());
    assert!(txn.log_errors());
}

#[test]
fn test_invalid_config_rejected() {
    let mirror = TestMirror::new();
    let err = Connection::new(
        Arc::clone(&mirror.idl),
        ConnectionConfig {
            poll_interval_ms: 0,
            ..ConnectionConfig::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
