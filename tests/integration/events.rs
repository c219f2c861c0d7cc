//! Row notifications routed from commits to watched events

use crate::common::*;
use parking_lot::Mutex;
use std::sync::Arc;

struct Watched {
    mirror: TestMirror,
    conn: Connection<MemoryIdl>,
    handler: Arc<RowEventHandler>,
}

fn watched() -> Watched {
    let mirror = TestMirror::new();
    let handler = Arc::new(RowEventHandler::new().unwrap());
    mirror
        .idl
        .set_event_sink(Some(Arc::clone(&handler) as Arc<dyn RowEventSink>));
    let conn = mirror.connection(strict_config());
    Watched {
        mirror,
        conn,
        handler,
    }
}

fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(RowEventKind, &Row, Option<&Row>) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback = move |kind: RowEventKind, row: &Row, _old: Option<&Row>| {
        let name = get_column_value(row, "name")
            .map(|v| v.to_string())
            .unwrap_or_default();
        sink.lock().push(format!("{} {}", kind, name));
    };
    (seen, callback)
}

#[test]
fn test_create_event_filtered_by_condition() {
    let w = watched();
    let (seen, callback) = recorder();
    let event = ConditionalRowEvent::new("br1-created", &[RowEventKind::Create], "Bridge", callback)
        .with_conditions(vec![Condition::eq("name", "br1")]);
    assert!(w.handler.watch(Arc::new(event)));

    commit_ok(&w.conn, |txn| {
        txn.add(DbCreate::new("Bridge").column("name", "br1"))
            .add(DbCreate::new("Bridge").column("name", "br2"));
    });
    assert!(w.handler.wait_idle(SETTLE));

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with("create"));
    assert!(seen[0].contains("br1"));
}

#[test]
fn test_update_event_checks_old_image() {
    let w = watched();
    commit_ok(&w.conn, |txn| {
        txn.add(DbCreate::new("Bridge").column("name", "br0"));
    });

    let (seen, callback) = recorder();
    let event = ConditionalRowEvent::new("secured", &[RowEventKind::Update], "Bridge", callback)
        .with_conditions(vec![Condition::eq("fail_mode", "secure")])
        .with_old_conditions(vec![Condition::eq("fail_mode", Value::empty_list())]);
    w.handler.watch(Arc::new(event));

    commit_ok(&w.conn, |txn| {
        txn.add(DbSet::new("Bridge", "br0").column("fail_mode", "secure"));
    });
    // Already secure: the old image no longer matches
    commit_ok(&w.conn, |txn| {
        txn.add(DbSet::new("Bridge", "br0").column("fail_mode", "secure"));
        txn.add(DbAdd::new("Bridge", "br0", "external_ids", Value::map(vec![("k", "v")])));
    });
    assert!(w.handler.wait_idle(SETTLE));

    assert_eq!(seen.lock().len(), 1);
}

#[test]
fn test_one_time_event_unwatched_after_running() {
    let w = watched();
    commit_ok(&w.conn, |txn| {
        txn.add(DbCreate::new("Port").column("name", "p0"))
            .add(DbCreate::new("Port").column("name", "p1"));
    });

    let (seen, callback) = recorder();
    let event = ConditionalRowEvent::new("first-delete", &[RowEventKind::Delete], "Port", callback).once();
    w.handler.watch(Arc::new(event));
    assert_eq!(w.handler.watched_count(), 1);

    commit_ok(&w.conn, |txn| {
        txn.add(DbDestroy::new("Port", "p0"));
    });
    assert!(w.handler.wait_idle(SETTLE));
    commit_ok(&w.conn, |txn| {
        txn.add(DbDestroy::new("Port", "p1"));
    });
    assert!(w.handler.wait_idle(SETTLE));

    assert_eq!(seen.lock().len(), 1);
    assert_eq!(w.handler.watched_count(), 0);
    assert_eq!(w.mirror.idl.read(|db| db.table("Port").map(|t| t.len())).unwrap(), 0);
}

#[test]
fn test_failed_commit_notifies_nothing() {
    let w = watched();
    let (seen, callback) = recorder();
    w.handler.watch(Arc::new(ConditionalRowEvent::new(
        "any-bridge",
        &[RowEventKind::Create, RowEventKind::Update, RowEventKind::Delete],
        "Bridge",
        callback,
    )));

    w.mirror.idl.inject_fault(CommitStatus::Error, Some("constraint violation"));
    let mut txn = w.conn.transaction();
    txn.add(DbCreate::new("Bridge").column("name", "br0"));
    assert!(txn.commit().is_err());
    assert!(w.handler.wait_idle(SETTLE));

    assert!(seen.lock().is_empty());
}
