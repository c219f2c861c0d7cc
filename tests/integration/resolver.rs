//! Record resolution against a populated mirror

use crate::common::*;

fn mirror() -> (TestMirror, Connection<MemoryIdl>) {
    let mirror = TestMirror::new();
    let conn = mirror.connection(strict_config());
    populate(&conn);
    (mirror, conn)
}

fn column_of(idl: &MemoryIdl, table: &str, record: &str, column: &str) -> Result<Value> {
    idl.read(|db| {
        let row = resolve(db, table, &Record::from(record))?;
        get_column_value(row, column)
    })
}

// ============================================================================
// Back-references through a named row
// ============================================================================

#[test]
fn test_controller_by_bridge_name() {
    let (mirror, _conn) = mirror();
    assert_eq!(
        column_of(&mirror.idl, "Controller", "br0", "target").unwrap(),
        Value::from("tcp:10.0.0.1:6653")
    );
}

#[test]
fn test_qos_by_port_name() {
    let (mirror, _conn) = mirror();
    assert_eq!(
        column_of(&mirror.idl, "QoS", "p0", "type").unwrap(),
        Value::from("linux-htb")
    );
}

#[test]
fn test_netflow_updated_through_bridge_name() {
    let (mirror, conn) = mirror();
    commit_ok(&conn, |txn| {
        txn.add(DbSet::new("NetFlow", "br0").column("active_timeout", 30i64));
    });
    assert_eq!(
        column_of(&mirror.idl, "NetFlow", "br0", "active_timeout").unwrap(),
        Value::from(30i64)
    );
}

#[test]
fn test_unknown_bridge_names_the_searched_table() {
    let (mirror, _conn) = mirror();
    match column_of(&mirror.idl, "Controller", "br9", "target") {
        Err(Error::RowNotFound { table, column, value }) => {
            assert_eq!(table, "Bridge");
            assert_eq!(column, "name");
            assert_eq!(value, "br9");
        }
        other => panic!("expected RowNotFound, got {:?}", other),
    }
}

#[test]
fn test_second_controller_makes_back_reference_ambiguous() {
    let (mirror, conn) = mirror();
    let controller = DbCreate::new("Controller").column("target", "tcp:10.0.0.9:6653");
    let controller_ref = controller.row_ref();
    commit_ok(&conn, |txn| {
        txn.add(controller)
            .add(DbAdd::new("Bridge", "br0", "controller", controller_ref));
    });
    let err = column_of(&mirror.idl, "Controller", "br0", "target").unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Controller"));
}

// ============================================================================
// Singletons
// ============================================================================

#[test]
fn test_open_vswitch_resolves_any_name() {
    let (mirror, _conn) = mirror();
    let bridges = column_of(&mirror.idl, "Open_vSwitch", "whatever", "bridges").unwrap();
    match bridges {
        Value::List(items) => assert_eq!(items.len(), 1),
        other => panic!("expected a list, got {:?}", other),
    }
}

#[test]
fn test_ssl_through_root_row() {
    let (mirror, _conn) = mirror();
    assert_eq!(
        column_of(&mirror.idl, "SSL", "ignored", "ca_cert").unwrap(),
        Value::from("/etc/ssl/ca.pem")
    );
}

#[test]
fn test_singleton_on_empty_table() {
    let mirror = TestMirror::new();
    let err = column_of(&mirror.idl, "Open_vSwitch", ".", "bridges").unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Uuids
// ============================================================================

#[test]
fn test_queue_only_by_uuid() {
    let (mirror, conn) = mirror();
    let results = commit_ok(&conn, |txn| {
        txn.add(DbCreate::new("Queue").column("dscp", 8i64));
    });
    let uuid = results[0].as_uuid().unwrap();

    let err = column_of(&mirror.idl, "Queue", "q0", "dscp").unwrap_err();
    assert!(matches!(err, Error::UuidOnlyTable { ref table } if table == "Queue"));

    assert_eq!(
        column_of(&mirror.idl, "Queue", &uuid.to_string(), "dscp").unwrap(),
        Value::from(8i64)
    );
}

#[test]
fn test_missing_uuid_string() {
    let (mirror, _conn) = mirror();
    let missing = uuid::Uuid::new_v4().to_string();
    match column_of(&mirror.idl, "Bridge", &missing, "name") {
        Err(Error::RowNotFound { column, .. }) => assert_eq!(column, "uuid"),
        other => panic!("expected RowNotFound, got {:?}", other),
    }
}

#[test]
fn test_custom_lookup_table() {
    let (mirror, conn) = mirror();
    let resolver = Resolver::new(LookupTable::new().with("Port", RowLookup::uuid_only()));
    let mut txn = conn.transaction();
    txn.add(DbGet::new("Port", "p0", "name").with_resolver(resolver));
    let err = txn.commit().unwrap_err();
    assert!(matches!(err, Error::UuidOnlyTable { .. }));
    assert_eq!(column_of(&mirror.idl, "Port", "p0", "name").unwrap(), Value::from("p0"));
}
