//! Shared fixtures for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;`.

#![allow(dead_code)]

pub use ovsdb_client::*;
use serde_json::json;
use std::fs;
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Logging
// ============================================================================

static INIT_LOGGING: Once = Once::new();

/// Route `tracing` output through the test harness
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

// ============================================================================
// Schema
// ============================================================================

/// Connection string used by every fixture
pub const CONNECTION: &str = "unix:/run/openvswitch/db.sock";

/// A trimmed `Open_vSwitch` schema covering every resolver strategy
pub fn schema_json() -> serde_json::Value {
    let refs = |table: &str| json!({"key": {"type": "uuid", "refTable": table}, "min": 0, "max": "unlimited"});
    let optional_ref = |table: &str| json!({"key": {"type": "uuid", "refTable": table}, "min": 0, "max": 1});
    let string_map = json!({"key": "string", "value": "string", "min": 0, "max": "unlimited"});
    json!({
        "name": "Open_vSwitch",
        "version": "8.3.0",
        "tables": {
            "Open_vSwitch": {
                "columns": {
                    "bridges": {"type": refs("Bridge")},
                    "ssl": {"type": optional_ref("SSL")},
                    "external_ids": {"type": string_map}
                },
                "isRoot": true,
                "maxRows": 1
            },
            "Bridge": {
                "columns": {
                    "name": {"type": "string"},
                    "ports": {"type": refs("Port")},
                    "controller": {"type": refs("Controller")},
                    "netflow": {"type": optional_ref("NetFlow")},
                    "fail_mode": {"type": {"key": "string", "min": 0, "max": 1}},
                    "external_ids": {"type": string_map}
                },
                "indexes": [["name"]],
                "isRoot": true
            },
            "Port": {
                "columns": {
                    "name": {"type": "string"},
                    "qos": {"type": optional_ref("QoS")},
                    "tag": {"type": {"key": "integer", "min": 0, "max": 1}}
                },
                "indexes": [["name"]]
            },
            "Controller": {
                "columns": {
                    "target": {"type": "string"}
                }
            },
            "NetFlow": {
                "columns": {
                    "targets": {"type": {"key": "string", "min": 1, "max": "unlimited"}},
                    "active_timeout": {"type": "integer"}
                }
            },
            "QoS": {
                "columns": {
                    "type": {"type": "string"},
                    "queues": {"type": {"key": "integer", "value": {"type": "uuid", "refTable": "Queue"}, "min": 0, "max": "unlimited"}}
                },
                "isRoot": true
            },
            "Queue": {
                "columns": {
                    "dscp": {"type": {"key": "integer", "min": 0, "max": 1}}
                },
                "isRoot": true
            },
            "SSL": {
                "columns": {
                    "private_key": {"type": "string"},
                    "certificate": {"type": "string"},
                    "ca_cert": {"type": "string"}
                }
            }
        }
    })
}

// ============================================================================
// Mirror fixtures
// ============================================================================

/// Mirror connected through a schema file in a temporary directory
pub struct TestMirror {
    pub idl: Arc<MemoryIdl>,
    pub dir: TempDir,
}

impl TestMirror {
    /// Write the fixture schema and connect to it
    pub fn new() -> Self {
        init_logging();
        let dir = TempDir::new().expect("temp dir");
        let source = FileSchemaSource::new(dir.path());
        fs::write(source.path_for("Open_vSwitch"), schema_json().to_string()).expect("write schema");
        let idl = MemoryIdl::connect(CONNECTION, &source, "Open_vSwitch").expect("connect");
        Self {
            idl: Arc::new(idl),
            dir,
        }
    }

    /// A started connection over this mirror
    pub fn connection(&self, config: ConnectionConfig) -> Connection<MemoryIdl> {
        let conn = Connection::new(Arc::clone(&self.idl), config).expect("connection");
        conn.start().expect("start");
        conn
    }
}

/// Strict config with short timings
pub fn strict_config() -> ConnectionConfig {
    ConnectionConfig {
        timeout_ms: 5_000,
        poll_interval_ms: 5,
        check_error: true,
        log_errors: true,
    }
}

/// Commit on `conn`, expecting results
pub fn commit_ok(conn: &Connection<MemoryIdl>, build: impl FnOnce(&mut Transaction)) -> Vec<CommandResult> {
    let mut txn = conn.transaction();
    build(&mut txn);
    txn.commit().expect("commit").expect("results")
}

/// Populate the standard topology:
/// one root row with SSL, bridge `br0` with port `p0`, a controller,
/// a NetFlow and a QoS on the port
pub fn populate(conn: &Connection<MemoryIdl>) {
    let ssl = DbCreate::new("SSL")
        .column("private_key", "/etc/ssl/key.pem")
        .column("certificate", "/etc/ssl/cert.pem")
        .column("ca_cert", "/etc/ssl/ca.pem");
    let ssl_ref = ssl.row_ref();
    let qos = DbCreate::new("QoS").column("type", "linux-htb");
    let qos_ref = qos.row_ref();
    let port = DbCreate::new("Port").column("name", "p0").column("qos", &qos_ref);
    let port_ref = port.row_ref();
    let controller = DbCreate::new("Controller").column("target", "tcp:10.0.0.1:6653");
    let controller_ref = controller.row_ref();
    let netflow = DbCreate::new("NetFlow")
        .column("targets", "10.0.0.2:2055")
        .column("active_timeout", 60i64);
    let netflow_ref = netflow.row_ref();
    let bridge = DbCreate::new("Bridge")
        .column("name", "br0")
        .column("ports", &port_ref)
        .column("controller", &controller_ref)
        .column("netflow", &netflow_ref);
    let bridge_ref = bridge.row_ref();
    let root = DbCreate::new("Open_vSwitch")
        .column("bridges", &bridge_ref)
        .column("ssl", &ssl_ref);

    commit_ok(conn, |txn| {
        txn.add(ssl)
            .add(qos)
            .add(port)
            .add(controller)
            .add(netflow)
            .add(bridge)
            .add(root);
    });
}

/// Generous wait for asynchronous notifications
pub const SETTLE: Duration = Duration::from_secs(5);
