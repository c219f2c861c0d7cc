//! OVSDB client transaction layer
//!
//! Queue commands on a transaction, commit them through a connection's
//! worker thread and get typed results back. Transient conflicts are
//! retried until the transaction's timeout.
//!
//! # Quick Start
//!
//! ```ignore
//! use ovsdb_client::{Connection, ConnectionConfig, DbCreate, MemoryIdl, FileSchemaSource};
//! use std::sync::Arc;
//!
//! let source = FileSchemaSource::new("/usr/share/openvswitch");
//! let idl = Arc::new(MemoryIdl::connect("unix:/var/run/openvswitch/db.sock", &source, "Open_vSwitch")?);
//! let conn = Connection::new(idl, ConnectionConfig::default())?;
//! conn.start()?;
//!
//! let mut txn = conn.transaction();
//! txn.add(DbCreate::new("Bridge").column("name", "br0"));
//! let results = txn.commit()?;
//! ```
//!
//! # Architecture
//!
//! - `ovsdb-core`: values, schemas, rows, errors and the mirror traits
//! - `ovsdb-lookup`: conditions, record resolution and row events
//! - `ovsdb-storage`: the in-memory mirror and its commit validation
//! - `ovsdb-concurrency`: transactions, the retry loop and connections
//! - `ovsdb-executor`: the generic database commands

pub use ovsdb_concurrency::*;
pub use ovsdb_core::*;
pub use ovsdb_executor::*;
pub use ovsdb_lookup::*;
pub use ovsdb_storage::*;
