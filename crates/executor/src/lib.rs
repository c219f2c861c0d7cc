//! # OVSDB Executor
//!
//! Generic, schema-agnostic commands for OVSDB transactions.
//!
//! Each command implements [`Command`](ovsdb_concurrency::Command) and can be
//! added to any [`Transaction`](ovsdb_concurrency::Transaction):
//!
//! ```text
//! let mut txn = conn.transaction();
//! let port = DbCreate::new("Port").column("name", "p0");
//! let port_ref = port.row_ref();
//! txn.add(port)
//!    .add(DbAdd::new("Bridge", "br0", "ports", port_ref));
//! let results = txn.commit()?;
//! ```
//!
//! Rows are addressed by [`Target`]: a uuid, a name resolved through the
//! record resolver, or a [`RowRef`] to a row created earlier in the same
//! transaction.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commands;
pub mod target;

#[cfg(test)]
mod tests;

pub use commands::{row_view, DbAdd, DbClear, DbCreate, DbDestroy, DbFind, DbGet, DbList, DbSet};
pub use target::{ColumnValue, RowRef, Target};
