//! Core types and traits for the OVSDB client layer
//!
//! This crate defines the foundational types used throughout the system:
//! - Atom / Datum / Value: stored and materialized column values
//! - Schema descriptors: DatabaseSchema, TableSchema, ColumnType
//! - Row / Table / Database: the mirrored data model
//! - Error: the public error vocabulary
//! - Traits: Idl, TxnHandle, RowEventSink

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod row;
pub mod schema;
pub mod traits;
pub mod value;

pub use error::{Error, Result};
pub use row::{Database, Row, Table};
pub use schema::{BaseType, ColumnSchema, ColumnType, DatabaseSchema, TableSchema, UUID_COLUMN};
pub use traits::{CommitStatus, Idl, RowEventKind, RowEventSink, TxnHandle};
pub use value::{Atom, AtomicType, Datum, Value};
