//! In-memory mirrored OVSDB database
//!
//! This crate provides the reference backend behind the transaction layer:
//! - [`MemoryIdl`]: the committed database image, change counter and event
//!   routing
//! - [`IdlTransaction`]: a commit attempt with read-your-writes semantics
//! - [`validation`]: first-committer-wins conflict and schema checks
//! - [`SchemaSource`]: where schemas come from
//! - [`wait_for_change`]: blocking on the change counter

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod idl;
pub mod schema_source;
pub mod txn;
pub mod validation;
pub mod wait;

pub use idl::{Fault, MemoryIdl};
pub use schema_source::{validate_connection, FileSchemaSource, SchemaSource, StaticSchemaSource, CONNECTION_METHODS};
pub use txn::IdlTransaction;
pub use validation::{validate_row, validate_touched, ConflictType, RowKey, ValidationResult};
pub use wait::wait_for_change;
