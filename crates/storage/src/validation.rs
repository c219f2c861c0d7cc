//! Commit-time validation
//!
//! Two checks run before a staged transaction is installed:
//!
//! - **Conflicts** (first committer wins): every row the transaction wrote or
//!   deleted must still exist in the mirror at the version the transaction
//!   saw. A conflict makes the attempt retryable.
//! - **Schema**: every written row must satisfy its column types. A
//!   violation fails the transaction.
//!
//! Rows the transaction inserted itself are never in conflict.

use ovsdb_core::{Database, Row};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identity of a row across tables
pub type RowKey = (String, Uuid);

/// Why a touched row is no longer valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// The row was committed again after the transaction read it
    RowChanged {
        /// Table of the row
        table: String,
        /// Row identity
        uuid: Uuid,
        /// Version the transaction saw
        read_version: u64,
        /// Version now in the mirror
        current_version: u64,
    },
    /// The row was deleted after the transaction read it
    RowDeleted {
        /// Table of the row
        table: String,
        /// Row identity
        uuid: Uuid,
    },
}

/// Outcome of conflict validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// All conflicts found
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// No conflicts
    pub fn ok() -> Self {
        Self::default()
    }

    /// True when the transaction may commit
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Compare recorded row versions with the committed mirror
pub fn validate_touched(touched: &BTreeMap<RowKey, u64>, committed: &Database) -> ValidationResult {
    let mut result = ValidationResult::ok();
    for ((table, uuid), read_version) in touched {
        let current = committed.table(table).ok().and_then(|t| t.row(uuid));
        match current {
            None => result.conflicts.push(ConflictType::RowDeleted {
                table: table.clone(),
                uuid: *uuid,
            }),
            Some(row) if row.version() != *read_version => {
                result.conflicts.push(ConflictType::RowChanged {
                    table: table.clone(),
                    uuid: *uuid,
                    read_version: *read_version,
                    current_version: row.version(),
                })
            }
            Some(_) => {}
        }
    }
    result
}

/// Check every column of `row` against its type; returns the error text of
/// the first violation
pub fn validate_row(row: &Row) -> Option<String> {
    for (column, datum) in row.columns() {
        let ty = match row.schema().get_column(column) {
            Ok(c) => &c.ty,
            Err(e) => return Some(e.to_string()),
        };
        if let Err(e) = ty.check(datum) {
            return Some(format!(
                "{}.{} of row {}: {}",
                row.table_name(),
                column,
                row.uuid(),
                e
            ));
        }
    }
    None
}
