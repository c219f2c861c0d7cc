//! Error types for the OVSDB client layer
//!
//! This module defines the public error vocabulary shared by every crate in
//! the workspace. We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! # Categories
//!
//! | Category | Variants | Propagation |
//! |----------|----------|-------------|
//! | Not Found | `RowNotFound` | Always; `if_exists` commands skip it |
//! | Timeout | `Timeout`, `CommitTimedOut`, `WaitTimeout` | Always |
//! | Transaction | `CommitFailed` | Only when the transaction checks errors |
//! | Usage | `NoSuchTable`, `NoSuchColumn`, `UuidOnlyTable`, `TypeMismatch`, `UnsupportedOperator`, `InvalidDatum` | Always |
//! | System | `SchemaRetrieval`, `Connection`, `Config`, `Command`, `Io` | Always |

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for OVSDB client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the OVSDB client layer
#[derive(Debug, Error)]
pub enum Error {
    // ==================== Not Found ====================
    /// No row satisfies the identifier used for a lookup
    #[error("Cannot find {table} with {column}={value}")]
    RowNotFound {
        /// Table that was searched
        table: String,
        /// Column that was compared (`uuid` for primary-key lookups)
        column: String,
        /// Rendered identifier that failed to match
        value: String,
    },

    // ==================== Timeout ====================
    /// `commit()` did not receive an outcome within the transaction timeout
    #[error("Commands {commands:?} exceeded timeout {secs} seconds", secs = .timeout.as_secs_f64())]
    Timeout {
        /// Rendering of every command queued in the transaction
        commands: Vec<String>,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// The retry loop crossed its deadline before a terminal status arrived
    #[error("OVS transaction timed out after {timeout:?}")]
    CommitTimedOut {
        /// Deadline charged to the retry loop
        timeout: Duration,
    },

    /// The mirrored state did not change before the wait deadline
    #[error("timed out after {timeout:?} waiting for a database change")]
    WaitTimeout {
        /// Deadline of the wait
        timeout: Duration,
    },

    // ==================== Transaction ====================
    /// The server reported a terminal commit failure
    #[error("{message}")]
    CommitFailed {
        /// Diagnostic text built from the commit status
        message: String,
    },

    // ==================== Usage ====================
    /// Table is not part of the database schema
    #[error("no such table: {0}")]
    NoSuchTable(String),

    /// Column is not part of the table schema
    #[error("table {table} has no column {column}")]
    NoSuchColumn {
        /// Table name
        table: String,
        /// Missing column name
        column: String,
    },

    /// Table can only be addressed by UUID
    #[error("Table {table} can only be queried by UUID")]
    UuidOnlyTable {
        /// Table name
        table: String,
    },

    /// Condition operand type does not match the column value type
    #[error("Column type and condition operand do not match: column {column} holds {expected}, operand is {actual}")]
    TypeMismatch {
        /// Column being compared
        column: String,
        /// Type of the materialized column value
        expected: String,
        /// Type of the condition operand
        actual: String,
    },

    /// Condition operator is not implemented
    #[error("unsupported condition operator: {op}")]
    UnsupportedOperator {
        /// The operator as written by the caller
        op: String,
    },

    /// A datum or value is malformed for its column
    #[error("invalid datum: {0}")]
    InvalidDatum(String),

    // ==================== System ====================
    /// Schema could not be fetched or parsed
    #[error("schema error: {0}")]
    SchemaRetrieval(String),

    /// Connection string could not be used
    #[error("{0}")]
    Connection(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// A command refused to apply itself
    #[error("{message}")]
    Command {
        /// Human-readable failure
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Build a `RowNotFound` error
    pub fn row_not_found(
        table: impl Into<String>,
        column: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Error::RowNotFound {
            table: table.into(),
            column: column.into(),
            value: value.to_string(),
        }
    }

    /// Build a `Command` error
    pub fn command(message: impl Into<String>) -> Self {
        Error::Command {
            message: message.into(),
        }
    }

    /// True when a lookup found no row
    ///
    /// Unknown tables and columns are usage errors, not misses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RowNotFound { .. })
    }

    /// True for any deadline that elapsed
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::CommitTimedOut { .. } | Error::WaitTimeout { .. }
        )
    }

    /// True for programming or configuration mistakes that are never coerced
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::NoSuchTable(_)
                | Error::NoSuchColumn { .. }
                | Error::UuidOnlyTable { .. }
                | Error::TypeMismatch { .. }
                | Error::UnsupportedOperator { .. }
                | Error::InvalidDatum(_)
        )
    }

    /// True for server-reported commit failures
    pub fn is_transaction_fatal(&self) -> bool {
        matches!(self, Error::CommitFailed { .. })
    }
}
