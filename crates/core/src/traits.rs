//! Core traits for the mirrored database
//!
//! This module defines the seams between the transaction layer and the
//! engine that keeps the local mirror in sync with the server:
//! - [`Idl`]: the mirror itself (open transaction handles, run the event loop,
//!   expose and wait on the change counter)
//! - [`TxnHandle`]: one in-flight commit attempt
//! - [`RowEventSink`]: receiver of row create/update/delete notifications
//!
//! Any engine implementing these traits can sit under the orchestrator; the
//! in-memory mirror in `ovsdb-storage` is the reference implementation.

use crate::error::Result;
use crate::row::{Database, Row};
use crate::value::Datum;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Terminal or retryable status of a commit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    /// Not yet committed
    Uncommitted,
    /// Commit sent, reply outstanding
    Incomplete,
    /// Transient failure; the same work should be retried
    TryAgain,
    /// The server rejected the transaction
    Error,
    /// A database lock is required but not held
    NotLocked,
    /// The transaction was abandoned before it reached the server
    Aborted,
    /// Nothing needed to change
    Unchanged,
    /// Committed
    Success,
}

impl fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitStatus::Uncommitted => "uncommitted",
            CommitStatus::Incomplete => "incomplete",
            CommitStatus::TryAgain => "try again",
            CommitStatus::Error => "error",
            CommitStatus::NotLocked => "not locked",
            CommitStatus::Aborted => "aborted",
            CommitStatus::Unchanged => "unchanged",
            CommitStatus::Success => "success",
        };
        f.write_str(name)
    }
}

/// One low-level commit attempt against the mirror
///
/// Reads through [`database`](TxnHandle::database) see the transaction's own
/// staged writes. Nothing reaches the mirror until
/// [`commit_block`](TxnHandle::commit_block).
pub trait TxnHandle {
    /// Database image including this handle's staged writes
    fn database(&self) -> &Database;

    /// Stage a new row; returns its temporary uuid
    fn insert(&mut self, table: &str) -> Result<Uuid>;

    /// Stage a column write
    fn set(&mut self, table: &str, row: &Uuid, column: &str, datum: Datum) -> Result<()>;

    /// Stage a row deletion
    fn delete(&mut self, table: &str, row: &Uuid) -> Result<()>;

    /// Abandon the attempt; a later commit reports [`CommitStatus::Aborted`]
    fn abort(&mut self);

    /// Block until the commit finishes and report its status
    fn commit_block(&mut self) -> CommitStatus;

    /// Error text reported with [`CommitStatus::Error`]
    fn error(&self) -> Option<String>;

    /// Permanent uuid assigned to a row this handle inserted
    fn real_uuid(&self, temp: &Uuid) -> Option<Uuid>;
}

/// The locally mirrored database
///
/// Thread safety: handles are opened from the connection's single execution
/// thread, but change-counter reads and waits may happen from any thread.
pub trait Idl: Send + Sync {
    /// Open a fresh transaction handle
    fn begin(&self) -> Box<dyn TxnHandle + '_>;

    /// Run the event loop once; returns true if the mirror changed
    fn run(&self) -> bool;

    /// Change counter; advances on every applied change
    fn change_seqno(&self) -> u64;

    /// Block until the change counter differs from `seqno` or `timeout`
    /// elapses; returns true if it changed
    fn wait(&self, seqno: u64, timeout: Duration) -> bool;
}

/// Kind of change a row event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowEventKind {
    /// Row inserted
    Create,
    /// Row modified
    Update,
    /// Row deleted
    Delete,
}

impl fmt::Display for RowEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RowEventKind::Create => "create",
            RowEventKind::Update => "update",
            RowEventKind::Delete => "delete",
        })
    }
}

/// Receiver of row change notifications from the mirror
pub trait RowEventSink: Send + Sync {
    /// Called once per changed row after the change is visible.
    /// `old` is the previous image for updates and deletes.
    fn notify(&self, kind: RowEventKind, row: &Row, old: Option<&Row>);
}
