//! The command contract
//!
//! A [`Command`] is one unit of work inside a transaction. The orchestrator
//! applies every command of a transaction, in order, to a fresh transaction
//! handle on each commit attempt, so `run_idl` must be safe to call more
//! than once. After a successful commit each command gets a chance to read
//! back server-assigned state before its [`result`](Command::result) is
//! collected.

use ovsdb_core::{Result, TxnHandle, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Column name to value, always including `_uuid`
pub type RowView = BTreeMap<String, Value>;

/// What a command reports once its transaction finishes
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CommandResult {
    /// Nothing to report
    #[default]
    None,
    /// Identity of a row (e.g. a created row)
    Uuid(Uuid),
    /// A single column value
    Value(Value),
    /// One row
    Row(RowView),
    /// Several rows
    Rows(Vec<RowView>),
}

impl CommandResult {
    /// The uuid, if this result is one
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            CommandResult::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// The value, if this result is one
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            CommandResult::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The rows, if this result holds any
    pub fn as_rows(&self) -> Option<&[RowView]> {
        match self {
            CommandResult::Rows(rows) => Some(rows),
            CommandResult::Row(row) => Some(std::slice::from_ref(row)),
            _ => None,
        }
    }
}

/// A unit of work applied inside a transaction
///
/// The `Debug` rendering names the command in logs and timeout errors.
pub trait Command: Send + fmt::Debug {
    /// Stage this command's reads and writes on `txn`
    fn run_idl(&mut self, txn: &mut dyn TxnHandle) -> Result<()>;

    /// Called after a successful commit, with the committed handle
    fn post_commit(&mut self, _txn: &dyn TxnHandle) {}

    /// Result reported to the caller of `commit`
    fn result(&self) -> CommandResult;
}

/// Hooks around each commit attempt
///
/// The default implementation does nothing before the commands run and calls
/// every command's `post_commit` after a successful commit.
pub trait CommitHooks: Send {
    /// Called on each fresh handle before any command runs
    fn pre_commit(&mut self, _txn: &mut dyn TxnHandle) -> Result<()> {
        Ok(())
    }

    /// Called once after a successful commit
    fn post_commit(&mut self, txn: &dyn TxnHandle, commands: &mut [Box<dyn Command>]) {
        for command in commands {
            command.post_commit(txn);
        }
    }
}

/// The default hooks
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl CommitHooks for DefaultHooks {}
