//! Transaction orchestration for the OVSDB client layer
//!
//! This crate drives queued commands through commit attempts against a
//! mirror:
//! - [`Command`]: the unit of work contract
//! - [`Transaction`]: ordered commands, the retry loop and its timeout
//! - [`status`]: the commit status to action table
//! - [`ResultSlot`]: single-use handoff of a transaction outcome
//! - [`Connection`]: the worker thread that serializes commits
//! - [`ConnectionConfig`]: TOML configuration of timeouts and error policy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod config;
pub mod connection;
pub mod slot;
pub mod status;
pub mod transaction;

pub use command::{Command, CommandResult, CommitHooks, DefaultHooks, RowView};
pub use config::{ConnectionConfig, TransactionOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
pub use connection::Connection;
pub use slot::ResultSlot;
pub use status::{action_for, Outcome, StatusAction, NOT_LOCKED_MESSAGE, STATUS_ACTIONS};
pub use transaction::{CommitResult, Transaction};
