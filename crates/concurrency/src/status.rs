//! Commit status policy
//!
//! What the orchestrator does with each status a handle can report is kept
//! here as a table rather than spread through the retry loop.

use crate::command::CommandResult;
use ovsdb_core::CommitStatus;

/// What the retry loop does after a commit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    /// Run the event loop once and start a new attempt
    Retry,
    /// Terminal failure with a diagnostic message
    Fail,
    /// Terminal, no error and no results
    Abandon,
    /// Collect command results, running post-commit hooks first if asked
    Finish {
        /// Run post-commit hooks before collecting results
        post_commit: bool,
    },
}

/// Status to action
pub const STATUS_ACTIONS: &[(CommitStatus, StatusAction)] = &[
    (CommitStatus::TryAgain, StatusAction::Retry),
    (CommitStatus::Error, StatusAction::Fail),
    (CommitStatus::NotLocked, StatusAction::Fail),
    (CommitStatus::Aborted, StatusAction::Abandon),
    (CommitStatus::Unchanged, StatusAction::Finish { post_commit: false }),
    (CommitStatus::Success, StatusAction::Finish { post_commit: true }),
];

/// Action for `status`; `None` for statuses the table does not know, which
/// the loop treats as finished without post-commit hooks
pub fn action_for(status: &CommitStatus) -> Option<StatusAction> {
    STATUS_ACTIONS
        .iter()
        .find(|(s, _)| s == status)
        .map(|(_, action)| *action)
}

/// Message reported when a required database lock is missing
pub const NOT_LOCKED_MESSAGE: &str = "The transaction failed because the IDL has been configured to \
require a database lock but didn't get it yet or has already lost it";

/// Result of one commit attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Results of every command, in submission order
    Committed(Vec<CommandResult>),
    /// Try again
    Retryable,
    /// Failed with this message
    Fatal(String),
    /// Abandoned without error
    Aborted,
}
