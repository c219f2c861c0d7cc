//! Transaction orchestration
//!
//! A [`Transaction`] owns an ordered list of commands and turns them into a
//! single commit against the mirror, retrying transient failures until its
//! timeout. Commands run in insertion order; a later command may depend on
//! the in-memory effects of an earlier one within the same attempt.
//!
//! ## Lifecycle
//!
//! 1. Created by a [`Connection`](crate::Connection) (or detached with
//!    [`Transaction::new`])
//! 2. Commands appended with [`add`](Transaction::add)
//! 3. [`commit`](Transaction::commit) queues it and blocks for the outcome
//! 4. The connection worker runs [`do_commit`](Transaction::do_commit)
//!
//! ## Error policy
//!
//! `check_error` decides whether failures are returned as errors or
//! swallowed as `Ok(None)`. `log_errors` decides whether they are logged.
//! Timeouts waiting in `commit` are always errors.

use crate::command::{Command, CommandResult, CommitHooks, DefaultHooks};
use crate::connection::{QueuedTxn, TxnQueue};
use crate::slot::ResultSlot;
use crate::status::{action_for, Outcome, StatusAction, NOT_LOCKED_MESSAGE};
use ovsdb_core::{CommitStatus, Error, Idl, Result};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Results of a finished transaction, `None` when it produced none
pub type CommitResult = Result<Option<Vec<CommandResult>>>;

/// An ordered unit of work committed atomically
pub struct Transaction {
    commands: Vec<Box<dyn Command>>,
    timeout: Duration,
    check_error: bool,
    log_errors: bool,
    hooks: Box<dyn CommitHooks>,
    start_time: Option<Instant>,
    queue: Option<Arc<TxnQueue>>,
}

impl Transaction {
    /// A transaction not attached to any connection
    ///
    /// It can be driven directly with [`do_commit`](Self::do_commit);
    /// [`commit`](Self::commit) on it always times out.
    pub fn new(timeout: Duration) -> Self {
        Self {
            commands: Vec::new(),
            timeout,
            check_error: false,
            log_errors: true,
            hooks: Box::new(DefaultHooks),
            start_time: None,
            queue: None,
        }
    }

    pub(crate) fn attached(queue: Arc<TxnQueue>, timeout: Duration, check_error: bool, log_errors: bool) -> Self {
        Self {
            queue: Some(queue),
            check_error,
            log_errors,
            ..Self::new(timeout)
        }
    }

    /// Return failures as errors instead of `Ok(None)`
    pub fn with_check_error(mut self, check_error: bool) -> Self {
        self.check_error = check_error;
        self
    }

    /// Log failures
    pub fn with_log_errors(mut self, log_errors: bool) -> Self {
        self.log_errors = log_errors;
        self
    }

    /// Replace the pre/post-commit hooks
    pub fn with_hooks(mut self, hooks: Box<dyn CommitHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Append a command; returns `self` for chaining
    ///
    /// Commands run in the order they were added. After a successful
    /// commit, the result of each command sits at the same position in the
    /// list returned by [`commit`](Self::commit), so read results by index.
    pub fn add<C: Command + 'static>(&mut self, command: C) -> &mut Self {
        self.commands.push(Box::new(command));
        self
    }

    /// Queued commands in commit order
    pub fn commands(&self) -> &[Box<dyn Command>] {
        &self.commands
    }

    /// Timeout of the whole transaction
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Strict-error mode
    pub fn check_error(&self) -> bool {
        self.check_error
    }

    /// Failure logging
    pub fn log_errors(&self) -> bool {
        self.log_errors
    }

    fn descriptions(&self) -> Vec<String> {
        self.commands.iter().map(|c| format!("{:?}", c)).collect()
    }

    // ========================================================================
    // Timing
    // ========================================================================

    /// Time since the current `do_commit` started
    pub fn elapsed_time(&self) -> Duration {
        self.start_time.map_or(Duration::ZERO, |t| t.elapsed())
    }

    /// Time left before the deadline
    pub fn time_remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.elapsed_time())
    }

    /// True once the deadline has passed
    pub fn timeout_exceeded(&self) -> bool {
        self.elapsed_time() > self.timeout
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Queue on the owning connection and block for the outcome
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] when no outcome arrives within the timeout; it
    ///   names every queued command
    /// - with `check_error`, any failure of the commit itself
    pub fn commit(mut self) -> CommitResult {
        let commands = self.descriptions();
        let timeout = self.timeout;
        let check_error = self.check_error;
        let log_errors = self.log_errors;

        let slot = Arc::new(ResultSlot::new());
        if let Some(queue) = self.queue.take() {
            queue.push(QueuedTxn {
                txn: self,
                slot: Arc::clone(&slot),
            });
        }

        let outcome = slot
            .wait_timeout(timeout)
            .ok_or(Error::Timeout { commands, timeout })?;
        match outcome {
            Ok(results) => Ok(results),
            Err(e) => {
                if log_errors {
                    error!(error = %e, "Transaction failed");
                }
                if check_error {
                    Err(e)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Run the retry loop against `idl`
    ///
    /// Called on the connection's execution thread; never run two of these
    /// concurrently against the same mirror.
    ///
    /// # Errors
    ///
    /// - [`Error::CommitTimedOut`] when a retry would start past the deadline
    /// - with `check_error`, the first command error or
    ///   [`Error::CommitFailed`] for `ERROR` / `NOT_LOCKED`
    pub fn do_commit(&mut self, idl: &dyn Idl) -> CommitResult {
        self.start_time = Some(Instant::now());
        let mut attempts = 0u32;
        loop {
            if attempts > 0 && self.timeout_exceeded() {
                return Err(Error::CommitTimedOut {
                    timeout: self.timeout,
                });
            }
            attempts += 1;
            match self.attempt(idl, attempts)? {
                Outcome::Retryable => {
                    debug!(attempt = attempts, "OVSDB transaction returned TRY_AGAIN, retrying");
                    idl.run();
                }
                Outcome::Fatal(message) => {
                    if self.log_errors {
                        error!("{}", message);
                    }
                    return if self.check_error {
                        Err(Error::CommitFailed { message })
                    } else {
                        Ok(None)
                    };
                }
                Outcome::Aborted => {
                    debug!("Transaction aborted");
                    return Ok(None);
                }
                Outcome::Committed(results) => return Ok(Some(results)),
            }
        }
    }

    fn attempt(&mut self, idl: &dyn Idl, n: u32) -> Result<Outcome> {
        let mut txn = idl.begin();
        self.hooks.pre_commit(txn.as_mut())?;

        for (idx, command) in self.commands.iter_mut().enumerate() {
            debug!(n, idx, command = ?command, "Running txn command");
            if let Err(e) = command.run_idl(txn.as_mut()) {
                txn.abort();
                if self.check_error {
                    return Err(e);
                }
                if self.log_errors {
                    warn!(n, idx, error = %e, "Command failed, transaction aborted");
                }
            }
        }

        let status = txn.commit_block();
        let outcome = match action_for(&status) {
            Some(StatusAction::Retry) => Outcome::Retryable,
            Some(StatusAction::Fail) => {
                let detail = if status == CommitStatus::NotLocked {
                    NOT_LOCKED_MESSAGE.to_string()
                } else {
                    txn.error().unwrap_or_default()
                };
                Outcome::Fatal(format!("OVSDB Error: {}", detail))
            }
            Some(StatusAction::Abandon) => Outcome::Aborted,
            Some(StatusAction::Finish { post_commit }) => {
                if post_commit {
                    self.hooks.post_commit(txn.as_ref(), &mut self.commands);
                } else {
                    debug!("Transaction caused no change");
                }
                Outcome::Committed(self.results())
            }
            None => {
                debug!(status = %status, "Transaction returned an unknown status");
                Outcome::Committed(self.results())
            }
        };
        Ok(outcome)
    }

    fn results(&self) -> Vec<CommandResult> {
        self.commands.iter().map(|c| c.result()).collect()
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("commands", &self.commands)
            .field("timeout", &self.timeout)
            .field("check_error", &self.check_error)
            .field("log_errors", &self.log_errors)
            .finish()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptions().join(", "))
    }
}
