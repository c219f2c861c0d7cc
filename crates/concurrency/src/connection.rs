//! Connection and its execution thread
//!
//! A [`Connection`] owns the mirror and serializes every transaction
//! through one worker thread, so at most one transaction handle is open
//! against the mirror at a time. Submitting threads only ever block on
//! their own result slot.

use crate::config::{ConnectionConfig, TransactionOptions};
use crate::slot::ResultSlot;
use crate::transaction::{CommitResult, Transaction};
use ovsdb_core::{Error, Idl, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error};

pub(crate) struct QueuedTxn {
    pub(crate) txn: Transaction,
    pub(crate) slot: Arc<ResultSlot<CommitResult>>,
}

/// FIFO of transactions waiting for the worker
#[derive(Default)]
pub(crate) struct TxnQueue {
    jobs: Mutex<VecDeque<QueuedTxn>>,
    ready: Condvar,
}

impl TxnQueue {
    pub(crate) fn push(&self, job: QueuedTxn) {
        self.jobs.lock().push_back(job);
        self.ready.notify_one();
    }

    fn pop_timeout(&self, timeout: Duration) -> Option<QueuedTxn> {
        let deadline = Instant::now() + timeout;
        let mut jobs = self.jobs.lock();
        loop {
            if let Some(job) = jobs.pop_front() {
                return Some(job);
            }
            if self.ready.wait_until(&mut jobs, deadline).timed_out() {
                return jobs.pop_front();
            }
        }
    }

    fn wake(&self) {
        let _jobs = self.jobs.lock();
        self.ready.notify_all();
    }

    fn len(&self) -> usize {
        self.jobs.lock().len()
    }
}

/// Owner of a mirror and the thread that commits against it
pub struct Connection<I: Idl + 'static> {
    idl: Arc<I>,
    queue: Arc<TxnQueue>,
    config: ConnectionConfig,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<I: Idl + 'static> Connection<I> {
    /// A stopped connection over `idl`
    pub fn new(idl: Arc<I>, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            idl,
            queue: Arc::new(TxnQueue::default()),
            config,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        })
    }

    /// The mirror
    pub fn idl(&self) -> &Arc<I> {
        &self.idl
    }

    /// Configuration in use
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// True while the worker runs
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Transactions waiting for the worker
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Start the worker; does nothing if it already runs
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }
        self.running.store(true, Ordering::Release);
        let idl = Arc::clone(&self.idl);
        let queue = Arc::clone(&self.queue);
        let running = Arc::clone(&self.running);
        let poll = self.config.poll_interval();
        let handle = std::thread::Builder::new()
            .name("ovsdb-connection".to_string())
            .spawn(move || worker_loop(idl.as_ref(), &queue, &running, poll))
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                Error::Connection(format!("Could not start connection thread: {}", e))
            })?;
        *worker = Some(handle);
        debug!("Connection started");
        Ok(())
    }

    /// Stop the worker; queued transactions are left to time out
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.queue.wake();
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!("Connection thread panicked");
            }
            debug!("Connection stopped");
        }
    }

    /// A transaction using the connection defaults
    pub fn transaction(&self) -> Transaction {
        self.transaction_with(TransactionOptions::from(&self.config))
    }

    /// A transaction with explicit options
    pub fn transaction_with(&self, options: TransactionOptions) -> Transaction {
        Transaction::attached(
            Arc::clone(&self.queue),
            options.timeout.unwrap_or_else(|| self.config.timeout()),
            options.check_error,
            options.log_errors,
        )
    }
}

impl<I: Idl + 'static> Drop for Connection<I> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<I: Idl + 'static> fmt::Debug for Connection<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("queued", &self.queued())
            .finish()
    }
}

fn worker_loop(idl: &dyn Idl, queue: &TxnQueue, running: &AtomicBool, poll: Duration) {
    while running.load(Ordering::Acquire) {
        idl.run();
        let Some(QueuedTxn { mut txn, slot }) = queue.pop_timeout(poll) else {
            continue;
        };
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| txn.do_commit(idl)))
            .unwrap_or_else(|e| {
                let message = e
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| e.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("(non-string panic)");
                error!("Transaction panicked: {}", message);
                Err(Error::command(format!("transaction panicked: {}", message)))
            });
        if !slot.put(outcome) {
            debug!("Transaction outcome arrived after its caller gave up");
        }
    }
}
