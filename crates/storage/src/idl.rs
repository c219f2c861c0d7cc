//! In-memory mirrored database
//!
//! [`MemoryIdl`] is the reference [`Idl`] backend. It holds the committed
//! database image and applies transactions to it locally, which makes it
//! usable both as a test double for the orchestrator and as a standalone
//! transactional store.
//!
//! ## Commit order
//!
//! `commit_block` decides, in this order:
//!
//! 1. `Aborted` when the handle was aborted
//! 2. the next injected fault, if any
//! 3. `NotLocked` when a lock is required and not held
//! 4. `Unchanged` when no staged write differs from the mirror
//! 5. `TryAgain` when a touched row changed or vanished since `begin`
//! 6. `Error` when a written row violates its schema
//! 7. `Success` otherwise
//!
//! On success temporary uuids are replaced everywhere, versions bump, the
//! change counter advances, waiters wake, and row events fire after the
//! write lock is released.

use crate::schema_source::{validate_connection, SchemaSource};
use crate::txn::IdlTransaction;
use crate::validation::{validate_row, validate_touched};
use ovsdb_core::{
    CommitStatus, Database, DatabaseSchema, Idl, Result, Row, RowEventKind, RowEventSink, TxnHandle,
};
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use uuid::Uuid;

/// A scripted commit outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Status the next commit reports
    pub status: CommitStatus,
    /// Error text reported with it
    pub error: Option<String>,
}

type Change = (RowEventKind, Row, Option<Row>);

/// In-memory mirror of one database
pub struct MemoryIdl {
    schema: Arc<DatabaseSchema>,
    db: RwLock<Database>,
    seqno: Mutex<u64>,
    changed: Condvar,
    last_run_seqno: AtomicU64,
    runs: AtomicU64,
    lock_required: AtomicBool,
    lock_held: AtomicBool,
    faults: Mutex<VecDeque<Fault>>,
    sink: RwLock<Option<Arc<dyn RowEventSink>>>,
}

impl MemoryIdl {
    /// An empty mirror of `schema`
    pub fn new(schema: Arc<DatabaseSchema>) -> Self {
        Self {
            db: RwLock::new(Database::new(Arc::clone(&schema))),
            schema,
            seqno: Mutex::new(0),
            changed: Condvar::new(),
            last_run_seqno: AtomicU64::new(0),
            runs: AtomicU64::new(0),
            lock_required: AtomicBool::new(false),
            lock_held: AtomicBool::new(false),
            faults: Mutex::new(VecDeque::new()),
            sink: RwLock::new(None),
        }
    }

    /// Fetch `schema_name` from `source` and open an empty mirror of it
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`](ovsdb_core::Error::Connection) for a malformed
    ///   connection string
    /// - [`Error::SchemaRetrieval`](ovsdb_core::Error::SchemaRetrieval) when
    ///   the source has no such schema
    pub fn connect(connection: &str, source: &dyn SchemaSource, schema_name: &str) -> Result<Self> {
        validate_connection(connection)?;
        let schema = source.get_schema(connection, schema_name)?;
        debug!(connection, schema = %schema.name, version = %schema.version, "Opened mirror");
        Ok(Self::new(Arc::new(schema)))
    }

    /// Route row change notifications to `sink`
    pub fn with_event_sink(self, sink: Arc<dyn RowEventSink>) -> Self {
        self.set_event_sink(Some(sink));
        self
    }

    /// Replace (or remove) the row event sink
    pub fn set_event_sink(&self, sink: Option<Arc<dyn RowEventSink>>) {
        *self.sink.write() = sink;
    }

    /// Database schema
    pub fn schema(&self) -> &Arc<DatabaseSchema> {
        &self.schema
    }

    /// Copy of the committed database
    pub fn snapshot(&self) -> Database {
        self.db.read().clone()
    }

    /// Run `f` against the committed database
    pub fn read<R>(&self, f: impl FnOnce(&Database) -> R) -> R {
        f(&self.db.read())
    }

    /// Require a database lock for commits
    pub fn require_lock(&self, required: bool) {
        self.lock_required.store(required, Ordering::Release);
    }

    /// Record whether the lock is currently held
    pub fn set_lock_held(&self, held: bool) {
        self.lock_held.store(held, Ordering::Release);
    }

    /// Make the next commit report `status` with `error` text instead of
    /// applying; faults are consumed in order
    pub fn inject_fault(&self, status: CommitStatus, error: Option<&str>) {
        self.faults.lock().push_back(Fault {
            status,
            error: error.map(str::to_string),
        });
    }

    /// Number of injected faults not yet consumed
    pub fn pending_faults(&self) -> usize {
        self.faults.lock().len()
    }

    /// Number of event-loop runs so far
    pub fn run_count(&self) -> u64 {
        self.runs.load(Ordering::Acquire)
    }

    pub(crate) fn commit(&self, txn: &mut IdlTransaction<'_>) -> CommitStatus {
        if txn.aborted {
            return CommitStatus::Aborted;
        }
        if let Some(fault) = self.faults.lock().pop_front() {
            debug!(status = %fault.status, "Injected commit fault");
            txn.error = fault.error;
            return fault.status;
        }
        if self.lock_required.load(Ordering::Acquire) && !self.lock_held.load(Ordering::Acquire) {
            return CommitStatus::NotLocked;
        }

        let changes = {
            let mut db = self.db.write();
            let effective: Vec<_> = txn
                .written
                .iter()
                .filter(|(table, uuid)| {
                    let before = db.row(table, uuid).ok().flatten();
                    let after = txn.working.row(table, uuid).ok().flatten();
                    match (before, after) {
                        (Some(b), Some(a)) => b.columns().ne(a.columns()),
                        (None, None) => false,
                        _ => true,
                    }
                })
                .cloned()
                .collect();
            if effective.is_empty() {
                return CommitStatus::Unchanged;
            }

            let validation = validate_touched(&txn.touched, &db);
            if !validation.is_valid() {
                debug!(conflicts = ?validation.conflicts, "Commit conflict");
                return CommitStatus::TryAgain;
            }

            for (table, uuid) in &effective {
                if let Some(row) = txn.working.row(table, uuid).ok().flatten() {
                    if let Some(message) = validate_row(row) {
                        txn.error = Some(message);
                        return CommitStatus::Error;
                    }
                }
            }

            let real: BTreeMap<Uuid, Uuid> = txn
                .inserted
                .iter()
                .map(|(_, temp)| (*temp, Uuid::new_v4()))
                .collect();

            let mut seqno = self.seqno.lock();
            let version = *seqno + 1;
            let mut changes: Vec<Change> = Vec::with_capacity(effective.len());
            for (table, uuid) in &effective {
                let staged = txn.working.row(table, uuid).ok().flatten().cloned();
                let Ok(rows) = db.table_mut(table) else {
                    continue;
                };
                match staged {
                    Some(mut row) => {
                        for (temp, permanent) in &real {
                            row.replace_uuid(temp, permanent);
                        }
                        if let Some(permanent) = real.get(uuid) {
                            row.set_uuid(*permanent);
                        }
                        row.set_version(version);
                        let old = rows.insert(row.clone());
                        let kind = if old.is_some() {
                            RowEventKind::Update
                        } else {
                            RowEventKind::Create
                        };
                        changes.push((kind, row, old));
                    }
                    None => {
                        if let Some(old) = rows.remove(uuid) {
                            changes.push((RowEventKind::Delete, old, None));
                        }
                    }
                }
            }
            txn.real_uuids = real;
            *seqno = version;
            self.changed.notify_all();
            trace!(seqno = version, rows = changes.len(), "Applied transaction");
            changes
        };

        self.publish(changes);
        CommitStatus::Success
    }

    fn publish(&self, changes: Vec<Change>) {
        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            for (kind, row, old) in changes {
                sink.notify(kind, &row, old.as_ref());
            }
        }
    }
}

impl Idl for MemoryIdl {
    fn begin(&self) -> Box<dyn TxnHandle + '_> {
        Box::new(IdlTransaction::new(self, self.snapshot()))
    }

    fn run(&self) -> bool {
        self.runs.fetch_add(1, Ordering::AcqRel);
        let current = self.change_seqno();
        self.last_run_seqno.swap(current, Ordering::AcqRel) != current
    }

    fn change_seqno(&self) -> u64 {
        *self.seqno.lock()
    }

    fn wait(&self, seqno: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut current = self.seqno.lock();
        while *current == seqno {
            if self.changed.wait_until(&mut current, deadline).timed_out() {
                return *current != seqno;
            }
        }
        true
    }
}

impl fmt::Debug for MemoryIdl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryIdl")
            .field("schema", &self.schema.name)
            .field("seqno", &self.change_seqno())
            .finish()
    }
}
