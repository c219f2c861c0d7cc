//! Row change events
//!
//! A [`RowEventHandler`] keeps a set of watched [`RowEvent`]s. The mirror
//! reports every row change to it (it is a [`RowEventSink`]); matching is done
//! on the reporting thread and matched events are queued for a dedicated
//! notify thread, so slow handlers never stall the mirror.
//!
//! Handler panics are caught and logged; the notify thread keeps running.

use crate::condition::{row_match, Condition};
use ovsdb_core::{Result, Row, RowEventKind, RowEventSink};
use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Something to run when a row changes
pub trait RowEvent: Send + Sync {
    /// Identity within a handler's watch set; watching an event whose key is
    /// already watched replaces nothing and adds nothing
    fn key(&self) -> String;

    /// True if this event cares about `kind` on `row`
    fn matches(&self, kind: RowEventKind, row: &Row, old: Option<&Row>) -> bool;

    /// Called on the notify thread for each match
    fn run(&self, kind: RowEventKind, row: &Row, old: Option<&Row>);

    /// Unwatch after the first run
    fn one_time(&self) -> bool {
        false
    }

    /// Name used in logs
    fn name(&self) -> &str {
        "RowEvent"
    }
}

type Callback = Box<dyn Fn(RowEventKind, &Row, Option<&Row>) + Send + Sync>;

/// Event filtered by kind, table and conditions on the new and old rows
pub struct ConditionalRowEvent {
    name: String,
    kinds: Vec<RowEventKind>,
    table: String,
    conditions: Vec<Condition>,
    old_conditions: Vec<Condition>,
    one_time: bool,
    callback: Callback,
}

impl ConditionalRowEvent {
    /// Run `callback` for `kinds` changes on rows of `table`
    pub fn new<F>(name: impl Into<String>, kinds: &[RowEventKind], table: impl Into<String>, callback: F) -> Self
    where
        F: Fn(RowEventKind, &Row, Option<&Row>) + Send + Sync + 'static,
    {
        let mut kinds = kinds.to_vec();
        kinds.sort();
        kinds.dedup();
        Self {
            name: name.into(),
            kinds,
            table: table.into(),
            conditions: Vec::new(),
            old_conditions: Vec::new(),
            one_time: false,
            callback: Box::new(callback),
        }
    }

    /// Only match rows satisfying every condition
    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Require a previous image satisfying every condition
    pub fn with_old_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.old_conditions = conditions;
        self
    }

    /// Unwatch after the first run
    pub fn once(mut self) -> Self {
        self.one_time = true;
        self
    }
}

impl fmt::Debug for ConditionalRowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalRowEvent")
            .field("name", &self.name)
            .field("kinds", &self.kinds)
            .field("table", &self.table)
            .field("conditions", &self.conditions)
            .field("old_conditions", &self.old_conditions)
            .field("one_time", &self.one_time)
            .finish()
    }
}

fn join_conditions(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl RowEvent for ConditionalRowEvent {
    fn key(&self) -> String {
        let kinds: Vec<String> = self.kinds.iter().map(|k| k.to_string()).collect();
        format!(
            "{}|{}|{}|{}",
            self.name,
            self.table,
            kinds.join(","),
            join_conditions(&self.conditions)
        )
    }

    fn matches(&self, kind: RowEventKind, row: &Row, old: Option<&Row>) -> bool {
        if !self.kinds.contains(&kind) || row.table_name() != self.table {
            return false;
        }
        if !self.conditions.is_empty() {
            match row_match(row, &self.conditions) {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    error!(event = %self.name, error = %e, "Row event conditions failed to evaluate");
                    return false;
                }
            }
        }
        if !self.old_conditions.is_empty() {
            // the old image may lack columns; treat that as no match
            match old.map(|o| row_match(o, &self.old_conditions)) {
                Some(Ok(true)) => {}
                _ => return false,
            }
        }
        debug!(
            event = %self.name,
            table = %self.table,
            kind = %kind,
            conditions = %join_conditions(&self.conditions),
            old_conditions = %join_conditions(&self.old_conditions),
            "Matched row event"
        );
        true
    }

    fn run(&self, kind: RowEventKind, row: &Row, old: Option<&Row>) {
        (self.callback)(kind, row, old)
    }

    fn one_time(&self) -> bool {
        self.one_time
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Handler
// ============================================================================

struct Notification {
    event: Arc<dyn RowEvent>,
    kind: RowEventKind,
    row: Row,
    old: Option<Row>,
}

#[derive(Default)]
struct Pending {
    queue: VecDeque<Notification>,
    running: bool,
}

struct HandlerInner {
    watched: Mutex<BTreeMap<String, Arc<dyn RowEvent>>>,
    pending: Mutex<Pending>,
    work_ready: Condvar,
    idle: Condvar,
    shutdown: AtomicBool,
}

impl HandlerInner {
    fn unwatch(&self, key: &str) -> bool {
        self.watched.lock().remove(key).is_some()
    }
}

/// Dispatches row changes to watched events on a notify thread
pub struct RowEventHandler {
    inner: Arc<HandlerInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RowEventHandler {
    /// Create a handler and start its notify thread
    pub fn new() -> Result<Self> {
        let inner = Arc::new(HandlerInner {
            watched: Mutex::new(BTreeMap::new()),
            pending: Mutex::new(Pending::default()),
            work_ready: Condvar::new(),
            idle: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let worker_inner = Arc::clone(&inner);
        let worker = std::thread::Builder::new()
            .name("ovsdb-notify".to_string())
            .spawn(move || notify_loop(&worker_inner))?;
        Ok(Self {
            inner,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Start watching `event`; returns false if an event with the same key
    /// is already watched
    pub fn watch(&self, event: Arc<dyn RowEvent>) -> bool {
        let mut watched = self.inner.watched.lock();
        let key = event.key();
        if watched.contains_key(&key) {
            return false;
        }
        watched.insert(key, event);
        true
    }

    /// Watch several events
    pub fn watch_all(&self, events: impl IntoIterator<Item = Arc<dyn RowEvent>>) {
        for event in events {
            self.watch(event);
        }
    }

    /// Stop watching `event`; returns false if it was not watched
    pub fn unwatch(&self, event: &dyn RowEvent) -> bool {
        self.inner.unwatch(&event.key())
    }

    /// Number of watched events
    pub fn watched_count(&self) -> usize {
        self.inner.watched.lock().len()
    }

    /// Watched events matching a change
    pub fn matching_events(&self, kind: RowEventKind, row: &Row, old: Option<&Row>) -> Vec<Arc<dyn RowEvent>> {
        self.inner
            .watched
            .lock()
            .values()
            .filter(|e| e.matches(kind, row, old))
            .cloned()
            .collect()
    }

    /// Block until every queued notification has run or `timeout` elapses;
    /// returns true when idle
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self.inner.pending.lock();
        while !pending.queue.is_empty() || pending.running {
            if self.inner.idle.wait_until(&mut pending, deadline).timed_out() {
                return pending.queue.is_empty() && !pending.running;
            }
        }
        true
    }

    /// Stop the notify thread after it drains queued notifications
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        {
            let _pending = self.inner.pending.lock();
            self.inner.work_ready.notify_all();
        }
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("Row event notify thread panicked");
            }
        }
    }
}

impl RowEventSink for RowEventHandler {
    fn notify(&self, kind: RowEventKind, row: &Row, old: Option<&Row>) {
        let matching = self.matching_events(kind, row, old);
        if matching.is_empty() || self.inner.shutdown.load(Ordering::Acquire) {
            return;
        }
        let mut pending = self.inner.pending.lock();
        for event in matching {
            pending.queue.push_back(Notification {
                event,
                kind,
                row: row.clone(),
                old: old.cloned(),
            });
        }
        self.inner.work_ready.notify_one();
    }
}

impl Drop for RowEventHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for RowEventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowEventHandler")
            .field("watched", &self.watched_count())
            .finish()
    }
}

fn notify_loop(inner: &HandlerInner) {
    loop {
        let note = {
            let mut pending = inner.pending.lock();
            loop {
                if let Some(note) = pending.queue.pop_front() {
                    pending.running = true;
                    break note;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut pending);
            }
        };

        let event = Arc::clone(&note.event);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            event.run(note.kind, &note.row, note.old.as_ref())
        }));
        if let Err(e) = outcome {
            error!(
                event = %event.name(),
                "Unexpected panic in row event: {:?}",
                e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
            );
        }
        if event.one_time() {
            inner.unwatch(&event.key());
        }

        let mut pending = inner.pending.lock();
        pending.running = false;
        if pending.queue.is_empty() {
            inner.idle.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovsdb_core::{AtomicType, ColumnType, Datum, TableSchema};
    use std::sync::atomic::AtomicUsize;
    use uuid::Uuid;

    fn port(name: &str) -> Row {
        let schema = Arc::new(
            TableSchema::new("Port")
                .column("name", ColumnType::scalar(AtomicType::String))
                .column("tag", ColumnType::optional(AtomicType::Integer)),
        );
        let mut row = Row::new(schema, Uuid::new_v4());
        row.set("name", Datum::scalar(name)).unwrap();
        row
    }

    fn counting(name: &str, counter: &Arc<AtomicUsize>) -> ConditionalRowEvent {
        let c = Arc::clone(counter);
        ConditionalRowEvent::new(name, &[RowEventKind::Create], "Port", move |_, _, _| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_matches_kind_table_and_conditions() {
        let counter = Arc::new(AtomicUsize::new(0));
        let event = counting("ev", &counter).with_conditions(vec![Condition::eq("name", "p1")]);
        assert!(event.matches(RowEventKind::Create, &port("p1"), None));
        assert!(!event.matches(RowEventKind::Create, &port("p2"), None));
        assert!(!event.matches(RowEventKind::Delete, &port("p1"), None));
    }

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_bad_condition_is_no_match() {
        let counter = Arc::new(AtomicUsize::new(0));
        let event = counting("ev", &counter).with_conditions(vec![Condition::eq("nope", "x")]);
        assert!(!event.matches(RowEventKind::Create, &port("p1"), None));
    }

    #[test]
    fn test_mistyped_condition_logged_as_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let event = counting("tagged", &counter).with_conditions(vec![Condition::eq("name", 5i64)]);

        let sink = Sink::default();
        let writer = sink.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let matched = tracing::subscriber::with_default(subscriber, || {
            event.matches(RowEventKind::Create, &port("p1"), None)
        });

        assert!(!matched);
        let text = String::from_utf8_lossy(&sink.0.lock()).into_owned();
        assert!(text.contains("ERROR"), "{}", text);
        assert!(text.contains("Row event conditions failed to evaluate"), "{}", text);
        assert!(text.contains("tagged"), "{}", text);
    }

    #[test]
    fn test_old_conditions_require_old_row() {
        let event = ConditionalRowEvent::new("ev", &[RowEventKind::Update], "Port", |_, _, _| {})
            .with_old_conditions(vec![Condition::eq("name", "old")]);
        assert!(!event.matches(RowEventKind::Update, &port("new"), None));
        assert!(event.matches(RowEventKind::Update, &port("new"), Some(&port("old"))));
        assert!(!event.matches(RowEventKind::Update, &port("new"), Some(&port("other"))));
    }

    #[test]
    fn test_watch_is_keyed() {
        let handler = RowEventHandler::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        assert!(handler.watch(Arc::new(counting("ev", &counter))));
        assert!(!handler.watch(Arc::new(counting("ev", &counter))));
        assert_eq!(handler.watched_count(), 1);
        assert!(handler.unwatch(&counting("ev", &counter)));
        assert_eq!(handler.watched_count(), 0);
    }

    #[test]
    fn test_notify_runs_on_notify_thread() {
        let handler = RowEventHandler::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        handler.watch(Arc::new(counting("ev", &counter)));

        handler.notify(RowEventKind::Create, &port("p1"), None);
        handler.notify(RowEventKind::Update, &port("p1"), None);
        handler.notify(RowEventKind::Create, &port("p2"), None);
        assert!(handler.wait_idle(Duration::from_secs(5)));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_one_time_event_unwatched_after_run() {
        let handler = RowEventHandler::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        handler.watch(Arc::new(counting("once", &counter).once()));

        handler.notify(RowEventKind::Create, &port("p1"), None);
        assert!(handler.wait_idle(Duration::from_secs(5)));
        handler.notify(RowEventKind::Create, &port("p2"), None);
        assert!(handler.wait_idle(Duration::from_secs(5)));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(handler.watched_count(), 0);
    }

    #[test]
    fn test_panicking_event_does_not_stop_thread() {
        let handler = RowEventHandler::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        handler.watch(Arc::new(ConditionalRowEvent::new(
            "boom",
            &[RowEventKind::Create],
            "Port",
            |_, _, _| panic!("boom"),
        )));
        handler.watch(Arc::new(counting("ok", &counter)));

        handler.notify(RowEventKind::Create, &port("p1"), None);
        handler.notify(RowEventKind::Create, &port("p2"), None);
        assert!(handler.wait_idle(Duration::from_secs(5)));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
