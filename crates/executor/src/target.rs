//! Addressing rows from commands
//!
//! A command names its row either by a [`Record`] resolved against the
//! transaction's database, or by a [`RowRef`] filled in by an earlier
//! command of the same transaction (typically a create).

use ovsdb_core::{Atom, Database, Datum, Error, Result, Row, Value};
use ovsdb_lookup::{Record, Resolver};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Shared handle to the identity of a row created in the same transaction
///
/// Holds the temporary uuid while the transaction runs and the permanent
/// one after it commits.
#[derive(Clone, Default)]
pub struct RowRef(Arc<Mutex<Option<Uuid>>>);

impl RowRef {
    /// An unfilled reference
    pub fn new() -> Self {
        Self::default()
    }

    /// Current identity, if the row has been created
    pub fn get(&self) -> Option<Uuid> {
        *self.0.lock()
    }

    pub(crate) fn set(&self, uuid: Uuid) {
        *self.0.lock() = Some(uuid);
    }

    /// Identity, failing when the creating command has not run
    pub fn require(&self) -> Result<Uuid> {
        self.get()
            .ok_or_else(|| Error::command("referenced row has not been created yet"))
    }
}

impl fmt::Debug for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(uuid) => write!(f, "RowRef({})", uuid),
            None => f.write_str("RowRef(pending)"),
        }
    }
}

/// Row a command operates on
#[derive(Debug, Clone)]
pub enum Target {
    /// Resolved through the record resolver
    Record(Record),
    /// Created earlier in the same transaction
    Pending(RowRef),
}

impl From<Record> for Target {
    fn from(r: Record) -> Self {
        Target::Record(r)
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Target::Record(Record::from(s))
    }
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        Target::Record(Record::from(s))
    }
}

impl From<Uuid> for Target {
    fn from(u: Uuid) -> Self {
        Target::Record(Record::Uuid(u))
    }
}

impl From<RowRef> for Target {
    fn from(r: RowRef) -> Self {
        Target::Pending(r)
    }
}

impl From<&RowRef> for Target {
    fn from(r: &RowRef) -> Self {
        Target::Pending(r.clone())
    }
}

impl Target {
    /// Resolve to a row of `table`
    pub fn resolve<'a>(&self, resolver: &Resolver, db: &'a Database, table: &str) -> Result<&'a Row> {
        match self {
            Target::Record(record) => resolver.resolve(db, table, record),
            Target::Pending(row_ref) => resolver.resolve(db, table, &Record::Uuid(row_ref.require()?)),
        }
    }

    /// Resolve, mapping a missing row to `None` when `if_exists` is set
    ///
    /// Unknown tables and columns still fail.
    pub fn resolve_if<'a>(
        &self,
        resolver: &Resolver,
        db: &'a Database,
        table: &str,
        if_exists: bool,
    ) -> Result<Option<&'a Row>> {
        match self.resolve(resolver, db, table) {
            Ok(row) => Ok(Some(row)),
            Err(Error::RowNotFound { .. }) if if_exists => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Value written to a column
#[derive(Debug, Clone)]
pub enum ColumnValue {
    /// A literal value
    Value(Value),
    /// A reference to a row created earlier in the transaction
    Row(RowRef),
}

impl From<Value> for ColumnValue {
    fn from(v: Value) -> Self {
        ColumnValue::Value(v)
    }
}

macro_rules! column_value_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ColumnValue {
                fn from(v: $t) -> Self {
                    ColumnValue::Value(Value::from(v))
                }
            }
        )*
    };
}

column_value_from!(Atom, i64, f64, bool, &str, String, Uuid);

impl From<RowRef> for ColumnValue {
    fn from(r: RowRef) -> Self {
        ColumnValue::Row(r)
    }
}

impl From<&RowRef> for ColumnValue {
    fn from(r: &RowRef) -> Self {
        ColumnValue::Row(r.clone())
    }
}

impl ColumnValue {
    /// Stored form, reading pending references at call time
    pub fn to_datum(&self) -> Result<Datum> {
        match self {
            ColumnValue::Value(v) => Ok(v.to_datum()),
            ColumnValue::Row(r) => Ok(Datum::scalar(Atom::Uuid(r.require()?))),
        }
    }
}
