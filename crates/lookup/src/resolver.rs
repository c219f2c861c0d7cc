//! Record resolution
//!
//! Turns a caller-supplied identifier (a uuid, a uuid-shaped string, or a
//! column value such as a bridge name) into a concrete row of the mirror.
//!
//! ## Strategies
//!
//! Exactly one strategy applies per table:
//!
//! 1. **Special case**: the table has an entry in the [`LookupTable`]. The
//!    entry names which table and column to search, and optionally which
//!    column of the found row holds a back-reference to the target.
//! 2. **Direct index**: the table's schema declares a sole single-column
//!    index; that column is searched in the table itself.
//! 3. **UUID only**: anything else. Name lookups fail with
//!    [`Error::UuidOnlyTable`].
//!
//! A uuid (or a string that parses as one) is always looked up by primary
//! key first, and a miss is a hard [`Error::RowNotFound`].

use crate::condition::get_column_value;
use once_cell::sync::Lazy;
use ovsdb_core::{Database, Error, Result, Row, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// How to find rows of a table that lacks a usable index
///
/// - `table == None`: the table can only be addressed by uuid
/// - `column == None`: `table` holds a single row, which is the answer
/// - `uuid_column == Some(c)`: the row found in `table` references the
///   target through its column `c`, which must hold exactly one uuid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLookup {
    /// Table to search
    pub table: Option<String>,
    /// Column compared with the identifier
    pub column: Option<String>,
    /// Back-reference column of the found row
    pub uuid_column: Option<String>,
}

impl RowLookup {
    /// Only uuids address this table
    pub fn uuid_only() -> Self {
        Self {
            table: None,
            column: None,
            uuid_column: None,
        }
    }

    /// The single row of `table`
    pub fn singleton(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: None,
            uuid_column: None,
        }
    }

    /// The row of `table` whose `column` equals the identifier
    pub fn by_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: Some(column.into()),
            uuid_column: None,
        }
    }

    /// Follow `uuid_column` of the found row to the target
    pub fn via(mut self, uuid_column: impl Into<String>) -> Self {
        self.uuid_column = Some(uuid_column.into());
        self
    }
}

/// Per-table lookup strategies
///
/// Adding a schema's special case means adding one entry here; the resolver
/// logic never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    entries: BTreeMap<String, RowLookup>,
}

impl LookupTable {
    /// A table with no special cases
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the strategy for `table`
    pub fn with(mut self, table: impl Into<String>, lookup: RowLookup) -> Self {
        self.entries.insert(table.into(), lookup);
        self
    }

    /// Strategy registered for `table`
    pub fn get(&self, table: &str) -> Option<&RowLookup> {
        self.entries.get(table)
    }

    /// Special cases of the `Open_vSwitch` schema
    ///
    /// | Table | Search | Back-reference |
    /// |-------|--------|----------------|
    /// | Controller | Bridge.name | controller |
    /// | Flow_Table | Flow_Table.name | |
    /// | IPFIX | Bridge.name | ipfix |
    /// | Mirror | Mirror.name | |
    /// | NetFlow | Bridge.name | netflow |
    /// | Open_vSwitch | singleton | |
    /// | QoS | Port.name | qos |
    /// | Queue | uuid only | |
    /// | sFlow | Bridge.name | sflow |
    /// | SSL | Open_vSwitch singleton | ssl |
    pub fn open_vswitch() -> Self {
        Self::new()
            .with("Controller", RowLookup::by_column("Bridge", "name").via("controller"))
            .with("Flow_Table", RowLookup::by_column("Flow_Table", "name"))
            .with("IPFIX", RowLookup::by_column("Bridge", "name").via("ipfix"))
            .with("Mirror", RowLookup::by_column("Mirror", "name"))
            .with("NetFlow", RowLookup::by_column("Bridge", "name").via("netflow"))
            .with("Open_vSwitch", RowLookup::singleton("Open_vSwitch"))
            .with("QoS", RowLookup::by_column("Port", "name").via("qos"))
            .with("Queue", RowLookup::uuid_only())
            .with("sFlow", RowLookup::by_column("Bridge", "name").via("sflow"))
            .with("SSL", RowLookup::singleton("Open_vSwitch").via("ssl"))
    }
}

static OPEN_VSWITCH_LOOKUPS: Lazy<Arc<LookupTable>> =
    Lazy::new(|| Arc::new(LookupTable::open_vswitch()));

/// Identifier of a row as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Primary key
    Uuid(Uuid),
    /// Anything else: a uuid-shaped string or a column value
    Name(String),
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Uuid(u) => write!(f, "{}", u),
            Record::Name(n) => f.write_str(n),
        }
    }
}

impl From<Uuid> for Record {
    fn from(u: Uuid) -> Self {
        Record::Uuid(u)
    }
}

impl From<&str> for Record {
    fn from(s: &str) -> Self {
        Record::Name(s.to_string())
    }
}

impl From<String> for Record {
    fn from(s: String) -> Self {
        Record::Name(s)
    }
}

/// Resolves records against a database using a [`LookupTable`]
#[derive(Debug, Clone)]
pub struct Resolver {
    lookups: Arc<LookupTable>,
}

impl Default for Resolver {
    /// Resolver using the `Open_vSwitch` special cases
    fn default() -> Self {
        Self {
            lookups: Arc::clone(&OPEN_VSWITCH_LOOKUPS),
        }
    }
}

impl Resolver {
    /// Resolver using `lookups`
    pub fn new(lookups: LookupTable) -> Self {
        Self {
            lookups: Arc::new(lookups),
        }
    }

    /// Strategies in use
    pub fn lookups(&self) -> &LookupTable {
        &self.lookups
    }

    /// Strategy that applies to `table`
    pub fn strategy(&self, db: &Database, table: &str) -> Result<RowLookup> {
        if let Some(lookup) = self.lookups.get(table) {
            return Ok(lookup.clone());
        }
        let schema = db.table(table)?.schema();
        Ok(match schema.index_column() {
            Some(column) => RowLookup::by_column(table, column),
            None => RowLookup::uuid_only(),
        })
    }

    /// Resolve `record` to a row of `table`
    ///
    /// # Preconditions
    ///
    /// Singleton strategies assume their table holds exactly one row. An
    /// empty table yields [`Error::RowNotFound`]; with several rows the first
    /// in uuid order is used.
    ///
    /// # Errors
    ///
    /// - [`Error::RowNotFound`] when nothing matches, or a back-reference
    ///   column holds zero or several uuids
    /// - [`Error::UuidOnlyTable`] when a name addresses a uuid-only table
    /// - [`Error::NoSuchTable`] / [`Error::NoSuchColumn`] for schema mistakes
    pub fn resolve<'a>(&self, db: &'a Database, table: &str, record: &Record) -> Result<&'a Row> {
        let rows = db.table(table)?;
        let name = match record {
            Record::Uuid(uuid) => {
                return rows
                    .row(uuid)
                    .ok_or_else(|| Error::row_not_found(table, "uuid", uuid));
            }
            Record::Name(name) => name,
        };
        if let Ok(uuid) = Uuid::parse_str(name) {
            return rows
                .row(&uuid)
                .ok_or_else(|| Error::row_not_found(table, "uuid", name));
        }

        let lookup = self.strategy(db, table)?;
        let target = lookup.table.as_deref().ok_or_else(|| Error::UuidOnlyTable {
            table: table.to_string(),
        })?;
        let found = match lookup.column.as_deref() {
            None => db
                .table(target)?
                .rows()
                .next()
                .ok_or_else(|| Error::row_not_found(target, "record", name))?,
            Some(column) => row_by_value(db, target, column, &Value::from(name.as_str()))?,
        };

        match lookup.uuid_column.as_deref() {
            None => Ok(found),
            Some(uuid_column) => {
                let refs = found.datum(uuid_column)?.uuids();
                match refs.as_slice() {
                    [only] => rows
                        .row(only)
                        .ok_or_else(|| Error::row_not_found(table, "uuid", only)),
                    _ => Err(Error::row_not_found(table, "record", name)),
                }
            }
        }
    }
}

/// Resolve `record` with the default `Open_vSwitch` strategies
pub fn resolve<'a>(db: &'a Database, table: &str, record: &Record) -> Result<&'a Row> {
    Resolver::default().resolve(db, table, record)
}

/// First row of `table` whose `column` equals `value`, if any
pub fn try_row_by_value<'a>(
    db: &'a Database,
    table: &str,
    column: &str,
    value: &Value,
) -> Result<Option<&'a Row>> {
    for row in db.table(table)?.rows() {
        if get_column_value(row, column)? == *value {
            return Ok(Some(row));
        }
    }
    Ok(None)
}

/// First row of `table` whose `column` equals `value`
///
/// Use [`try_row_by_value`] with `unwrap_or` to supply a default instead.
pub fn row_by_value<'a>(db: &'a Database, table: &str, column: &str, value: &Value) -> Result<&'a Row> {
    try_row_by_value(db, table, column, value)?
        .ok_or_else(|| Error::row_not_found(table, column, value))
}
