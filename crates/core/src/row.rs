//! Rows, tables and the database image
//!
//! These are the mirrored records a client reads and resolves. The mirror
//! (see `ovsdb-storage`) owns them; everything above it only borrows.
//!
//! Every row carries a `version` that the mirror bumps on each committed
//! change. Transaction handles record the versions they saw so a commit can
//! detect rows that moved underneath it.

use crate::error::{Error, Result};
use crate::schema::{DatabaseSchema, TableSchema};
use crate::value::Datum;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Row
// ============================================================================

/// A single record of one table
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    uuid: Uuid,
    version: u64,
    schema: Arc<TableSchema>,
    columns: BTreeMap<String, Datum>,
}

impl Row {
    /// A row holding each column's default value
    pub fn new(schema: Arc<TableSchema>, uuid: Uuid) -> Self {
        let columns = schema
            .columns
            .values()
            .map(|c| (c.name.clone(), c.ty.default_datum()))
            .collect();
        Self {
            uuid,
            version: 0,
            schema,
            columns,
        }
    }

    /// Row identity
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Commit version of the row (0 for rows never committed)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Name of the owning table
    pub fn table_name(&self) -> &str {
        &self.schema.name
    }

    /// Schema of the owning table
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Stored value of `column`
    pub fn datum(&self, column: &str) -> Result<&Datum> {
        self.columns.get(column).ok_or_else(|| Error::NoSuchColumn {
            table: self.schema.name.clone(),
            column: column.to_string(),
        })
    }

    /// All stored columns
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overwrite `column` without type checking
    ///
    /// Type and cardinality are enforced when the owning transaction commits.
    pub fn set(&mut self, column: &str, datum: Datum) -> Result<()> {
        self.schema.get_column(column)?;
        self.columns.insert(column.to_string(), datum);
        Ok(())
    }

    /// Replace the row's identity
    pub fn set_uuid(&mut self, uuid: Uuid) {
        self.uuid = uuid;
    }

    /// Set the commit version
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Rewrite every reference to `from` so it points at `to`
    pub fn replace_uuid(&mut self, from: &Uuid, to: &Uuid) {
        for datum in self.columns.values_mut() {
            datum.replace_uuid(from, to);
        }
    }
}

// ============================================================================
// Table
// ============================================================================

/// All rows of one table, ordered by uuid
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Arc<TableSchema>,
    rows: BTreeMap<Uuid, Row>,
}

impl Table {
    /// An empty table
    pub fn new(schema: Arc<TableSchema>) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Table schema
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Row by primary key
    pub fn row(&self, uuid: &Uuid) -> Option<&Row> {
        self.rows.get(uuid)
    }

    /// Mutable row by primary key
    pub fn row_mut(&mut self, uuid: &Uuid) -> Option<&mut Row> {
        self.rows.get_mut(uuid)
    }

    /// Iterate rows in uuid order
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert or replace a row
    pub fn insert(&mut self, row: Row) -> Option<Row> {
        self.rows.insert(row.uuid(), row)
    }

    /// Remove a row
    pub fn remove(&mut self, uuid: &Uuid) -> Option<Row> {
        self.rows.remove(uuid)
    }
}

// ============================================================================
// Database
// ============================================================================

/// Image of every table in a schema
#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    schema: Arc<DatabaseSchema>,
    tables: BTreeMap<String, Table>,
}

impl Database {
    /// An empty database with one table per schema table
    pub fn new(schema: Arc<DatabaseSchema>) -> Self {
        let tables = schema
            .tables
            .iter()
            .map(|(name, t)| (name.clone(), Table::new(Arc::clone(t))))
            .collect();
        Self { schema, tables }
    }

    /// Database schema
    pub fn schema(&self) -> &Arc<DatabaseSchema> {
        &self.schema
    }

    /// Table by name
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))
    }

    /// Mutable table by name
    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))
    }

    /// Row of `table` by primary key
    pub fn row(&self, table: &str, uuid: &Uuid) -> Result<Option<&Row>> {
        Ok(self.table(table)?.row(uuid))
    }

    /// Iterate tables in name order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }
}
