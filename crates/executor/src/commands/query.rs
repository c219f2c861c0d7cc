//! Row reads

use crate::target::Target;
use ovsdb_concurrency::{Command, CommandResult, RowView};
use ovsdb_core::{Result, Row, TxnHandle, Value, UUID_COLUMN};
use ovsdb_lookup::{get_column_value, row_match, Condition, Resolver};

/// Materialize `row`, limited to `columns` when given
///
/// `_uuid` is always included.
pub fn row_view(row: &Row, columns: Option<&[String]>) -> Result<RowView> {
    let mut view = RowView::new();
    view.insert(UUID_COLUMN.to_string(), Value::from(row.uuid()));
    match columns {
        Some(columns) => {
            for column in columns {
                view.insert(column.clone(), get_column_value(row, column)?);
            }
        }
        None => {
            for column in row.schema().columns.keys() {
                view.insert(column.clone(), get_column_value(row, column)?);
            }
        }
    }
    Ok(view)
}

/// Read one column of one row
#[derive(Debug)]
pub struct DbGet {
    table: String,
    record: Target,
    column: String,
    resolver: Resolver,
    value: Option<Value>,
}

impl DbGet {
    /// Read `column` of the row of `table` named by `record`
    pub fn new(table: impl Into<String>, record: impl Into<Target>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            record: record.into(),
            column: column.into(),
            resolver: Resolver::default(),
            value: None,
        }
    }

    /// Resolve records with `resolver`
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }
}

impl Command for DbGet {
    fn run_idl(&mut self, txn: &mut dyn TxnHandle) -> Result<()> {
        let row = self.record.resolve(&self.resolver, txn.database(), &self.table)?;
        self.value = Some(get_column_value(row, &self.column)?);
        Ok(())
    }

    fn result(&self) -> CommandResult {
        self.value.clone().map_or(CommandResult::None, CommandResult::Value)
    }
}

/// Rows of a table matching every condition
#[derive(Debug)]
pub struct DbFind {
    table: String,
    conditions: Vec<Condition>,
    columns: Option<Vec<String>>,
    rows: Vec<RowView>,
}

impl DbFind {
    /// Find rows of `table` matching all `conditions`
    pub fn new(table: impl Into<String>, conditions: Vec<Condition>) -> Self {
        Self {
            table: table.into(),
            conditions,
            columns: None,
            rows: Vec::new(),
        }
    }

    /// Report only these columns
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }
}

impl Command for DbFind {
    fn run_idl(&mut self, txn: &mut dyn TxnHandle) -> Result<()> {
        self.rows.clear();
        for row in txn.database().table(&self.table)?.rows() {
            if row_match(row, &self.conditions)? {
                self.rows.push(row_view(row, self.columns.as_deref())?);
            }
        }
        Ok(())
    }

    fn result(&self) -> CommandResult {
        CommandResult::Rows(self.rows.clone())
    }
}

/// Named rows of a table, or all of them
#[derive(Debug)]
pub struct DbList {
    table: String,
    records: Option<Vec<Target>>,
    columns: Option<Vec<String>>,
    if_exists: bool,
    resolver: Resolver,
    rows: Vec<RowView>,
}

impl DbList {
    /// List every row of `table`
    pub fn all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            records: None,
            columns: None,
            if_exists: false,
            resolver: Resolver::default(),
            rows: Vec::new(),
        }
    }

    /// List the rows of `table` named by `records`, in that order
    pub fn records<T: Into<Target>>(table: impl Into<String>, records: impl IntoIterator<Item = T>) -> Self {
        Self {
            records: Some(records.into_iter().map(Into::into).collect()),
            ..Self::all(table)
        }
    }

    /// Report only these columns
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Skip named rows that do not exist
    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    /// Resolve records with `resolver`
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }
}

impl Command for DbList {
    fn run_idl(&mut self, txn: &mut dyn TxnHandle) -> Result<()> {
        self.rows.clear();
        let db = txn.database();
        let columns = self.columns.as_deref();
        match &self.records {
            None => {
                for row in db.table(&self.table)?.rows() {
                    self.rows.push(row_view(row, columns)?);
                }
            }
            Some(records) => {
                for record in records {
                    if let Some(row) = record.resolve_if(&self.resolver, db, &self.table, self.if_exists)? {
                        self.rows.push(row_view(row, columns)?);
                    }
                }
            }
        }
        Ok(())
    }

    fn result(&self) -> CommandResult {
        CommandResult::Rows(self.rows.clone())
    }
}
