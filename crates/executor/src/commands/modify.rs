//! Column writes

use crate::target::{ColumnValue, Target};
use ovsdb_concurrency::{Command, CommandResult};
use ovsdb_core::{Datum, Error, Result, TxnHandle};
use ovsdb_lookup::Resolver;

/// Overwrite columns of one row
#[derive(Debug)]
pub struct DbSet {
    table: String,
    record: Target,
    columns: Vec<(String, ColumnValue)>,
    if_exists: bool,
    resolver: Resolver,
}

impl DbSet {
    /// Write to the row of `table` named by `record`
    pub fn new(table: impl Into<String>, record: impl Into<Target>) -> Self {
        Self {
            table: table.into(),
            record: record.into(),
            columns: Vec::new(),
            if_exists: false,
            resolver: Resolver::default(),
        }
    }

    /// Set `column` to `value`
    pub fn column(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.columns.push((column.into(), value.into()));
        self
    }

    /// Do nothing when the row does not exist
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

impl Command for DbSet {
    fn run_idl(&mut self, txn: &mut dyn TxnHandle) -> Result<()> {
        let uuid = match self
            .record
            .resolve_if(&self.resolver, txn.database(), &self.table, self.if_exists)?
        {
            Some(row) => row.uuid(),
            None => return Ok(()),
        };
        for (column, value) in &self.columns {
            txn.set(&self.table, &uuid, column, value.to_datum()?)?;
        }
        Ok(())
    }

    fn result(&self) -> CommandResult {
        CommandResult::None
    }
}

/// Add elements to a set column or pairs to a map column
///
/// Map keys already present keep their value.
#[derive(Debug)]
pub struct DbAdd {
    table: String,
    record: Target,
    column: String,
    values: Vec<ColumnValue>,
    resolver: Resolver,
}

impl DbAdd {
    /// Add `value` to `column` of the row named by `record`
    pub fn new(
        table: impl Into<String>,
        record: impl Into<Target>,
        column: impl Into<String>,
        value: impl Into<ColumnValue>,
    ) -> Self {
        Self {
            table: table.into(),
            record: record.into(),
            column: column.into(),
            values: vec![value.into()],
            resolver: Resolver::default(),
        }
    }

    /// Add another value
    pub fn and(mut self, value: impl Into<ColumnValue>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Resolve records with `resolver`
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }
}

impl Command for DbAdd {
    fn run_idl(&mut self, txn: &mut dyn TxnHandle) -> Result<()> {
        let (uuid, merged) = {
            let row = self.record.resolve(&self.resolver, txn.database(), &self.table)?;
            let mut merged = row.datum(&self.column)?.clone();
            for value in &self.values {
                merged = merged.union(&value.to_datum()?)?;
            }
            (row.uuid(), merged)
        };
        txn.set(&self.table, &uuid, &self.column, merged)
    }

    fn result(&self) -> CommandResult {
        CommandResult::None
    }
}

/// Empty a set or map column
#[derive(Debug)]
pub struct DbClear {
    table: String,
    record: Target,
    column: String,
    resolver: Resolver,
}

impl DbClear {
    /// Clear `column` of the row named by `record`
    pub fn new(table: impl Into<String>, record: impl Into<Target>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            record: record.into(),
            column: column.into(),
            resolver: Resolver::default(),
        }
    }

    /// Resolve records with `resolver`
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }
}

impl Command for DbClear {
    fn run_idl(&mut self, txn: &mut dyn TxnHandle) -> Result<()> {
        let uuid = {
            let row = self.record.resolve(&self.resolver, txn.database(), &self.table)?;
            if row.schema().get_column(&self.column)?.ty.min > 0 {
                return Err(Error::command(format!(
                    "\"clear\" operation cannot be applied to column {} of table {}, which is not allowed to be empty",
                    self.column, self.table
                )));
            }
            row.uuid()
        };
        txn.set(&self.table, &uuid, &self.column, Datum::empty())
    }

    fn result(&self) -> CommandResult {
        CommandResult::None
    }
}
