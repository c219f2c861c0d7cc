//! Row creation

use crate::target::{ColumnValue, RowRef};
use ovsdb_concurrency::{Command, CommandResult};
use ovsdb_core::{Result, TxnHandle};
use tracing::debug;
use uuid::Uuid;

/// Insert a row and set its columns
///
/// The result is the row's uuid: temporary while the transaction runs,
/// permanent once it commits. [`row_ref`](Self::row_ref) lets later commands
/// in the same transaction point at the new row.
#[derive(Debug)]
pub struct DbCreate {
    table: String,
    columns: Vec<(String, ColumnValue)>,
    row_ref: RowRef,
    uuid: Option<Uuid>,
}

impl DbCreate {
    /// Create a row of `table` with default column values
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            row_ref: RowRef::new(),
            uuid: None,
        }
    }

    /// Set `column` on the new row
    pub fn column(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.columns.push((column.into(), value.into()));
        self
    }

    /// Handle to the new row's identity
    pub fn row_ref(&self) -> RowRef {
        self.row_ref.clone()
    }
}

impl Command for DbCreate {
    fn run_idl(&mut self, txn: &mut dyn TxnHandle) -> Result<()> {
        let uuid = txn.insert(&self.table)?;
        self.row_ref.set(uuid);
        self.uuid = Some(uuid);
        for (column, value) in &self.columns {
            txn.set(&self.table, &uuid, column, value.to_datum()?)?;
        }
        debug!(table = %self.table, uuid = %uuid, "Staged row creation");
        Ok(())
    }

    fn post_commit(&mut self, txn: &dyn TxnHandle) {
        if let Some(real) = self.uuid.and_then(|temp| txn.real_uuid(&temp)) {
            self.uuid = Some(real);
            self.row_ref.set(real);
        }
    }

    fn result(&self) -> CommandResult {
        self.uuid.map_or(CommandResult::None, CommandResult::Uuid)
    }
}
