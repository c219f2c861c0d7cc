//! Row deletion

use crate::target::Target;
use ovsdb_concurrency::{Command, CommandResult};
use ovsdb_core::{Result, TxnHandle};
use ovsdb_lookup::Resolver;
use tracing::debug;

/// Delete one row
#[derive(Debug)]
pub struct DbDestroy {
    table: String,
    record: Target,
    if_exists: bool,
    resolver: Resolver,
}

impl DbDestroy {
    /// Delete the row of `table` named by `record`
    pub fn new(table: impl Into<String>, record: impl Into<Target>) -> Self {
        Self {
            table: table.into(),
            record: record.into(),
            if_exists: false,
            resolver: Resolver::default(),
        }
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

impl Command for DbDestroy {
    fn run_idl(&mut self, txn: &mut dyn TxnHandle) -> Result<()> {
        let found = self
            .record
            .resolve_if(&self.resolver, txn.database(), &self.table, self.if_exists)?
            .map(|row| row.uuid());
        match found {
            Some(uuid) => txn.delete(&self.table, &uuid),
            None => {
                debug!(table = %self.table, record = ?self.record, "Row already absent");
                Ok(())
            }
        }
    }

    fn result(&self) -> CommandResult {
        CommandResult::None
    }
}
