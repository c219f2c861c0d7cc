//! Transaction handle over the in-memory mirror
//!
//! An [`IdlTransaction`] works on a private copy of the committed database,
//! so reads see the transaction's own writes. It records the version of
//! every pre-existing row it writes or deletes; those versions are what
//! commit-time validation compares against.

use crate::idl::MemoryIdl;
use crate::validation::RowKey;
use ovsdb_core::{CommitStatus, Database, Datum, Error, Result, Row, TxnHandle};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

/// One commit attempt against a [`MemoryIdl`]
pub struct IdlTransaction<'a> {
    idl: &'a MemoryIdl,
    pub(crate) working: Database,
    pub(crate) touched: BTreeMap<RowKey, u64>,
    pub(crate) inserted: BTreeSet<RowKey>,
    pub(crate) written: BTreeSet<RowKey>,
    pub(crate) aborted: bool,
    pub(crate) error: Option<String>,
    pub(crate) real_uuids: BTreeMap<Uuid, Uuid>,
    status: Option<CommitStatus>,
}

impl<'a> IdlTransaction<'a> {
    pub(crate) fn new(idl: &'a MemoryIdl, working: Database) -> Self {
        Self {
            idl,
            working,
            touched: BTreeMap::new(),
            inserted: BTreeSet::new(),
            written: BTreeSet::new(),
            aborted: false,
            error: None,
            real_uuids: BTreeMap::new(),
            status: None,
        }
    }

    /// True if anything has been staged
    pub fn has_writes(&self) -> bool {
        !self.written.is_empty()
    }

    fn existing_row(&self, table: &str, uuid: &Uuid) -> Result<&Row> {
        self.working
            .table(table)?
            .row(uuid)
            .ok_or_else(|| Error::row_not_found(table, "uuid", uuid))
    }

    fn touch(&mut self, key: RowKey, version: u64) {
        if !self.inserted.contains(&key) {
            self.touched.entry(key.clone()).or_insert(version);
        }
        self.written.insert(key);
    }
}

impl TxnHandle for IdlTransaction<'_> {
    fn database(&self) -> &Database {
        &self.working
    }

    fn insert(&mut self, table: &str) -> Result<Uuid> {
        let rows = self.working.table_mut(table)?;
        let uuid = Uuid::new_v4();
        rows.insert(Row::new(Arc::clone(rows.schema()), uuid));
        let key = (table.to_string(), uuid);
        self.inserted.insert(key.clone());
        self.written.insert(key);
        Ok(uuid)
    }

    fn set(&mut self, table: &str, row: &Uuid, column: &str, datum: Datum) -> Result<()> {
        let version = self.existing_row(table, row)?.version();
        if let Some(target) = self.working.table_mut(table)?.row_mut(row) {
            target.set(column, datum)?;
        }
        self.touch((table.to_string(), *row), version);
        Ok(())
    }

    fn delete(&mut self, table: &str, row: &Uuid) -> Result<()> {
        let version = self.existing_row(table, row)?.version();
        self.working.table_mut(table)?.remove(row);
        let key = (table.to_string(), *row);
        if self.inserted.remove(&key) {
            // never reached the mirror, nothing to delete there
            self.written.remove(&key);
        } else {
            self.touch(key, version);
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }

    fn commit_block(&mut self) -> CommitStatus {
        if let Some(status) = &self.status {
            return status.clone();
        }
        let idl = self.idl;
        let status = idl.commit(self);
        self.status = Some(status.clone());
        status
    }

    fn error(&self) -> Option<String> {
        self.error.clone()
    }

    fn real_uuid(&self, temp: &Uuid) -> Option<Uuid> {
        self.real_uuids.get(temp).copied()
    }
}
