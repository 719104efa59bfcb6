//! # redb-backed Index Store
//!
//! A disk-backed index store using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! Each keyspace is one redb table of raw byte keys and values:
//! `trid2tag`, `tag2trid` and `tagCounts`.

use super::{IndexStore, ReadTxn, Scan, WriteTxn};
use crate::types::store_fault;
use crate::{Keyspace, TagError};
use redb::{
    Database, ReadOnlyTable, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table,
    TableDefinition,
};
use std::path::Path;

/// Forward index: `id ++ quoted(tag)` -> empty
const FORWARD: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new(Keyspace::Forward.table_name());

/// Reverse index: `quoted(tag) ++ id` -> empty
const REVERSE: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new(Keyspace::Reverse.table_name());

/// Count table: tag -> big-endian u32
const COUNT: TableDefinition<&[u8], &[u8]> = TableDefinition::new(Keyspace::Count.table_name());

type BytesTable<'txn> = Table<'txn, &'static [u8], &'static [u8]>;
type BytesReadTable = ReadOnlyTable<&'static [u8], &'static [u8]>;

// =============================================================================
// STORE
// =============================================================================

/// A disk-backed index store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create an index database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TagError> {
        let db = Database::create(path.as_ref()).map_err(store_fault)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(store_fault)?;
            for definition in [FORWARD, REVERSE, COUNT] {
                let _ = write_txn.open_table(definition).map_err(store_fault)?;
            }
            write_txn.commit().map_err(store_fault)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<bool, TagError> {
        self.db.compact().map_err(store_fault)
    }

    /// Number of entries in one keyspace.
    pub fn len(&self, space: Keyspace) -> Result<u64, TagError> {
        let read_txn = self.db.begin_read().map_err(store_fault)?;
        let table = read_txn
            .open_table(definition(space))
            .map_err(store_fault)?;
        table.len().map_err(store_fault)
    }
}

fn definition(space: Keyspace) -> TableDefinition<'static, &'static [u8], &'static [u8]> {
    match space {
        Keyspace::Forward => FORWARD,
        Keyspace::Reverse => REVERSE,
        Keyspace::Count => COUNT,
    }
}

// =============================================================================
// TRANSACTION VIEWS
// =============================================================================

struct RedbReader {
    forward: BytesReadTable,
    reverse: BytesReadTable,
    count: BytesReadTable,
}

impl RedbReader {
    fn table(&self, space: Keyspace) -> &BytesReadTable {
        match space {
            Keyspace::Forward => &self.forward,
            Keyspace::Reverse => &self.reverse,
            Keyspace::Count => &self.count,
        }
    }
}

impl ReadTxn for RedbReader {
    fn get(&self, space: Keyspace, key: &[u8]) -> Result<Option<Vec<u8>>, TagError> {
        Ok(self
            .table(space)
            .get(key)
            .map_err(store_fault)?
            .map(|value| value.value().to_vec()))
    }

    fn scan<'a>(&'a self, space: Keyspace, from: &'a [u8]) -> Result<Scan<'a>, TagError> {
        let range = self.table(space).range(from..).map_err(store_fault)?;
        Ok(Box::new(range.map(|entry| {
            let (key, value) = entry.map_err(store_fault)?;
            Ok((key.value().to_vec(), value.value().to_vec()))
        })))
    }
}

struct RedbWriter<'txn> {
    forward: BytesTable<'txn>,
    reverse: BytesTable<'txn>,
    count: BytesTable<'txn>,
}

impl<'txn> RedbWriter<'txn> {
    fn table(&self, space: Keyspace) -> &BytesTable<'txn> {
        match space {
            Keyspace::Forward => &self.forward,
            Keyspace::Reverse => &self.reverse,
            Keyspace::Count => &self.count,
        }
    }

    fn table_mut(&mut self, space: Keyspace) -> &mut BytesTable<'txn> {
        match space {
            Keyspace::Forward => &mut self.forward,
            Keyspace::Reverse => &mut self.reverse,
            Keyspace::Count => &mut self.count,
        }
    }
}

impl ReadTxn for RedbWriter<'_> {
    fn get(&self, space: Keyspace, key: &[u8]) -> Result<Option<Vec<u8>>, TagError> {
        Ok(self
            .table(space)
            .get(key)
            .map_err(store_fault)?
            .map(|value| value.value().to_vec()))
    }

    fn scan<'a>(&'a self, space: Keyspace, from: &'a [u8]) -> Result<Scan<'a>, TagError> {
        let range = self.table(space).range(from..).map_err(store_fault)?;
        Ok(Box::new(range.map(|entry| {
            let (key, value) = entry.map_err(store_fault)?;
            Ok((key.value().to_vec(), value.value().to_vec()))
        })))
    }
}

impl WriteTxn for RedbWriter<'_> {
    fn put(&mut self, space: Keyspace, key: &[u8], value: &[u8]) -> Result<(), TagError> {
        self.table_mut(space)
            .insert(key, value)
            .map_err(store_fault)?;
        Ok(())
    }

    fn delete(&mut self, space: Keyspace, key: &[u8]) -> Result<bool, TagError> {
        let previous = self.table_mut(space).remove(key).map_err(store_fault)?;
        Ok(previous.is_some())
    }
}

// =============================================================================
// INDEXSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl IndexStore for RedbStore {
    fn read<T, F>(&self, f: F) -> Result<T, TagError>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, TagError>,
    {
        let read_txn = self.db.begin_read().map_err(store_fault)?;
        let reader = RedbReader {
            forward: read_txn.open_table(FORWARD).map_err(store_fault)?,
            reverse: read_txn.open_table(REVERSE).map_err(store_fault)?,
            count: read_txn.open_table(COUNT).map_err(store_fault)?,
        };
        f(&reader)
    }

    fn write<T, F>(&self, f: F) -> Result<T, TagError>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, TagError>,
    {
        let write_txn = self.db.begin_write().map_err(store_fault)?;

        let result = {
            let mut writer = RedbWriter {
                forward: write_txn.open_table(FORWARD).map_err(store_fault)?,
                reverse: write_txn.open_table(REVERSE).map_err(store_fault)?,
                count: write_txn.open_table(COUNT).map_err(store_fault)?,
            };
            f(&mut writer)
        };

        match result {
            Ok(value) => {
                write_txn.commit().map_err(store_fault)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = write_txn.abort() {
                    tracing::warn!(error = %abort, "failed to abort write transaction");
                }
                Err(e)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
