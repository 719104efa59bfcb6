//! # Index Store
//!
//! Ordered, transactional key-value storage over three keyspaces.
//!
//! Every engine operation runs inside exactly one closure handed to
//! [`IndexStore::read`] or [`IndexStore::write`]. A write closure that
//! returns `Err` leaves the store untouched; a store fault during commit
//! does the same. Keys compare byte-lexicographically, and reads inside a
//! write transaction observe that transaction's earlier writes.
//!
//! ## Backends
//!
//! - [`RedbStore`]: disk-backed, MVCC readers and a single writer
//! - [`MemoryStore`]: volatile `BTreeMap`s with an undo journal
//! - [`StorageBackend`]: either of the above, chosen at startup

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::{Keyspace, TagError};
use std::path::Path;

/// One `(key, value)` entry yielded by a scan.
pub type ScanItem = Result<(Vec<u8>, Vec<u8>), TagError>;

/// Lazy ascending scan. Dropping it stops the scan.
pub type Scan<'a> = Box<dyn Iterator<Item = ScanItem> + 'a>;

// =============================================================================
// TRANSACTION VIEWS
// =============================================================================

/// Read access to a consistent view of all keyspaces.
pub trait ReadTxn {
    /// Value stored under `key`, if any.
    fn get(&self, space: Keyspace, key: &[u8]) -> Result<Option<Vec<u8>>, TagError>;

    /// All entries with key `>= from`, in ascending key order.
    fn scan<'a>(&'a self, space: Keyspace, from: &'a [u8]) -> Result<Scan<'a>, TagError>;
}

/// Write access; only handed out inside [`IndexStore::write`].
pub trait WriteTxn: ReadTxn {
    /// Insert or overwrite `key`.
    fn put(&mut self, space: Keyspace, key: &[u8], value: &[u8]) -> Result<(), TagError>;

    /// Remove `key`. Returns whether it was present; absence is not an error.
    fn delete(&mut self, space: Keyspace, key: &[u8]) -> Result<bool, TagError>;
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// A store that runs closures as atomic transactions.
///
/// Writers are serialized by the store: at most one write closure runs at
/// a time, and it never observes another writer's partial state.
pub trait IndexStore {
    /// Run `f` against a read-only snapshot.
    fn read<T, F>(&self, f: F) -> Result<T, TagError>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, TagError>;

    /// Run `f` in a write transaction; commit on `Ok`, roll back on `Err`.
    fn write<T, F>(&self, f: F) -> Result<T, TagError>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, TagError>;
}

/// Entries whose key starts with `prefix`, stopping at the first that does not.
pub fn scan_prefix<'a, T>(
    txn: &'a T,
    space: Keyspace,
    prefix: &'a [u8],
) -> Result<impl Iterator<Item = ScanItem> + 'a, TagError>
where
    T: ReadTxn + ?Sized,
{
    Ok(txn
        .scan(space, prefix)?
        .take_while(move |entry| match entry {
            Ok((key, _)) => key.starts_with(prefix),
            Err(_) => true,
        }))
}

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Storage backend chosen at startup.
#[derive(Debug)]
pub enum StorageBackend {
    /// Volatile in-memory maps.
    InMemory(MemoryStore),
    /// Disk-backed redb database.
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open (or create) a redb database at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, TagError> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

impl IndexStore for StorageBackend {
    fn read<T, F>(&self, f: F) -> Result<T, TagError>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, TagError>,
    {
        match self {
            Self::InMemory(store) => store.read(f),
            Self::Persistent(store) => store.read(f),
        }
    }

    fn write<T, F>(&self, f: F) -> Result<T, TagError>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, TagError>,
    {
        match self {
            Self::InMemory(store) => store.write(f),
            Self::Persistent(store) => store.write(f),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed(store: &impl IndexStore) {
        store
            .write(|txn| {
                let keys: [&[u8]; 4] = [b"a\"x\"", b"ab\"y\"", b"b\"z\"", b"aa\"w\""];
                for key in keys {
                    txn.put(Keyspace::Forward, key, &[])?;
                }
                Ok(())
            })
            .unwrap();
    }

    fn prefix_keys(store: &impl IndexStore, prefix: &[u8]) -> Vec<Vec<u8>> {
        store
            .read(|txn| {
                scan_prefix(txn, Keyspace::Forward, prefix)?
                    .map(|entry| entry.map(|(key, _)| key))
                    .collect()
            })
            .unwrap()
    }

    #[test]
    fn scan_prefix_stops_at_first_foreign_key() {
        let store = StorageBackend::default();
        seed(&store);

        assert_eq!(prefix_keys(&store, b"a\""), vec![b"a\"x\"".to_vec()]);
        assert_eq!(
            prefix_keys(&store, b"a"),
            vec![b"a\"x\"".to_vec(), b"aa\"w\"".to_vec(), b"ab\"y\"".to_vec()]
        );
        assert!(prefix_keys(&store, b"c").is_empty());
    }

    #[test]
    fn backends_agree_on_ordering() {
        let temp = tempdir().expect("temp dir");
        let disk = StorageBackend::with_redb(temp.path().join("order.redb")).unwrap();
        let memory = StorageBackend::default();
        assert!(disk.is_persistent());
        assert!(!memory.is_persistent());

        seed(&disk);
        seed(&memory);
        assert_eq!(prefix_keys(&disk, b""), prefix_keys(&memory, b""));
    }
}
