//! # In-Memory Index Store
//!
//! Volatile backend over `BTreeMap`s, used for tests and `--backend memory`.
//!
//! Writers hold the write half of an `RwLock` for the whole transaction and
//! mutate the live maps through a [`Journal`], which records the previous
//! value of every key it touches. When the closure returns `Err` the journal
//! is replayed backwards, so a write costs O(keys changed), not O(store).
//! A panic inside the closure poisons the lock and every later call fails.

use super::{IndexStore, ReadTxn, Scan, WriteTxn};
use crate::{Keyspace, TagError};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

type Space = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug, Default)]
struct Spaces {
    forward: Space,
    reverse: Space,
    count: Space,
}

impl Spaces {
    fn space(&self, space: Keyspace) -> &Space {
        match space {
            Keyspace::Forward => &self.forward,
            Keyspace::Reverse => &self.reverse,
            Keyspace::Count => &self.count,
        }
    }

    fn space_mut(&mut self, space: Keyspace) -> &mut Space {
        match space {
            Keyspace::Forward => &mut self.forward,
            Keyspace::Reverse => &mut self.reverse,
            Keyspace::Count => &mut self.count,
        }
    }
}

impl ReadTxn for Spaces {
    fn get(&self, space: Keyspace, key: &[u8]) -> Result<Option<Vec<u8>>, TagError> {
        Ok(self.space(space).get(key).cloned())
    }

    fn scan<'a>(&'a self, space: Keyspace, from: &'a [u8]) -> Result<Scan<'a>, TagError> {
        let range = self
            .space(space)
            .range::<[u8], _>((Bound::Included(from), Bound::Unbounded));
        Ok(Box::new(
            range.map(|(key, value)| Ok((key.clone(), value.clone()))),
        ))
    }
}

type Undo = (Keyspace, Vec<u8>, Option<Vec<u8>>);

/// Write view over the live maps that remembers how to undo itself.
struct Journal<'a> {
    spaces: &'a mut Spaces,
    undo: Vec<Undo>,
}

impl<'a> Journal<'a> {
    fn new(spaces: &'a mut Spaces) -> Self {
        Self {
            spaces,
            undo: Vec::new(),
        }
    }

    fn rollback(self) {
        for (space, key, previous) in self.undo.into_iter().rev() {
            let map = self.spaces.space_mut(space);
            match previous {
                Some(value) => map.insert(key, value),
                None => map.remove(&key),
            };
        }
    }
}

impl ReadTxn for Journal<'_> {
    fn get(&self, space: Keyspace, key: &[u8]) -> Result<Option<Vec<u8>>, TagError> {
        self.spaces.get(space, key)
    }

    fn scan<'a>(&'a self, space: Keyspace, from: &'a [u8]) -> Result<Scan<'a>, TagError> {
        self.spaces.scan(space, from)
    }
}

impl WriteTxn for Journal<'_> {
    fn put(&mut self, space: Keyspace, key: &[u8], value: &[u8]) -> Result<(), TagError> {
        let previous = self
            .spaces
            .space_mut(space)
            .insert(key.to_vec(), value.to_vec());
        self.undo.push((space, key.to_vec(), previous));
        Ok(())
    }

    fn delete(&mut self, space: Keyspace, key: &[u8]) -> Result<bool, TagError> {
        match self.spaces.space_mut(space).remove(key) {
            Some(previous) => {
                self.undo.push((space, key.to_vec(), Some(previous)));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// A volatile index store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    spaces: RwLock<Spaces>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> TagError {
    TagError::Store("memory store lock poisoned".to_string())
}

impl IndexStore for MemoryStore {
    fn read<T, F>(&self, f: F) -> Result<T, TagError>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, TagError>,
    {
        let spaces = self.spaces.read().map_err(|_| poisoned())?;
        f(&*spaces)
    }

    fn write<T, F>(&self, f: F) -> Result<T, TagError>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, TagError>,
    {
        let mut live = self.spaces.write().map_err(|_| poisoned())?;
        let mut journal = Journal::new(&mut *live);
        match f(&mut journal) {
            Ok(value) => Ok(value),
            Err(e) => {
                journal.rollback();
                Err(e)
            }
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

    #[test]
    fn write_is_visible_inside_transaction() {
        let store = MemoryStore::new();
        let seen = store
            .write(|txn| {
                txn.put(Keyspace::Count, b"red", &1u32.to_be_bytes())?;
                txn.get(Keyspace::Count, b"red")
            })
            .unwrap();
        assert_eq!(seen, Some(1u32.to_be_bytes().to_vec()));
    }

    #[test]
    fn failed_write_leaves_no_trace() {
        let store = MemoryStore::new();
        let result: Result<(), TagError> = store.write(|txn| {
            txn.put(Keyspace::Forward, b"1\"x\"", &[])?;
            txn.put(Keyspace::Reverse, b"\"x\"1", &[])?;
            Err(TagError::Store("injected".to_string()))
        });
        assert!(matches!(result, Err(TagError::Store(_))));

        let empty = store
            .read(|txn| {
                Ok(txn.scan(Keyspace::Forward, b"")?.next().is_none()
                    && txn.scan(Keyspace::Reverse, b"")?.next().is_none())
            })
            .unwrap();
        assert!(empty);
    }

    #[test]
    fn failed_write_restores_overwritten_and_deleted_keys() {
        let store = MemoryStore::new();
        store
            .write(|txn| {
                txn.put(Keyspace::Count, b"red", &2u32.to_be_bytes())?;
                txn.put(Keyspace::Forward, b"1\"red\"", &[])
            })
            .unwrap();

        let result: Result<(), TagError> = store.write(|txn| {
            txn.put(Keyspace::Count, b"red", &3u32.to_be_bytes())?;
            txn.put(Keyspace::Count, b"red", &4u32.to_be_bytes())?;
            txn.delete(Keyspace::Forward, b"1\"red\"")?;
            txn.put(Keyspace::Forward, b"2\"red\"", &[])?;
            Err(TagError::Store("injected".to_string()))
        });
        assert!(result.is_err());

        let (count, kept, added) = store
            .read(|txn| {
                Ok((
                    txn.get(Keyspace::Count, b"red")?,
                    txn.get(Keyspace::Forward, b"1\"red\"")?,
                    txn.get(Keyspace::Forward, b"2\"red\"")?,
                ))
            })
            .unwrap();
        assert_eq!(count, Some(2u32.to_be_bytes().to_vec()));
        assert_eq!(kept, Some(Vec::new()));
        assert_eq!(added, None);
    }

    #[test]
    fn delete_reports_presence() {
        let store = MemoryStore::new();
        let (first, second) = store
            .write(|txn| {
                txn.put(Keyspace::Forward, b"k", &[])?;
                Ok((
                    txn.delete(Keyspace::Forward, b"k")?,
                    txn.delete(Keyspace::Forward, b"k")?,
                ))
            })
            .unwrap();
        assert!(first);
        assert!(!second);
    }

    #[test]
    fn keyspaces_are_isolated() {
        let store = MemoryStore::new();
        store
            .write(|txn| txn.put(Keyspace::Forward, b"same", b"f"))
            .unwrap();
        let other = store
            .read(|txn| txn.get(Keyspace::Reverse, b"same"))
            .unwrap();
        assert_eq!(other, None);
    }
}
