//! # Association Engine
//!
//! The five operations on the trixel/tag relation, plus read-only
//! inspection helpers. Each public method is exactly one store transaction.
//!
//! ## Invariants (outside an in-flight transaction)
//!
//! - `(id, tag)` is in the forward index iff it is in the reverse index.
//! - The count table holds `tag` iff at least one id carries it, and its
//!   value equals the number of such ids.
//!
//! `associate` is idempotent: re-associating an existing pair writes
//! nothing. `dissociate` of an absent pair leaves the count untouched but
//! still requires the tag to be counted. A pair found in only one index is
//! reported as [`TagError::IndexMismatch`] and never repaired here.
//!
//! ## Ordering
//!
//! - `tags_of`: lexicographic on the quoted tag bytes
//! - `ids_of`: lexicographic on raw id bytes, so `"10"` sorts before `"2"`
//! - `all_tags`: lexicographic on raw tag bytes

use crate::codec;
use crate::storage::{IndexStore, ReadTxn, StorageBackend, WriteTxn, scan_prefix};
use crate::{Discrepancy, Keyspace, Stats, TagError, VerifyReport};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, warn};

/// The association engine over an index store.
#[derive(Debug, Default)]
pub struct TagEngine<S = StorageBackend> {
    store: S,
}

impl TagEngine<StorageBackend> {
    /// Engine over a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(StorageBackend::default())
    }

    /// Engine over a redb database at `path`, created if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TagError> {
        Ok(Self::new(StorageBackend::with_redb(path)?))
    }
}

impl<S: IndexStore> TagEngine<S> {
    /// Wrap an already-opened store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Record that `id` carries `tag`.
    pub fn associate(&self, id: &str, tag: &str) -> Result<(), TagError> {
        codec::check_id(id)?;
        let forward = codec::encode_forward(id, tag);
        let reverse = codec::encode_reverse(id, tag);

        self.store.write(|txn| {
            let in_forward = txn.get(Keyspace::Forward, &forward)?.is_some();
            let in_reverse = txn.get(Keyspace::Reverse, &reverse)?.is_some();
            match (in_forward, in_reverse) {
                (true, true) => {
                    debug!(id, tag, "already associated");
                    return Ok(());
                }
                (false, false) => {}
                (in_forward, in_reverse) => {
                    return Err(mismatch(id, tag, in_forward, in_reverse));
                }
            }

            txn.put(Keyspace::Forward, &forward, &[])?;
            txn.put(Keyspace::Reverse, &reverse, &[])?;
            let count = read_count(&*txn, tag)?.unwrap_or(0).saturating_add(1);
            write_count(txn, tag, count)?;
            debug!(id, tag, count, "associated");
            Ok(())
        })
    }

    /// Remove the association between `id` and `tag`.
    pub fn dissociate(&self, id: &str, tag: &str) -> Result<(), TagError> {
        codec::check_id(id)?;
        let forward = codec::encode_forward(id, tag);
        let reverse = codec::encode_reverse(id, tag);

        self.store.write(|txn| {
            let in_forward = txn.delete(Keyspace::Forward, &forward)?;
            let in_reverse = txn.delete(Keyspace::Reverse, &reverse)?;
            if in_forward != in_reverse {
                return Err(mismatch(id, tag, in_forward, in_reverse));
            }

            let Some(count) = read_count(&*txn, tag)? else {
                warn!(id, tag, "dissociate on a tag with no count entry");
                return Err(TagError::MissingCount(tag.to_string()));
            };

            if !in_forward {
                debug!(id, tag, "not associated, count unchanged");
                return Ok(());
            }

            if count <= 1 {
                txn.delete(Keyspace::Count, codec::encode_count(tag))?;
                debug!(id, tag, "dissociated last id, tag removed");
            } else {
                write_count(txn, tag, count - 1)?;
                debug!(id, tag, count = count - 1, "dissociated");
            }
            Ok(())
        })
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    /// Tags carried by `id`, in quoted-tag order. Empty if none.
    pub fn tags_of(&self, id: &str) -> Result<Vec<String>, TagError> {
        codec::check_id(id)?;
        let prefix = codec::forward_prefix(id);

        self.store.read(|txn| {
            scan_prefix(txn, Keyspace::Forward, &prefix)?
                .map(|entry| {
                    let (key, _) = entry?;
                    codec::decode_forward_suffix(&key, id.len())
                })
                .collect()
        })
    }

    /// Ids carrying `tag`, in raw byte order. Empty if none.
    pub fn ids_of(&self, tag: &str) -> Result<Vec<String>, TagError> {
        let prefix = codec::reverse_prefix(tag);

        self.store.read(|txn| {
            scan_prefix(txn, Keyspace::Reverse, &prefix)?
                .map(|entry| {
                    let (key, _) = entry?;
                    codec::decode_reverse_prefix(&key, prefix.len())
                })
                .collect()
        })
    }

    /// Every tag with at least one association, in raw byte order.
    pub fn all_tags(&self) -> Result<Vec<String>, TagError> {
        self.store.read(|txn| {
            txn.scan(Keyspace::Count, b"")?
                .map(|entry| {
                    let (key, _) = entry?;
                    tag_from_key(key)
                })
                .collect()
        })
    }

    /// Recorded occurrence count of `tag`, `None` if the tag is unused.
    pub fn count_of(&self, tag: &str) -> Result<Option<u32>, TagError> {
        self.store.read(|txn| read_count(txn, tag))
    }

    /// The whole count table, in raw tag byte order.
    pub fn tag_counts(&self) -> Result<Vec<(String, u32)>, TagError> {
        self.store.read(|txn| {
            txn.scan(Keyspace::Count, b"")?
                .map(|entry| -> Result<(String, u32), TagError> {
                    let (key, value) = entry?;
                    let tag = tag_from_key(key)?;
                    let count = decode_count(&tag, &value)?;
                    Ok((tag, count))
                })
                .collect()
        })
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    /// Association and tag totals.
    pub fn stats(&self) -> Result<Stats, TagError> {
        self.store.read(|txn| {
            let mut stats = Stats::default();
            for entry in txn.scan(Keyspace::Forward, b"")? {
                entry?;
                stats.associations += 1;
            }
            for entry in txn.scan(Keyspace::Count, b"")? {
                entry?;
                stats.tags += 1;
            }
            Ok(stats)
        })
    }

    /// Check both indices and the count table against each other.
    ///
    /// Read-only: discrepancies are reported, never fixed. A key that does
    /// not decode at all aborts the check with [`TagError::Codec`].
    pub fn verify(&self) -> Result<VerifyReport, TagError> {
        self.store.read(|txn| {
            let forward = collect_pairs(txn, Keyspace::Forward, codec::split_forward)?;
            let reverse = collect_pairs(txn, Keyspace::Reverse, codec::split_reverse)?;

            let mut counts = BTreeMap::new();
            for entry in txn.scan(Keyspace::Count, b"")? {
                let (key, value) = entry?;
                let tag = tag_from_key(key)?;
                let count = decode_count(&tag, &value)?;
                counts.insert(tag, count);
            }

            let mut discrepancies = Vec::new();
            for (id, tag) in forward.difference(&reverse) {
                discrepancies.push(Discrepancy::MissingReverse {
                    id: id.clone(),
                    tag: tag.clone(),
                });
            }
            for (id, tag) in reverse.difference(&forward) {
                discrepancies.push(Discrepancy::MissingForward {
                    id: id.clone(),
                    tag: tag.clone(),
                });
            }

            let mut actual: BTreeMap<&str, usize> = BTreeMap::new();
            for (_, tag) in &forward {
                *actual.entry(tag.as_str()).or_default() += 1;
            }
            for (&tag, &n) in &actual {
                match counts.get(tag) {
                    None => discrepancies.push(Discrepancy::MissingCount {
                        tag: tag.to_string(),
                        actual: n,
                    }),
                    Some(&recorded) if recorded as usize != n => {
                        discrepancies.push(Discrepancy::CountMismatch {
                            tag: tag.to_string(),
                            recorded,
                            actual: n,
                        });
                    }
                    Some(_) => {}
                }
            }
            for (tag, &recorded) in &counts {
                if !actual.contains_key(tag.as_str()) {
                    discrepancies.push(Discrepancy::OrphanCount {
                        tag: tag.clone(),
                        recorded,
                    });
                }
            }

            if !discrepancies.is_empty() {
                warn!(found = discrepancies.len(), "index verification failed");
            }
            Ok(VerifyReport {
                stats: Stats {
                    associations: forward.len(),
                    tags: counts.len(),
                },
                discrepancies,
            })
        })
    }
}

// =============================================================================
// TRANSACTION HELPERS
// =============================================================================

fn read_count<T: ReadTxn + ?Sized>(txn: &T, tag: &str) -> Result<Option<u32>, TagError> {
    txn.get(Keyspace::Count, codec::encode_count(tag))?
        .map(|value| decode_count(tag, &value))
        .transpose()
}

fn write_count<T: WriteTxn + ?Sized>(txn: &mut T, tag: &str, count: u32) -> Result<(), TagError> {
    txn.put(Keyspace::Count, codec::encode_count(tag), &count.to_be_bytes())
}

fn decode_count(tag: &str, value: &[u8]) -> Result<u32, TagError> {
    <[u8; 4]>::try_from(value)
        .map(u32::from_be_bytes)
        .map_err(|_| TagError::CorruptCount {
            tag: tag.to_string(),
            len: value.len(),
        })
}

fn tag_from_key(key: Vec<u8>) -> Result<String, TagError> {
    String::from_utf8(key).map_err(|e| TagError::Codec(format!("count key is not UTF-8: {e}")))
}

fn collect_pairs<T, F>(
    txn: &T,
    space: Keyspace,
    split: F,
) -> Result<BTreeSet<(String, String)>, TagError>
where
    T: ReadTxn + ?Sized,
    F: Fn(&[u8]) -> Result<(String, String), TagError>,
{
    txn.scan(space, b"")?
        .map(|entry| {
            let (key, _) = entry?;
            split(&key)
        })
        .collect()
}

fn mismatch(id: &str, tag: &str, forward: bool, reverse: bool) -> TagError {
    warn!(id, tag, forward, reverse, "forward and reverse indices disagree");
    TagError::IndexMismatch {
        id: id.to_string(),
        tag: tag.to_string(),
        forward,
        reverse,
    }
}

// =============================================================================
// TESTS
// =============================================================================
