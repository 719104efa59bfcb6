//! # Core Type Definitions
//!
//! This module contains the shared types of the trixel-tags core:
//! - The keyspace selector (`Keyspace`)
//! - Index health output (`Stats`, `VerifyReport`, `Discrepancy`)
//! - Error types (`TagError`)
//!
//! Ids and tags cross the core boundary as plain `&str` / `String`.
//! The core never interprets an id beyond the byte-level rules the key
//! encoding needs.

use thiserror::Error;

// =============================================================================
// KEYSPACES
// =============================================================================

/// One of the three named keyspaces held by an index store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Keyspace {
    /// `id ++ quoted(tag)` -> empty marker.
    Forward,
    /// `quoted(tag) ++ id` -> empty marker.
    Reverse,
    /// raw tag bytes -> big-endian `u32` occurrence count.
    Count,
}

impl Keyspace {
    /// All keyspaces, in a fixed order.
    pub const ALL: [Keyspace; 3] = [Keyspace::Forward, Keyspace::Reverse, Keyspace::Count];

    /// Persistent table name, following the bucket names `trid2tag`,
    /// `tag2trid` and `tagCounts`. Only the names carry over; the file
    /// format is redb's own.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Keyspace::Forward => "trid2tag",
            Keyspace::Reverse => "tag2trid",
            Keyspace::Count => "tagCounts",
        }
    }
}

// =============================================================================
// INDEX HEALTH
// =============================================================================

/// Size of the relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    /// Number of (id, tag) pairs in the forward index.
    pub associations: usize,
    /// Number of entries in the count table.
    pub tags: usize,
}

/// A single inconsistency found by [`crate::TagEngine::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// Forward entry with no mirrored reverse entry.
    MissingReverse { id: String, tag: String },
    /// Reverse entry with no mirrored forward entry.
    MissingForward { id: String, tag: String },
    /// Count table value differs from the number of associated ids.
    CountMismatch {
        tag: String,
        recorded: u32,
        actual: usize,
    },
    /// Tag has associations but no count table entry.
    MissingCount { tag: String, actual: usize },
    /// Count table entry for a tag with no associations.
    OrphanCount { tag: String, recorded: u32 },
}

/// Result of a full consistency check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerifyReport {
    pub stats: Stats,
    pub discrepancies: Vec<Discrepancy>,
}

impl VerifyReport {
    /// True when both indices mirror each other and every count is exact.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the trixel-tags core.
///
/// - No silent failures: every variant aborts the enclosing transaction
/// - Nothing is repaired automatically
/// - The core never retries; callers decide
#[derive(Debug, Error)]
pub enum TagError {
    /// The id is empty or contains the tag quote delimiter.
    #[error("Invalid trixel id: {0:?}")]
    InvalidId(String),

    /// A stored key does not decode under the quoting grammar.
    #[error("Codec error: {0}")]
    Codec(String),

    /// The underlying store failed; the transaction was rolled back.
    #[error("Store fault: {0}")]
    Store(String),

    /// Dissociate was called for a tag that has no count table entry.
    #[error("Tag was never counted: {0:?}")]
    MissingCount(String),

    /// A count table value is not a 4-byte big-endian integer.
    #[error("Corrupt count for tag {tag:?}: {len} bytes")]
    CorruptCount { tag: String, len: usize },

    /// The pair is present in one index but not the other.
    #[error("Index mismatch for ({id:?}, {tag:?}): forward={forward}, reverse={reverse}")]
    IndexMismatch {
        id: String,
        tag: String,
        forward: bool,
        reverse: bool,
    },
}

/// Convert any backend error into a store fault.
pub(crate) fn store_fault(e: impl std::fmt::Display) -> TagError {
    TagError::Store(e.to_string())
}

// =============================================================================
// TESTS
// =============================================================================
