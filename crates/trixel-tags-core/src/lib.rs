//! # trixel-tags-core
//!
//! The association index for trixel-tags - THE INDEX.
//!
//! This crate maintains a many-to-many relation between numeric trixel ids
//! and free-text tags inside an ordered key-value store, and answers
//! lookups in both directions plus a tag inventory with occurrence counts.
//!
//! ## Layers
//!
//! - `codec`: unambiguous byte keys for `(id, tag)` pairs
//! - `storage`: transactional ordered keyspaces (redb or in-memory)
//! - `engine`: `associate`, `dissociate`, `tags_of`, `ids_of`, `all_tags`
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Has NO async, NO network dependencies (pure Rust)
//! - Runs every operation as one atomic store transaction
//! - Never retries and never repairs; every error reaches the caller
//! - Does not check id syntax beyond what the key encoding requires
//!
//! ```
//! use trixel_tags_core::TagEngine;
//!
//! let engine = TagEngine::in_memory();
//! engine.associate("42", "red")?;
//! engine.associate("42", "blue")?;
//! assert_eq!(engine.tags_of("42")?, vec!["blue", "red"]);
//! # Ok::<(), trixel_tags_core::TagError>(())
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod codec;
pub mod engine;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use engine::TagEngine;
pub use storage::{
    IndexStore, MemoryStore, ReadTxn, RedbStore, Scan, ScanItem, StorageBackend, WriteTxn,
    scan_prefix,
};
pub use types::{Discrepancy, Keyspace, Stats, TagError, VerifyReport};
