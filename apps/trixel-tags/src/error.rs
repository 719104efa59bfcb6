//! # Application Errors
//!
//! Everything the CLI and server can fail with. Index errors pass through
//! unchanged as [`AppError::Index`].

use thiserror::Error;
use trixel_tags_core::TagError;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Error reported by the index.
    #[error(transparent)]
    Index(#[from] TagError),

    /// Configuration file or environment value could not be used.
    #[error("configuration error: {0}")]
    Config(String),

    /// Trixel id is not a string of ASCII digits.
    #[error("invalid trid: {0:?}")]
    InvalidTrid(String),

    /// Filesystem or socket failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// `verify` found discrepancies between the indices.
    #[error("index is inconsistent: {0} discrepancies")]
    Inconsistent(usize),
}
