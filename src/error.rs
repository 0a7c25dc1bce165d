//! Error types returned by the cache.
//!
//! Every failure is handed back to the immediate caller. Nothing in the
//! store logs or swallows an error it returns.

use std::io;
use thiserror::Error;

/// Errors that can occur while operating on the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// `add` was called on a key that holds a live entry
    #[error("item {0} already exists")]
    AlreadyExists(String),

    /// `replace` was called on a key without a live entry
    #[error("item {0} does not exist")]
    NotFound(String),

    /// The entry map could not be encoded, or the encoded bytes could not
    /// be written to the output stream
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[source] bincode::Error),

    /// The input stream did not contain a well-formed snapshot
    #[error("snapshot deserialization failed: {0}")]
    Deserialization(#[source] bincode::Error),

    /// A snapshot file could not be opened, created or synced
    #[error("snapshot file error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CacheError>;
