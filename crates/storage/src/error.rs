//! Error types for the storage layer

use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors raised by a storage backend
///
/// Backends map their native failures onto these variants. The engine
/// propagates them verbatim and never retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// A transaction could not be started, committed or rolled back
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A write was attempted through a read-only handle
    #[error("Write attempted on a read-only transaction")]
    ReadOnly,

    /// Backend-specific failure (I/O, corruption, iterator failure)
    #[error("Storage error: {0}")]
    Internal(String),
}
