//! Error types for the query engine
//!
//! Every fallible engine operation returns [`Result`]. Storage and codec
//! failures are wrapped unchanged; the remaining variants describe caller
//! mistakes and are raised before any scan starts.
//!
//! A missing record is not an error: `get` returns `None`. Only hydrating
//! an id produced by a scan reports [`Error::EntityNotFound`].

use thiserror::Error;
use tormenta_core::{CodecError, Id};
use tormenta_storage::StorageError;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Underlying store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Value or key could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Malformed query predicate
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    /// Value kinds do not line up
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Index name not declared (or not indexed) in the entity schema
    #[error("Field {0} could not be found")]
    UnknownIndex(String),

    /// Aggregation requested over a non-numeric index
    #[error("Index {0} is not numeric")]
    NotNumeric(String),

    /// Invalid argument to an engine operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Entity payload could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Scan produced an id whose record no longer exists
    #[error("Could not retrieve entity {0}")]
    EntityNotFound(Id),

    /// A `pre_save` hook refused the entity
    #[error("Save rejected: {0}")]
    Rejected(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an invalid predicate error
    pub fn invalid_predicate(msg: impl Into<String>) -> Self {
        Error::InvalidPredicate(msg.into())
    }

    /// Create a type mismatch error
    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Error::TypeMismatch(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a rejected save error, for `pre_save` hooks
    pub fn rejected(msg: impl Into<String>) -> Self {
        Error::Rejected(msg.into())
    }

    /// Whether the error was caused by the caller rather than the store
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPredicate(_)
                | Error::TypeMismatch(_)
                | Error::UnknownIndex(_)
                | Error::NotNumeric(_)
                | Error::InvalidInput(_)
                | Error::Rejected(_)
        )
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
