//! Codec error types
//!
//! Failures of the value and key codecs. We use `thiserror` for the
//! `Display` and `Error` implementations.

use thiserror::Error;

use crate::value::ValueKind;

/// Result type alias for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Errors raised while encoding, decoding or converting values and keys
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Encoded value has the wrong number of bytes for its kind
    #[error("Cannot decode {kind}: expected {expected} bytes, got {actual}")]
    WrongWidth {
        /// Kind being decoded
        kind: ValueKind,
        /// Width required by the kind
        expected: usize,
        /// Width found
        actual: usize,
    },

    /// String segment is not valid UTF-8
    #[error("Encoded string is not valid UTF-8")]
    InvalidUtf8,

    /// Boolean byte other than 0 or 1
    #[error("Invalid boolean byte: {0:#04x}")]
    InvalidBool(u8),

    /// Timestamp outside the representable range
    #[error("Invalid timestamp: {0} seconds")]
    InvalidTime(i64),

    /// Value cannot be converted to the requested kind
    #[error("Cannot convert {value} to {kind}")]
    Coercion {
        /// Display form of the offending value
        value: String,
        /// Requested kind
        kind: ValueKind,
    },

    /// Key does not have the expected layout
    #[error("Malformed key: {0}")]
    MalformedKey(String),
}
