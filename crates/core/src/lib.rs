//! Core types for Tormenta
//!
//! This crate defines the byte-level building blocks shared by the engine:
//! - Id: time-ordered 16-byte entity identifier
//! - Value / ValueKind: typed field values and their order-preserving encoding
//! - keys: content and index key construction, id extraction, boundary checks
//! - CodecError: failures of the value and key codecs
//!
//! Everything here is pure and stateless apart from the monotonic clock
//! behind [`Id::new`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod keys;
pub mod value;

pub use error::{CodecError, CodecResult};
pub use id::{Id, ID_LEN};
pub use value::{Value, ValueKind};
