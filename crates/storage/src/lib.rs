//! Storage layer for tormenta
//!
//! This crate defines the contract the query engine needs from an ordered
//! key-value store, and ships one backend:
//! - `Store`: entry point handing out read and write transactions
//! - `ReadTransaction` / `WriteTransaction`: point reads, writes and cursors
//! - `Cursor`: seek-then-iterate over lexicographically ordered binary keys,
//!   forward or reverse
//! - `MemoryStore`: `BTreeMap` backend behind a `parking_lot::RwLock`
//!
//! Keys and values are opaque byte strings at this layer. Everything the
//! engine knows about key structure lives in `tormenta-core`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::{MemoryCursor, MemoryReadTxn, MemoryStore, MemoryWriteTxn};
pub use traits::{Cursor, Direction, ReadTransaction, Store, WriteTransaction};
