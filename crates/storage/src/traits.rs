//! Core storage traits.
//!
//! The query engine only ever needs three things from a backend:
//!
//! - [`Store`] - hands out read-only and read-write transactions
//! - [`ReadTransaction`] / [`WriteTransaction`] - point reads, writes, deletes
//! - [`Cursor`] - seek to a key, then walk keys in byte order, forward or reverse
//!
//! The cursor follows the "seek, check, advance" shape of LSM iterators:
//! position with [`Cursor::seek`], inspect [`Cursor::key`], test
//! [`Cursor::valid_for_prefix`], then call [`Cursor::next`].

use std::sync::Arc;

use crate::error::StorageResult;

/// Iteration direction of a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Ascending byte order
    #[default]
    Forward,
    /// Descending byte order
    Reverse,
}

impl Direction {
    /// Direction for a `reverse` flag
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }

    /// True for [`Direction::Reverse`]
    pub fn is_reverse(self) -> bool {
        matches!(self, Direction::Reverse)
    }
}

/// A sorted, transactional key-value store.
///
/// Implementations must be thread-safe: the engine shares one store handle
/// across concurrently executing sub-queries, each of which opens its own
/// read transaction.
///
/// # Example
///
/// ```ignore
/// use tormenta_storage::{MemoryStore, ReadTransaction, Store, WriteTransaction};
///
/// let store = MemoryStore::new();
///
/// let mut txn = store.begin_write()?;
/// txn.set(b"c~order~1", b"payload")?;
/// txn.commit()?;
///
/// let txn = store.begin_read()?;
/// assert_eq!(txn.get(b"c~order~1")?, Some(b"payload".to_vec()));
/// ```
pub trait Store: Send + Sync {
    /// Read-only transaction type
    type ReadTxn<'a>: ReadTransaction
    where
        Self: 'a;

    /// Read-write transaction type
    type WriteTxn<'a>: WriteTransaction
    where
        Self: 'a;

    /// Begin a read-only transaction.
    ///
    /// Read transactions see a consistent view of the store for their whole
    /// lifetime. Many may be open at once.
    fn begin_read(&self) -> StorageResult<Self::ReadTxn<'_>>;

    /// Begin a read-write transaction.
    ///
    /// Writes become visible to other transactions only on
    /// [`WriteTransaction::commit`]. A write transaction dropped without
    /// committing is rolled back.
    fn begin_write(&self) -> StorageResult<Self::WriteTxn<'_>>;
}

/// Read access within a transaction
pub trait ReadTransaction {
    /// Cursor type borrowing from this transaction
    type Cursor<'c>: Cursor
    where
        Self: 'c;

    /// Get the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent; absence is not an error.
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Open an unpositioned cursor walking in `direction`.
    ///
    /// The cursor yields nothing until [`Cursor::seek`] is called.
    fn cursor(&self, direction: Direction) -> StorageResult<Self::Cursor<'_>>;
}

/// Write access within a transaction
///
/// All writes made through one transaction land atomically on commit, or
/// not at all.
pub trait WriteTransaction: ReadTransaction {
    /// Insert or overwrite `key`
    fn set(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Remove `key`. Returns whether it existed.
    fn delete(&mut self, key: &[u8]) -> StorageResult<bool>;

    /// Make all writes of this transaction visible
    fn commit(self) -> StorageResult<()>
    where
        Self: Sized;

    /// Discard all writes of this transaction
    fn rollback(self) -> StorageResult<()>
    where
        Self: Sized;
}

/// Ordered iteration over the keys of a transaction.
///
/// # Iteration Pattern
///
/// ```ignore
/// let mut cursor = txn.cursor(Direction::Forward)?;
/// cursor.seek(b"i~order~")?;
/// while cursor.valid_for_prefix(b"i~order~") {
///     let key = cursor.key().unwrap();
///     // ...
///     cursor.next()?;
/// }
/// ```
pub trait Cursor {
    /// Position the cursor.
    ///
    /// Forward cursors land on the first key `>= key`; reverse cursors land
    /// on the last key `<= key`. A reverse scan that must include every key
    /// sharing `key` as a prefix therefore has to seek past it (the engine
    /// appends `0xFF` bytes for this).
    fn seek(&mut self, key: &[u8]) -> StorageResult<()>;

    /// Key at the current position, `None` once exhausted
    fn key(&self) -> Option<&[u8]>;

    /// Value at the current position, `None` once exhausted
    fn value(&self) -> Option<&[u8]>;

    /// Advance one step in the cursor's direction
    fn next(&mut self) -> StorageResult<()>;

    /// True while positioned on a key starting with `prefix`
    fn valid_for_prefix(&self, prefix: &[u8]) -> bool {
        self.key().is_some_and(|k| k.starts_with(prefix))
    }
}

/// Shared handles are stores too, so a database can be built over
/// `Arc<S>` and the store used directly elsewhere.
impl<S: Store> Store for Arc<S> {
    type ReadTxn<'a>
        = S::ReadTxn<'a>
    where
        Self: 'a;

    type WriteTxn<'a>
        = S::WriteTxn<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> StorageResult<Self::ReadTxn<'_>> {
        (**self).begin_read()
    }

    fn begin_write(&self) -> StorageResult<Self::WriteTxn<'_>> {
        (**self).begin_write()
    }
}
