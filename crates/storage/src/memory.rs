//! MemoryStore: ordered in-memory backend
//!
//! This module implements the storage traits using:
//! - `BTreeMap<Vec<u8>, Vec<u8>>` for lexicographically ordered keys
//! - `parking_lot::RwLock` for thread-safe access
//!
//! # Design Notes
//!
//! - **Readers share, writers exclude**: a read transaction holds a shared
//!   guard for its lifetime, so it always sees one consistent state. A write
//!   transaction holds the exclusive guard.
//! - **In-place writes with an undo log**: writes go straight into the map
//!   and the previous value of each touched key is recorded. Commit drops the
//!   log; rollback (explicit or on drop) replays it backwards. Because the
//!   guard is exclusive, no reader can observe a half-applied batch.
//! - Opening a read transaction on a thread that already holds a write
//!   transaction deadlocks. Read through the write transaction instead.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::error::StorageResult;
use crate::traits::{Cursor, Direction, ReadTransaction, Store, WriteTransaction};

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory sorted store
///
/// Cloning a `MemoryStore` yields another handle onto the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Tree>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True when no keys are stored
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Copy of every key, in order. Intended for tests and debugging.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.data.read().keys().cloned().collect()
    }
}

impl Store for MemoryStore {
    type ReadTxn<'a>
        = MemoryReadTxn<'a>
    where
        Self: 'a;

    type WriteTxn<'a>
        = MemoryWriteTxn<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> StorageResult<Self::ReadTxn<'_>> {
        Ok(MemoryReadTxn {
            tree: self.data.read(),
        })
    }

    fn begin_write(&self) -> StorageResult<Self::WriteTxn<'_>> {
        Ok(MemoryWriteTxn {
            tree: self.data.write(),
            undo: Vec::new(),
            finished: false,
        })
    }
}

/// Read-only transaction over a [`MemoryStore`]
pub struct MemoryReadTxn<'a> {
    tree: RwLockReadGuard<'a, Tree>,
}

impl ReadTransaction for MemoryReadTxn<'_> {
    type Cursor<'c>
        = MemoryCursor<'c>
    where
        Self: 'c;

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.tree.get(key).cloned())
    }

    fn cursor(&self, direction: Direction) -> StorageResult<Self::Cursor<'_>> {
        Ok(MemoryCursor::new(&self.tree, direction))
    }
}

/// Read-write transaction over a [`MemoryStore`]
pub struct MemoryWriteTxn<'a> {
    tree: RwLockWriteGuard<'a, Tree>,
    /// Previous value of every mutated key, in mutation order
    undo: Vec<(Vec<u8>, Option<Vec<u8>>)>,
    finished: bool,
}

impl MemoryWriteTxn<'_> {
    fn restore(&mut self) {
        let reverted = self.undo.len();
        while let Some((key, previous)) = self.undo.pop() {
            match previous {
                Some(value) => {
                    self.tree.insert(key, value);
                }
                None => {
                    self.tree.remove(&key);
                }
            }
        }
        debug!(target: "tormenta::storage", reverted, "Write transaction rolled back");
    }
}

impl ReadTransaction for MemoryWriteTxn<'_> {
    type Cursor<'c>
        = MemoryCursor<'c>
    where
        Self: 'c;

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.tree.get(key).cloned())
    }

    fn cursor(&self, direction: Direction) -> StorageResult<Self::Cursor<'_>> {
        Ok(MemoryCursor::new(&self.tree, direction))
    }
}

impl WriteTransaction for MemoryWriteTxn<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let previous = self.tree.insert(key.to_vec(), value.to_vec());
        self.undo.push((key.to_vec(), previous));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StorageResult<bool> {
        match self.tree.remove(key) {
            Some(previous) => {
                self.undo.push((key.to_vec(), Some(previous)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn commit(mut self) -> StorageResult<()> {
        debug!(target: "tormenta::storage", writes = self.undo.len(), "Write transaction committed");
        self.undo.clear();
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self) -> StorageResult<()> {
        self.restore();
        self.finished = true;
        Ok(())
    }
}

impl Drop for MemoryWriteTxn<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.restore();
        }
    }
}

type Entries<'a> = Box<dyn Iterator<Item = (&'a Vec<u8>, &'a Vec<u8>)> + 'a>;

/// Cursor over a [`MemoryStore`] transaction
pub struct MemoryCursor<'a> {
    tree: &'a Tree,
    direction: Direction,
    entries: Option<Entries<'a>>,
    current: Option<(&'a [u8], &'a [u8])>,
}

impl<'a> MemoryCursor<'a> {
    fn new(tree: &'a Tree, direction: Direction) -> Self {
        Self {
            tree,
            direction,
            entries: None,
            current: None,
        }
    }

    fn advance(&mut self) {
        self.current = self
            .entries
            .as_mut()
            .and_then(|entries| entries.next())
            .map(|(k, v)| (k.as_slice(), v.as_slice()));
    }
}

impl Cursor for MemoryCursor<'_> {
    fn seek(&mut self, key: &[u8]) -> StorageResult<()> {
        let entries: Entries<'_> = match self.direction {
            Direction::Forward => Box::new(
                self.tree
                    .range::<[u8], _>((Bound::Included(key), Bound::Unbounded)),
            ),
            Direction::Reverse => Box::new(
                self.tree
                    .range::<[u8], _>((Bound::Unbounded, Bound::Included(key)))
                    .rev(),
            ),
        };
        self.entries = Some(entries);
        self.advance();
        Ok(())
    }

    fn key(&self) -> Option<&[u8]> {
        self.current.map(|(k, _)| k)
    }

    fn value(&self) -> Option<&[u8]> {
        self.current.map(|(_, v)| v)
    }

    fn next(&mut self) -> StorageResult<()> {
        self.advance();
        Ok(())
    }
}

impl fmt::Debug for MemoryCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCursor")
            .field("direction", &self.direction)
            .field("key", &self.key())
            .finish()
    }
}
