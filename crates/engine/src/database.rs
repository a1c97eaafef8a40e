//! Database handle
//!
//! [`Database`] ties a [`Store`] to the entity codec and the index
//! maintainer. It provides:
//! - persistence: [`Database::save`], [`Database::get`],
//!   [`Database::get_many`], [`Database::delete`]
//! - queries: [`Database::find`], [`Database::first`], [`Database::and`],
//!   [`Database::or`]
//! - raw transactions: [`Database::view`], [`Database::update`]
//!
//! ## Transaction API
//!
//! `update` runs a closure inside one write transaction. The transaction is
//! committed when the closure returns `Ok` and rolled back when it returns
//! `Err`:
//!
//! ```text
//! let n = db.update(|txn| {
//!     txn.set(b"k", b"v")?;
//!     Ok(1)
//! })?;
//! ```
//!
//! Every save or delete batch goes through `update`, so either all of its
//! keys land or none do.
//!
//! ## Entity hooks
//!
//! `pre_save` runs inside the batch transaction and can abort it.
//! `post_save` runs after the commit. `post_get` runs on every loaded
//! entity and receives the caller's [`Context`], if any.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tormenta_core::{keys, Id};
use tormenta_storage::{MemoryStore, ReadTransaction, Store, WriteTransaction};
use tracing::{debug, info, warn};

use crate::config::{DatabaseConfig, PayloadCodec};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::idlist::Combinator;
use crate::index;
use crate::query::{self, Query};
use crate::schema::Entity;

/// Outcome of [`Database::save_individually`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    /// Entities written
    pub saved: usize,
    /// Error of the last entity that failed, if any
    pub last_error: Option<Error>,
}

/// Entity database over a sorted transactional store
#[derive(Debug)]
pub struct Database<S: Store = MemoryStore> {
    store: S,
    config: DatabaseConfig,
}

impl Database<MemoryStore> {
    /// Database over a fresh in-memory store with default configuration
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: Store> Database<S> {
    /// Database over `store` with default configuration
    pub fn new(store: S) -> Self {
        Self::with_config(store, DatabaseConfig::default())
    }

    /// Database over `store` with `config`
    pub fn with_config(store: S, config: DatabaseConfig) -> Self {
        info!(
            target: "tormenta::db",
            codec = ?config.codec,
            combined_order = ?config.combined_order,
            "Database opened"
        );
        Database { store, config }
    }

    /// Database over `store`, configured from the TOML file at `path`
    ///
    /// A missing file is first written with the commented defaults.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the file cannot be written, read or parsed.
    pub fn open_with_config_file(store: S, path: &Path) -> Result<Self> {
        DatabaseConfig::write_default_if_missing(path)?;
        let config = DatabaseConfig::from_file(path)?;
        debug!(target: "tormenta::db", path = %path.display(), "Loaded config file");
        Ok(Self::with_config(store, config))
    }

    /// Write the active configuration to `path`
    pub fn write_config(&self, path: &Path) -> Result<()> {
        self.config.write_to_file(path)
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // ========================================
    // Transactions
    // ========================================

    /// Run `f` inside a read transaction
    pub fn view<'s, F, T>(&'s self, f: F) -> Result<T>
    where
        F: FnOnce(&S::ReadTxn<'s>) -> Result<T>,
    {
        let txn = self.store.begin_read()?;
        f(&txn)
    }

    /// Run `f` inside a write transaction
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
    pub fn update<'s, F, T>(&'s self, f: F) -> Result<T>
    where
        F: FnOnce(&mut S::WriteTxn<'s>) -> Result<T>,
    {
        let mut txn = self.store.begin_write()?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback() {
                    warn!(target: "tormenta::db", error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    // ========================================
    // Persistence
    // ========================================

    /// Save `entities` in one transaction
    ///
    /// Entities with a nil id are assigned a new one. Existing records are
    /// replaced and their old index keys removed. Returns the number saved;
    /// on error, including a `pre_save` refusal, nothing is written.
    pub fn save<E: Entity>(&self, entities: &mut [E]) -> Result<usize> {
        if entities.is_empty() {
            return Ok(0);
        }
        let saved = self.update(|txn| {
            for entity in entities.iter_mut() {
                self.save_one(txn, entity)?;
            }
            Ok(entities.len())
        })?;
        for entity in entities.iter_mut() {
            entity.post_save();
        }
        debug!(target: "tormenta::db", root = E::schema().root(), saved, "Saved entities");
        Ok(saved)
    }

    /// Save each entity in its own transaction
    ///
    /// A failure does not stop the batch; the report counts the successes
    /// and keeps the last error.
    pub fn save_individually<E: Entity>(&self, entities: &mut [E]) -> SaveReport {
        let mut report = SaveReport::default();
        for entity in entities.iter_mut() {
            match self.update(|txn| self.save_one(txn, entity)) {
                Ok(()) => {
                    entity.post_save();
                    report.saved += 1;
                }
                Err(e) => {
                    warn!(target: "tormenta::db", id = %entity.id(), error = %e, "Entity save failed");
                    report.last_error = Some(e);
                }
            }
        }
        report
    }

    fn save_one<E: Entity, T: WriteTransaction>(&self, txn: &mut T, entity: &mut E) -> Result<()> {
        entity.pre_save()?;
        if entity.id().is_nil() {
            entity.set_id(Id::new());
        }
        let id = entity.id();
        let key = keys::content_key(E::schema().root(), Some(&id));

        if let Some(bytes) = txn.get(&key)? {
            let previous: E = self.decode(&bytes)?;
            index::remove_indexes(txn, &previous, &id)?;
        }
        txn.set(&key, &self.encode(entity)?)?;
        index::write_indexes(txn, entity, &id)?;
        Ok(())
    }

    /// Load the entity stored under `id`
    ///
    /// A missing record is `Ok(None)`.
    pub fn get<E: Entity>(&self, id: Id) -> Result<Option<E>> {
        self.view(|txn| self.load(txn, &id, None))
    }

    /// Like [`Database::get`], passing `ctx` to the entity's `post_get` hook
    pub fn get_with_context<E: Entity>(&self, id: Id, ctx: &Context) -> Result<Option<E>> {
        self.view(|txn| self.load(txn, &id, Some(ctx)))
    }

    /// Load the entities stored under `ids`, in the order given
    ///
    /// Ids without a record are skipped, so the result may be shorter than
    /// `ids`. All records are read in one transaction.
    pub fn get_many<E: Entity>(&self, ids: &[Id]) -> Result<Vec<E>> {
        self.load_many(ids, None)
    }

    /// Like [`Database::get_many`], passing `ctx` to every `post_get` hook
    pub fn get_many_with_context<E: Entity>(&self, ids: &[Id], ctx: &Context) -> Result<Vec<E>> {
        self.load_many(ids, Some(ctx))
    }

    fn load_many<E: Entity>(&self, ids: &[Id], ctx: Option<&Context>) -> Result<Vec<E>> {
        let found = self.view(|txn| {
            let mut found = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(entity) = self.load(txn, id, ctx)? {
                    found.push(entity);
                }
            }
            Ok(found)
        })?;
        debug!(target: "tormenta::db", root = E::schema().root(), requested = ids.len(), found = found.len(), "Loaded entities");
        Ok(found)
    }

    pub(crate) fn load<E: Entity, T: ReadTransaction>(
        &self,
        txn: &T,
        id: &Id,
        ctx: Option<&Context>,
    ) -> Result<Option<E>> {
        match txn.get(&keys::content_key(E::schema().root(), Some(id)))? {
            Some(bytes) => {
                let mut entity: E = self.decode(&bytes)?;
                entity.set_id(*id);
                entity.post_get(ctx);
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    /// Delete the entities stored under `ids`, with all their index keys
    ///
    /// Unknown ids are ignored. Returns the number of entities removed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] when `ids` is empty.
    pub fn delete<E: Entity>(&self, ids: &[Id]) -> Result<usize> {
        if ids.is_empty() {
            return Err(Error::invalid_input("No ids given to delete"));
        }
        let root = E::schema().root();
        let removed = self.update(|txn| {
            let mut removed = 0;
            for id in ids {
                let key = keys::content_key(root, Some(id));
                let Some(bytes) = txn.get(&key)? else {
                    continue;
                };
                let entity: E = self.decode(&bytes)?;
                index::remove_indexes(txn, &entity, id)?;
                txn.delete(&key)?;
                removed += 1;
            }
            Ok(removed)
        })?;
        debug!(target: "tormenta::db", root, requested = ids.len(), removed, "Deleted entities");
        Ok(removed)
    }

    // ========================================
    // Queries
    // ========================================

    /// Start a query over entities of type `E`
    pub fn find<E: Entity>(&self) -> Query<'_, E, S> {
        Query::new(self)
    }

    /// Start a query returning at most one entity
    pub fn first<E: Entity>(&self) -> Query<'_, E, S> {
        Query::new(self).limit(1)
    }

    /// Ids matched by every one of `queries`
    pub fn and<'db, E: Entity>(&'db self, queries: Vec<Query<'db, E, S>>) -> Query<'db, E, S> {
        query::combine(self, Combinator::And, queries)
    }

    /// Ids matched by any of `queries`
    pub fn or<'db, E: Entity>(&'db self, queries: Vec<Query<'db, E, S>>) -> Query<'db, E, S> {
        query::combine(self, Combinator::Or, queries)
    }

    // ========================================
    // Payload codec
    // ========================================

    fn encode<E: Serialize>(&self, entity: &E) -> Result<Vec<u8>> {
        match self.config.codec {
            PayloadCodec::Msgpack => Ok(rmp_serde::to_vec_named(entity)?),
            PayloadCodec::Json => Ok(serde_json::to_vec(entity)?),
        }
    }

    fn decode<E: DeserializeOwned>(&self, bytes: &[u8]) -> Result<E> {
        match self.config.codec {
            PayloadCodec::Msgpack => Ok(rmp_serde::from_slice(bytes)?),
            PayloadCodec::Json => Ok(serde_json::from_slice(bytes)?),
        }
    }
}
