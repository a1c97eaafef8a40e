//! Tormenta - embedded ordered key-value entity store
//!
//! Tormenta stores typed entities on top of a sorted, transactional
//! key-value store and keeps secondary indexes for them, so they can be
//! queried by exact value, value range, string prefix and creation date.
//!
//! # Quick Start
//!
//! ```ignore
//! use tormenta::{Database, Entity, FieldValue, Id, Lazy, Schema, ValueKind};
//!
//! #[derive(Default, serde::Serialize, serde::Deserialize)]
//! struct Order {
//!     id: Id,
//!     customer: String,
//!     total: f64,
//! }
//!
//! static ORDER: Lazy<Schema<Order>> = Lazy::new(|| {
//!     Schema::<Order>::builder("order")
//!         .index("customer", ValueKind::Str, |o| FieldValue::one(o.customer.as_str()))
//!         .index("total", ValueKind::F64, |o| FieldValue::one(o.total))
//!         .build()
//! });
//!
//! impl Entity for Order {
//!     fn schema() -> &'static Schema<Self> { &ORDER }
//!     fn id(&self) -> Id { self.id }
//!     fn set_id(&mut self, id: Id) { self.id = id; }
//! }
//!
//! let db = Database::in_memory();
//! db.save(&mut [Order { customer: "Ann".into(), total: 12.5, ..Default::default() }])?;
//!
//! let big = db.find::<Order>().range("total", Some(10.0), None).reverse().run()?;
//! ```
//!
//! # Architecture
//!
//! - `tormenta-storage`: store traits and the in-memory backend
//! - `tormenta-core`: ids, value codec and key layout
//! - `tormenta-engine`: schemas, indexes, queries and the `Database` handle

pub use tormenta_core::{keys, CodecError, CodecResult, Id, Value, ValueKind, ID_LEN};
pub use tormenta_engine::*;
pub use tormenta_storage::{
    Cursor, Direction, MemoryCursor, MemoryReadTxn, MemoryStore, MemoryWriteTxn, ReadTransaction,
    StorageError, StorageResult, Store, WriteTransaction,
};
