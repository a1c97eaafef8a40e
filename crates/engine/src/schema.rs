//! Entity schema descriptors
//!
//! A [`Schema`] tells the engine, for one entity type:
//! - the key root (lower-cased type name) under which records live
//! - which fields are indexed, their [`ValueKind`] and [`IndexMode`]
//! - how to read each field's value(s) from an entity
//!
//! Schemas are built once per type and handed out as `&'static`, usually
//! from a `once_cell::sync::Lazy`:
//!
//! ```text
//! static SCHEMA: Lazy<Schema<Order>> = Lazy::new(|| {
//!     Schema::<Order>::builder("order")
//!         .index("customer", ValueKind::Str, |o| FieldValue::one(o.customer.as_str()))
//!         .index("total", ValueKind::F64, |o| FieldValue::one(o.total))
//!         .split("notes", |o| FieldValue::one(o.notes.as_str()))
//!         .build()
//! });
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use tormenta_core::{Id, Value, ValueKind};

use crate::context::Context;
use crate::error::{Error, Result};

/// A storable entity type
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Schema shared by all entities of this type
    fn schema() -> &'static Schema<Self>
    where
        Self: Sized;

    /// Current id; nil until first saved
    fn id(&self) -> Id;

    /// Assign the id, called on first save
    fn set_id(&mut self, id: Id);

    /// Called before the entity is written; an error aborts the whole save
    fn pre_save(&self) -> Result<()> {
        Ok(())
    }

    /// Called once the save that wrote this entity has committed
    fn post_save(&mut self) {}

    /// Called on every entity loaded by a get or a query, with the caller's
    /// context if one was given
    fn post_get(&mut self, _ctx: Option<&Context>) {}
}

/// How a field takes part in indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// One index key per value
    Plain,
    /// Free text: one key per word, stop words dropped
    Split,
    /// Not indexed
    Skip,
}

/// Value(s) produced by a field accessor
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Scalar field
    One(Value),
    /// List field; each element is indexed on its own
    Many(Vec<Value>),
}

impl FieldValue {
    /// Scalar value
    pub fn one(value: impl Into<Value>) -> Self {
        FieldValue::One(value.into())
    }

    /// List of values
    pub fn many<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        FieldValue::Many(values.into_iter().map(Into::into).collect())
    }

    /// Flatten into a list of values
    pub fn into_values(self) -> Vec<Value> {
        match self {
            FieldValue::One(v) => vec![v],
            FieldValue::Many(vs) => vs,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::One(v)
    }
}

/// Accessor reading a field's value(s) from an entity
pub type Accessor<E> = fn(&E) -> FieldValue;

/// One declared field
pub struct FieldDescriptor<E> {
    name: String,
    kind: ValueKind,
    mode: IndexMode,
    accessor: Accessor<E>,
}

impl<E> FieldDescriptor<E> {
    /// Lower-cased field name, used as the index name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of each value
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Indexing mode
    pub fn mode(&self) -> IndexMode {
        self.mode
    }

    /// Read the field from an entity
    pub fn read(&self, entity: &E) -> FieldValue {
        (self.accessor)(entity)
    }
}

impl<E> std::fmt::Debug for FieldDescriptor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Field table for one entity type
#[derive(Debug)]
pub struct Schema<E> {
    root: String,
    fields: Vec<FieldDescriptor<E>>,
}

impl<E> Schema<E> {
    /// Start building a schema for entities stored under `root`
    pub fn builder(root: &str) -> SchemaBuilder<E> {
        SchemaBuilder {
            root: root.to_lowercase(),
            fields: Vec::new(),
        }
    }

    /// Key root of this entity type
    pub fn root(&self) -> &str {
        &self.root
    }

    /// All declared fields, in declaration order
    pub fn fields(&self) -> &[FieldDescriptor<E>] {
        &self.fields
    }

    /// Fields that produce index keys
    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldDescriptor<E>> {
        self.fields.iter().filter(|f| f.mode != IndexMode::Skip)
    }

    /// Look a field up by name, ignoring case
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<E>> {
        self.fields
            .iter()
            .find(|f| f.name == name.to_lowercase())
    }

    /// Look up an indexed field for a query
    ///
    /// # Errors
    ///
    /// [`Error::UnknownIndex`] when the field is undeclared or skipped.
    pub fn index(&self, name: &str) -> Result<&FieldDescriptor<E>> {
        match self.field(name) {
            Some(field) if field.mode != IndexMode::Skip => Ok(field),
            _ => Err(Error::UnknownIndex(name.to_string())),
        }
    }
}

/// Builder for [`Schema`]
pub struct SchemaBuilder<E> {
    root: String,
    fields: Vec<FieldDescriptor<E>>,
}

impl<E> SchemaBuilder<E> {
    fn push(mut self, name: &str, kind: ValueKind, mode: IndexMode, accessor: Accessor<E>) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.to_lowercase(),
            kind,
            mode,
            accessor,
        });
        self
    }

    /// Declare an indexed field
    pub fn index(self, name: &str, kind: ValueKind, accessor: Accessor<E>) -> Self {
        self.push(name, kind, IndexMode::Plain, accessor)
    }

    /// Declare a free-text field indexed word by word
    pub fn split(self, name: &str, accessor: Accessor<E>) -> Self {
        self.push(name, ValueKind::Str, IndexMode::Split, accessor)
    }

    /// Declare a field that is stored but never indexed
    pub fn skip(self, name: &str, kind: ValueKind, accessor: Accessor<E>) -> Self {
        self.push(name, kind, IndexMode::Skip, accessor)
    }

    /// Finish the schema
    pub fn build(self) -> Schema<E> {
        Schema {
            root: self.root,
            fields: self.fields,
        }
    }
}
