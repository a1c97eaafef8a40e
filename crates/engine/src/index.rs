//! Secondary index maintenance
//!
//! Index keys carry no payload; the key itself is the fact "entity `id` has
//! `value` in index `name`". For each indexed field of an entity:
//! - a scalar produces one key
//! - a list produces one key per element
//! - a split text field produces one key per lower-cased word, minus
//!   [`STOP_WORDS`]
//!
//! Keys cannot be updated in place since the value is part of the key, so an
//! update recomputes the keys of the stored version and deletes them before
//! writing the new set.

use std::collections::BTreeSet;

use tormenta_core::{keys, Id, Value};
use tormenta_storage::WriteTransaction;
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::{Entity, FieldDescriptor, IndexMode};

/// Words dropped from split text fields
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
    "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

/// Lower-cased words of `text` that are worth indexing
pub fn split_words(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

/// Encoded values one field contributes to its index
fn field_values<E>(field: &FieldDescriptor<E>, entity: &E) -> Result<Vec<Vec<u8>>> {
    let mut encoded = Vec::new();
    for value in field.read(entity).into_values() {
        let value = value.coerce(field.kind()).map_err(|e| {
            Error::type_mismatch(format!("field {} holds {}", field.name(), e))
        })?;
        match (field.mode(), value) {
            (IndexMode::Split, Value::Str(text)) => {
                encoded.extend(split_words(&text).into_iter().map(|w| w.into_bytes()));
            }
            (_, value) => encoded.push(value.encode()),
        }
    }
    Ok(encoded)
}

/// Every index key `entity` should have under `id`
pub fn index_keys<E: Entity>(entity: &E, id: &Id) -> Result<BTreeSet<Vec<u8>>> {
    let schema = E::schema();
    let mut out = BTreeSet::new();
    for field in schema.indexed_fields() {
        for value in field_values(field, entity)? {
            out.insert(keys::index_key(schema.root(), field.name(), &value, id));
        }
    }
    Ok(out)
}

/// Write the index keys of `entity`
pub fn write_indexes<E: Entity, T: WriteTransaction>(
    txn: &mut T,
    entity: &E,
    id: &Id,
) -> Result<usize> {
    let index_keys = index_keys(entity, id)?;
    for key in &index_keys {
        txn.set(key, &[])?;
    }
    debug!(target: "tormenta::index", root = E::schema().root(), %id, keys = index_keys.len(), "Indexed entity");
    Ok(index_keys.len())
}

/// Delete the index keys of `entity`, which must be the stored version
pub fn remove_indexes<E: Entity, T: WriteTransaction>(
    txn: &mut T,
    entity: &E,
    id: &Id,
) -> Result<usize> {
    let mut removed = 0;
    for key in index_keys(entity, id)? {
        if txn.delete(&key)? {
            removed += 1;
        }
    }
    debug!(target: "tormenta::index", root = E::schema().root(), %id, keys = removed, "Removed entity indexes");
    Ok(removed)
}
