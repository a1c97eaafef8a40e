//! Caller context handed to [`Entity::post_get`](crate::Entity::post_get)
//!
//! A context is a small map of named values supplied at the call site,
//! either to [`Database::get_with_context`](crate::Database::get_with_context)
//! or to a query through [`Query::with_context`](crate::Query::with_context).
//! Loads without one pass `None` to the hook.

use std::collections::BTreeMap;

use tormenta_core::Value;

/// Named values passed through to entity hooks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with `key` set, for chaining
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, returning the previous value
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.to_string(), value.into())
    }

    /// Value under `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value under `key`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the context holds nothing
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
