//! Query engine for tormenta
//!
//! This crate turns a sorted key-value store into an entity database:
//! - Database: save / get / delete entities, raw transactions
//! - Entity hooks: pre_save, post_save and post_get with a caller context
//! - Schema: per-type field table driving secondary indexes
//! - Index maintainer: writes and removes index keys on save / delete
//! - Query: fluent builder planned into cursor scans
//! - ID lists: AND / OR set algebra over sub-query results
//! - Quick sum: numeric aggregation read straight from index keys
//!
//! The engine is the only component that knows about:
//! - Entity payload serialization
//! - How predicates map onto key boundaries
//! - Combining concurrently executed sub-queries

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod idlist;
pub mod index;
pub mod plan;
pub mod query;
pub mod scan;
pub mod schema;

pub use aggregate::Accumulator;
pub use config::{DatabaseConfig, PayloadCodec, CONFIG_FILE_NAME};
pub use context::Context;
pub use database::{Database, SaveReport};
pub use error::{Error, Result};
pub use idlist::{intersection, union, Combinator, IdList, SortOrder};
pub use plan::{DateWindow, Predicate, ScanPlan, ScanSpec};
pub use query::Query;
/// Lazy cell for per-type schema statics
pub use once_cell::sync::Lazy;
pub use schema::{Accessor, Entity, FieldDescriptor, FieldValue, IndexMode, Schema, SchemaBuilder};
