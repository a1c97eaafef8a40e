//! Shared fixtures for the query suite.

#![allow(dead_code)]

use std::sync::Once;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
pub use tormenta::{
    Accumulator, Database, Entity, Error, FieldValue, Id, Lazy, Schema, SortOrder, Value,
    ValueKind,
};

// ============================================================================
// Logging
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route engine logs through the test writer; `RUST_LOG` controls the level.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

// ============================================================================
// Sample entity
// ============================================================================

/// Entity exercising every index kind and mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: Id,
    pub int_field: i32,
    pub string_field: String,
    pub i8_field: i8,
    pub i16_field: i16,
    pub i64_field: i64,
    pub u16_field: u16,
    pub u64_field: u64,
    pub f32_field: f32,
    pub f64_field: f64,
    pub bool_field: bool,
    pub tags: Vec<String>,
    pub notes: String,
    pub secret: String,
}

static SAMPLE_SCHEMA: Lazy<Schema<Sample>> = Lazy::new(|| {
    Schema::<Sample>::builder("Sample")
        .index("IntField", ValueKind::Int, |s| FieldValue::one(s.int_field))
        .index("StringField", ValueKind::Str, |s| {
            FieldValue::one(s.string_field.as_str())
        })
        .index("i8_field", ValueKind::I8, |s| FieldValue::one(s.i8_field))
        .index("i16_field", ValueKind::I16, |s| FieldValue::one(s.i16_field))
        .index("i64_field", ValueKind::I64, |s| FieldValue::one(s.i64_field))
        .index("u16_field", ValueKind::U16, |s| FieldValue::one(s.u16_field))
        .index("u64_field", ValueKind::U64, |s| FieldValue::one(s.u64_field))
        .index("f32_field", ValueKind::F32, |s| FieldValue::one(s.f32_field))
        .index("f64_field", ValueKind::F64, |s| FieldValue::one(s.f64_field))
        .index("bool_field", ValueKind::Bool, |s| FieldValue::one(s.bool_field))
        .index("tags", ValueKind::Str, |s| FieldValue::many(&s.tags))
        .split("notes", |s| FieldValue::one(s.notes.as_str()))
        .skip("secret", ValueKind::Str, |s| FieldValue::one(s.secret.as_str()))
        .build()
});

impl Entity for Sample {
    fn schema() -> &'static Schema<Self> {
        &SAMPLE_SCHEMA
    }

    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }
}

/// Sample whose numeric fields are all derived from `i`.
pub fn sample(i: i32) -> Sample {
    Sample {
        id: Id::nil(),
        int_field: i,
        string_field: format!("int-{}", i),
        i8_field: i as i8,
        i16_field: (i * 100) as i16,
        i64_field: i as i64 * 1_000_000_000_000,
        u16_field: i.unsigned_abs() as u16,
        u64_field: i.unsigned_abs() as u64 * 7,
        f32_field: i as f32 * 0.5,
        f64_field: i as f64 * 1.25,
        bool_field: i % 2 == 0,
        tags: vec![format!("mod-{}", i.rem_euclid(3)), "all".to_string()],
        notes: format!("Sample number {} of the test set", i),
        secret: "hidden".to_string(),
    }
}

/// Fresh database holding one sample per value of `values`, saved in order.
pub fn setup(values: impl IntoIterator<Item = i32>) -> (Database, Vec<Sample>) {
    init_tracing();
    let db = Database::in_memory();
    let mut samples: Vec<Sample> = values.into_iter().map(sample).collect();
    db.save(&mut samples).expect("save samples");
    (db, samples)
}

/// Ids of `samples`, in the order given.
pub fn ids_of(samples: &[Sample]) -> Vec<Id> {
    samples.iter().map(|s| s.id).collect()
}

/// Int field values of `samples`, in the order given.
pub fn ints_of(samples: &[Sample]) -> Vec<i32> {
    samples.iter().map(|s| s.int_field).collect()
}

/// Midnight UTC of day `day` in January 2020.
pub fn day(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap()
}

/// One sample per day of January 2020 for `days`, with ids stamped at noon.
pub fn setup_dated(days: impl IntoIterator<Item = u32>) -> (Database, Vec<Sample>) {
    init_tracing();
    let db = Database::in_memory();
    let mut samples: Vec<Sample> = days
        .into_iter()
        .map(|d| {
            let mut s = sample(d as i32);
            s.id = Id::at(day(d) + Duration::hours(12));
            s
        })
        .collect();
    db.save(&mut samples).expect("save dated samples");
    (db, samples)
}
