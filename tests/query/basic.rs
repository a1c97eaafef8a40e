//! Plain Scan Tests
//!
//! Queries without an index predicate walk content keys, so they return
//! entities in creation order and are bounded by the date window.

use serde::{Deserialize, Serialize};

use crate::common::*;

// =============================================================================
// ORDERING
// =============================================================================

#[test]
fn test_plain_scan_returns_creation_order() {
    let (db, samples) = setup(0..10);
    let ids = db.find::<Sample>().ids().unwrap();
    assert_eq!(ids.into_vec(), ids_of(&samples));
}

#[test]
fn test_reverse_scan_is_exact_reverse() {
    let (db, samples) = setup(0..10);
    let forward = db.find::<Sample>().ids().unwrap().into_vec();
    let mut reverse = db.find::<Sample>().reverse().ids().unwrap().into_vec();
    reverse.reverse();
    assert_eq!(forward, reverse);
    assert_eq!(forward.len(), samples.len());
}

#[test]
fn test_run_hydrates_entities() {
    let (db, samples) = setup(0..5);
    assert_eq!(db.find::<Sample>().run().unwrap(), samples);
}

#[test]
fn test_empty_database() {
    init_tracing();
    let db = Database::in_memory();
    assert!(db.find::<Sample>().ids().unwrap().is_empty());
    assert_eq!(db.find::<Sample>().reverse().count().unwrap(), 0);
}

// =============================================================================
// DATE WINDOWS
// =============================================================================

#[test]
fn test_from_and_to_are_inclusive_bounds() {
    let (db, _) = setup_dated(1..=10);
    let found = db.find::<Sample>().from(day(3)).to(day(6)).run().unwrap();
    // ids are stamped at noon, so day 6 itself falls after `to`
    assert_eq!(ints_of(&found), vec![3, 4, 5]);
}

#[test]
fn test_open_ended_windows() {
    let (db, _) = setup_dated(1..=10);
    assert_eq!(db.find::<Sample>().from(day(8)).count().unwrap(), 3);
    assert_eq!(db.find::<Sample>().to(day(3)).count().unwrap(), 2);
}

#[test]
fn test_reverse_with_window() {
    let (db, _) = setup_dated(1..=10);
    let found = db
        .find::<Sample>()
        .from(day(3))
        .to(day(6))
        .reverse()
        .run()
        .unwrap();
    assert_eq!(ints_of(&found), vec![5, 4, 3]);
}

#[test]
fn test_window_outside_data_is_empty() {
    let (db, _) = setup_dated(1..=5);
    assert!(db.find::<Sample>().from(day(20)).ids().unwrap().is_empty());
    assert!(db
        .find::<Sample>()
        .from(day(4))
        .to(day(2))
        .ids()
        .unwrap()
        .is_empty());
}

#[test]
fn test_between_ids_is_inclusive() {
    let (db, samples) = setup(0..6);
    let ids = db
        .find::<Sample>()
        .between_ids(samples[2].id, samples[4].id)
        .ids()
        .unwrap();
    assert_eq!(ids.into_vec(), ids_of(&samples[2..=4]));
}

// =============================================================================
// ROOT ISOLATION
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Sampler {
    id: Id,
    int_field: i32,
}

static SAMPLER_SCHEMA: Lazy<Schema<Sampler>> = Lazy::new(|| {
    Schema::<Sampler>::builder("sampler")
        .index("IntField", ValueKind::Int, |s| FieldValue::one(s.int_field))
        .build()
});

impl Entity for Sampler {
    fn schema() -> &'static Schema<Self> {
        &SAMPLER_SCHEMA
    }

    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }
}

#[test]
fn test_roots_sharing_a_prefix_stay_apart() {
    let (db, _) = setup(0..3);
    let mut others = vec![
        Sampler {
            int_field: 1,
            ..Sampler::default()
        },
        Sampler {
            int_field: 2,
            ..Sampler::default()
        },
    ];
    db.save(&mut others).unwrap();

    assert_eq!(db.find::<Sample>().count().unwrap(), 3);
    assert_eq!(db.find::<Sampler>().count().unwrap(), 2);
    assert_eq!(db.find::<Sample>().matching("intfield", 1).count().unwrap(), 1);
    assert_eq!(
        db.find::<Sampler>()
            .range("intfield", Some(0), None)
            .count()
            .unwrap(),
        2
    );
}
