//! Combination Tests
//!
//! AND / OR over the predicates of one query and over whole queries,
//! including nested combinations.

use tormenta::{DatabaseConfig, MemoryStore};

use crate::common::*;

// =============================================================================
// WHOLE QUERIES
// =============================================================================

#[test]
fn test_and_of_range_and_match() {
    let (db, samples) = setup(1..=10);
    let combined = db.and(vec![
        db.find::<Sample>().range("IntField", Some(1), Some(5)),
        db.find::<Sample>().matching("StringField", "int-2"),
    ]);
    let found = combined.run().unwrap();
    assert_eq!(found, vec![samples[1].clone()]);
}

#[test]
fn test_or_of_matches() {
    let (db, _) = setup(0..10);
    let combined = db.or(vec![
        db.find::<Sample>().matching("IntField", 1),
        db.find::<Sample>().matching("IntField", 2),
        db.find::<Sample>().matching("IntField", 3),
    ]);
    let found = combined.run().unwrap();
    assert_eq!(found.len(), 3);
    assert_eq!(found.iter().map(|s| s.int_field).sum::<i32>(), 6);
    assert_eq!(
        combined.sum("IntField", Accumulator::Int(0)).unwrap(),
        Accumulator::Int(6)
    );
}

#[test]
fn test_or_removes_duplicates() {
    let (db, _) = setup(0..10);
    let combined = db.or(vec![
        db.find::<Sample>().range("IntField", Some(0), Some(5)),
        db.find::<Sample>().range("IntField", Some(3), Some(7)),
    ]);
    assert_eq!(combined.count().unwrap(), 8);
}

#[test]
fn test_and_of_disjoint_queries_is_empty() {
    let (db, _) = setup(0..10);
    let combined = db.and(vec![
        db.find::<Sample>().range("IntField", Some(0), Some(3)),
        db.find::<Sample>().range("IntField", Some(6), Some(9)),
    ]);
    assert!(combined.ids().unwrap().is_empty());
}

#[test]
fn test_nested_combinations() {
    let (db, _) = setup(0..10);
    let small = db.or(vec![
        db.find::<Sample>().matching("IntField", 1),
        db.find::<Sample>().matching("IntField", 2),
        db.find::<Sample>().matching("IntField", 3),
    ]);
    let nested = db.and(vec![
        small,
        db.find::<Sample>().range("IntField", Some(2), Some(9)),
    ]);
    let mut ints = ints_of(&nested.run().unwrap());
    ints.sort();
    assert_eq!(ints, vec![2, 3]);

    let even = db.find::<Sample>().matching("bool_field", true);
    let either = db.or(vec![
        nested,
        db.and(vec![even, db.find::<Sample>().range("IntField", Some(7), None)]),
    ]);
    let mut ints = ints_of(&either.run().unwrap());
    ints.sort();
    assert_eq!(ints, vec![2, 3, 8]);
}

#[test]
fn test_combined_ids_are_not_recomputed() {
    let (db, samples) = setup(0..5);
    let combined = db.or(vec![
        db.find::<Sample>().matching("IntField", 1),
        db.find::<Sample>().matching("IntField", 2),
    ]);
    db.delete::<Sample>(&ids_of(&samples)).unwrap();

    // the stored list survives, but the records are gone
    assert_eq!(combined.count().unwrap(), 2);
    assert!(matches!(
        combined.run().unwrap_err(),
        Error::EntityNotFound(_)
    ));
}

// =============================================================================
// ORDERING AND PAGING OF COMBINED RESULTS
// =============================================================================

#[test]
fn test_combined_results_default_to_newest_first() {
    let (db, samples) = setup(0..6);
    let combined = db.or(vec![
        db.find::<Sample>().matching("IntField", 1),
        db.find::<Sample>().matching("IntField", 4),
        db.find::<Sample>().matching("IntField", 2),
    ]);
    assert_eq!(
        combined.ids().unwrap().into_vec(),
        vec![samples[4].id, samples[2].id, samples[1].id]
    );

    let oldest = combined.sort(SortOrder::OldestFirst);
    assert_eq!(
        oldest.ids().unwrap().into_vec(),
        vec![samples[1].id, samples[2].id, samples[4].id]
    );
}

#[test]
fn test_configured_combined_order() {
    init_tracing();
    let config = DatabaseConfig::from_toml_str("combined_order = \"oldest_first\"").unwrap();
    let db = Database::with_config(MemoryStore::new(), config);
    let mut samples: Vec<Sample> = (0..5).map(sample).collect();
    db.save(&mut samples).unwrap();

    let ids = db
        .find::<Sample>()
        .range("IntField", Some(0), Some(3))
        .matching("bool_field", true)
        .ids()
        .unwrap();
    assert_eq!(ids.into_vec(), vec![samples[0].id, samples[2].id]);
}

#[test]
fn test_limit_and_offset_apply_after_combination() {
    let (db, _) = setup(0..10);
    let combined = db
        .or(vec![
            db.find::<Sample>().range("IntField", Some(0), Some(2)),
            db.find::<Sample>().range("IntField", Some(6), Some(9)),
        ])
        .sort(SortOrder::OldestFirst)
        .offset(2)
        .limit(3);
    assert_eq!(ints_of(&combined.run().unwrap()), vec![2, 6, 7]);
}

// =============================================================================
// PREDICATES OF ONE QUERY
// =============================================================================

#[test]
fn test_predicates_default_to_and() {
    let (db, samples) = setup(1..=10);
    let ids = db
        .find::<Sample>()
        .range("IntField", Some(1), Some(5))
        .matching("StringField", "int-2")
        .ids()
        .unwrap();
    assert_eq!(ids.as_slice(), &[samples[1].id]);
}

#[test]
fn test_predicates_with_or() {
    let (db, _) = setup(0..10);
    let found = db
        .find::<Sample>()
        .matching("IntField", 1)
        .matching("IntField", 8)
        .starts_with("StringField", "int-5")
        .or()
        .sort(SortOrder::OldestFirst)
        .run()
        .unwrap();
    assert_eq!(ints_of(&found), vec![1, 5, 8]);
}

#[test]
fn test_predicates_share_date_window() {
    let (db, _) = setup_dated(1..=10);
    let found = db
        .find::<Sample>()
        .range("IntField", Some(1), Some(9))
        .matching("bool_field", false)
        .from(day(4))
        .sort(SortOrder::OldestFirst)
        .run()
        .unwrap();
    assert_eq!(ints_of(&found), vec![5, 7, 9]);
}

// =============================================================================
// FAILURES
// =============================================================================

#[test]
fn test_failing_sub_query_fails_combination() {
    let (db, _) = setup(0..5);
    let combined = db.and(vec![
        db.find::<Sample>().matching("IntField", 1),
        db.find::<Sample>().matching("colour", "red"),
        db.find::<Sample>().starts_with("StringField", ""),
    ]);
    assert_eq!(
        combined.ids().unwrap_err(),
        Error::UnknownIndex("colour".to_string())
    );
}
