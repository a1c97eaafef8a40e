//! Persistence Tests
//!
//! Save, update and delete must keep content keys and index keys in step.

use crate::common::*;

// =============================================================================
// SAVE / GET
// =============================================================================

#[test]
fn test_get_roundtrip() {
    let (db, samples) = setup(0..3);
    for sample in &samples {
        assert_eq!(db.get::<Sample>(sample.id).unwrap().as_ref(), Some(sample));
    }
    assert!(db.get::<Sample>(Id::new()).unwrap().is_none());
}

#[test]
fn test_explicit_ids_are_kept() {
    init_tracing();
    let db = Database::in_memory();
    let id = Id::at(day(15));
    let mut samples = vec![Sample { id, ..sample(1) }];
    db.save(&mut samples).unwrap();
    assert_eq!(samples[0].id, id);
    assert_eq!(db.get::<Sample>(id).unwrap().map(|s| s.int_field), Some(1));
}

#[test]
fn test_save_nothing() {
    init_tracing();
    let db = Database::in_memory();
    assert_eq!(db.save::<Sample>(&mut []).unwrap(), 0);
    assert!(db.store().is_empty());
}

// =============================================================================
// UPDATE
// =============================================================================

#[test]
fn test_update_moves_entity_between_index_values() {
    let (db, mut samples) = setup(0..5);
    samples[1].int_field = 40;
    samples[1].tags = vec!["moved".to_string()];
    samples[1].notes = "relocated".to_string();
    db.save(&mut samples[1..2]).unwrap();

    assert_eq!(db.find::<Sample>().matching("IntField", 1).count().unwrap(), 0);
    assert_eq!(db.find::<Sample>().matching("IntField", 40).count().unwrap(), 1);
    assert_eq!(db.find::<Sample>().matching("tags", "all").count().unwrap(), 4);
    assert_eq!(db.find::<Sample>().matching("tags", "moved").count().unwrap(), 1);
    assert_eq!(db.find::<Sample>().matching("notes", "relocated").count().unwrap(), 1);
    assert_eq!(db.find::<Sample>().matching("notes", "sample").count().unwrap(), 4);
    assert_eq!(
        db.find::<Sample>()
            .sum("IntField", Accumulator::Int(0))
            .unwrap(),
        Accumulator::Int(40 + 2 + 3 + 4)
    );
}

#[test]
fn test_update_keeps_creation_position() {
    let (db, mut samples) = setup(0..5);
    samples[2].string_field = "renamed".to_string();
    db.save(&mut samples).unwrap();

    let ids = db.find::<Sample>().ids().unwrap();
    assert_eq!(ids.into_vec(), ids_of(&samples));
    assert_eq!(
        db.get::<Sample>(samples[2].id).unwrap().unwrap().string_field,
        "renamed"
    );
}

#[test]
fn test_repeated_saves_leave_no_stale_keys() {
    let (db, mut samples) = setup(0..3);
    let keys_before = db.store().len();
    for round in 0..5 {
        for s in samples.iter_mut() {
            s.int_field += round;
        }
        db.save(&mut samples).unwrap();
    }
    assert_eq!(db.store().len(), keys_before);
}

// =============================================================================
// DELETE
// =============================================================================

#[test]
fn test_delete_removes_from_every_index() {
    let (db, samples) = setup(0..6);
    let removed = db
        .delete::<Sample>(&[samples[0].id, samples[3].id])
        .unwrap();
    assert_eq!(removed, 2);

    assert_eq!(db.find::<Sample>().count().unwrap(), 4);
    assert_eq!(db.find::<Sample>().matching("tags", "mod-0").count().unwrap(), 0);
    assert_eq!(db.find::<Sample>().matching("tags", "all").count().unwrap(), 4);
    assert_eq!(
        db.find::<Sample>()
            .range("IntField", Some(0), Some(5))
            .count()
            .unwrap(),
        4
    );
    assert!(db.get::<Sample>(samples[0].id).unwrap().is_none());
}

#[test]
fn test_delete_everything_empties_the_store() {
    let (db, samples) = setup(0..4);
    assert_eq!(db.delete::<Sample>(&ids_of(&samples)).unwrap(), 4);
    assert!(db.store().is_empty());
}

#[test]
fn test_delete_unknown_ids() {
    let (db, _) = setup(0..2);
    assert_eq!(db.delete::<Sample>(&[Id::new(), Id::nil()]).unwrap(), 0);
    assert_eq!(db.find::<Sample>().count().unwrap(), 2);
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn test_queries_run_alongside_writers() {
    let (db, _) = setup(0..20);
    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 20..40 {
                db.save(&mut [sample(i)]).unwrap();
            }
        });
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..20 {
                    let count = db
                        .find::<Sample>()
                        .range("IntField", Some(0), Some(19))
                        .count()
                        .unwrap();
                    assert_eq!(count, 20);
                    let combined = db
                        .find::<Sample>()
                        .range("IntField", Some(0), Some(9))
                        .matching("tags", "all")
                        .count()
                        .unwrap();
                    assert_eq!(combined, 10);
                }
            });
        }
    });
    assert_eq!(db.find::<Sample>().count().unwrap(), 40);
}
