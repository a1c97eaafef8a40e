//! Limit / Offset Tests

use crate::common::*;

const N: usize = 10;

fn expected(limit: usize, offset: usize) -> usize {
    let remaining = N.saturating_sub(offset);
    if limit == 0 {
        remaining
    } else {
        limit.min(remaining)
    }
}

#[test]
fn test_result_count_follows_limit_and_offset() {
    let (db, _) = setup(0..N as i32);
    for limit in 0..=N + 2 {
        for offset in 0..=N + 2 {
            let plain = db.find::<Sample>().limit(limit).offset(offset);
            assert_eq!(plain.ids().unwrap().len(), expected(limit, offset), "plain {limit}/{offset}");
            assert_eq!(plain.count().unwrap(), expected(limit, offset));

            let ranged = db
                .find::<Sample>()
                .range("IntField", Some(0), None)
                .reverse()
                .limit(limit)
                .offset(offset);
            assert_eq!(ranged.ids().unwrap().len(), expected(limit, offset), "range {limit}/{offset}");
        }
    }
}

#[test]
fn test_offset_skips_in_scan_order() {
    let (db, _) = setup(0..10);
    let found = db
        .find::<Sample>()
        .range("IntField", Some(2), None)
        .offset(3)
        .limit(2)
        .run()
        .unwrap();
    assert_eq!(ints_of(&found), vec![5, 6]);

    let found = db
        .find::<Sample>()
        .range("IntField", Some(2), None)
        .reverse()
        .offset(3)
        .limit(2)
        .run()
        .unwrap();
    assert_eq!(ints_of(&found), vec![6, 5]);
}

#[test]
fn test_offset_applies_after_date_filter() {
    let (db, _) = setup_dated(1..=10);
    let found = db
        .find::<Sample>()
        .range("IntField", Some(1), None)
        .from(day(5))
        .offset(1)
        .limit(2)
        .run()
        .unwrap();
    assert_eq!(ints_of(&found), vec![6, 7]);
}

#[test]
fn test_limit_cannot_be_raised() {
    let (db, _) = setup(0..10);
    let query = db.find::<Sample>().limit(3).limit(8);
    assert_eq!(query.count().unwrap(), 3);
    assert_eq!(db.first::<Sample>().limit(5).count().unwrap(), 1);
}

#[test]
fn test_multi_predicate_paging() {
    let (db, _) = setup(0..10);
    let found = db
        .find::<Sample>()
        .range("IntField", Some(1), Some(9))
        .matching("bool_field", true)
        .sort(SortOrder::OldestFirst)
        .offset(1)
        .limit(2)
        .run()
        .unwrap();
    assert_eq!(ints_of(&found), vec![4, 6]);
}

#[test]
fn test_first() {
    let (db, samples) = setup(0..5);
    assert_eq!(db.find::<Sample>().first().unwrap(), Some(samples[0].clone()));
    assert_eq!(
        db.find::<Sample>().reverse().first().unwrap(),
        Some(samples[4].clone())
    );
    assert_eq!(
        db.find::<Sample>()
            .range("IntField", Some(2), None)
            .offset(1)
            .first()
            .unwrap(),
        Some(samples[3].clone())
    );
    assert_eq!(
        db.first::<Sample>().matching("IntField", 3).run().unwrap(),
        vec![samples[3].clone()]
    );
    assert!(db
        .find::<Sample>()
        .matching("IntField", 99)
        .first()
        .unwrap()
        .is_none());
}

#[test]
fn test_order_by_with_paging() {
    init_tracing();
    let db = Database::in_memory();
    let mut samples: Vec<Sample> = [7, 3, 9, 1, 5].into_iter().map(sample).collect();
    db.save(&mut samples).unwrap();

    let found = db
        .find::<Sample>()
        .order_by("IntField")
        .offset(1)
        .limit(3)
        .run()
        .unwrap();
    assert_eq!(ints_of(&found), vec![3, 5, 7]);

    let found = db
        .find::<Sample>()
        .matching("tags", "all")
        .order_by("f64_field")
        .reverse()
        .run()
        .unwrap();
    assert_eq!(ints_of(&found), vec![9, 7, 5, 3, 1]);
}
