//! Quick Sum Tests
//!
//! Sums are decoded from index keys; each result is checked against a total
//! computed from the saved entities themselves.

use crate::common::*;

fn in_range(samples: &[Sample], low: i32, high: i32) -> Vec<&Sample> {
    samples
        .iter()
        .filter(|s| s.int_field >= low && s.int_field <= high)
        .collect()
}

#[test]
fn test_sum_over_range_matches_field_values() {
    let (db, samples) = setup(-30..=100);
    let expected: i64 = in_range(&samples, -10, 50)
        .iter()
        .map(|s| s.int_field as i64)
        .sum();
    let total = db
        .find::<Sample>()
        .range("IntField", Some(-10), Some(50))
        .sum("IntField", Accumulator::Int(0))
        .unwrap();
    assert_eq!(total, Accumulator::Int(expected));
}

#[test]
fn test_sum_for_each_numeric_kind() {
    let (db, samples) = setup(-20..=20);
    let query = || db.find::<Sample>().range("IntField", Some(-5), Some(12));
    let picked = in_range(&samples, -5, 12);

    let i8_total = query().sum("i8_field", Accumulator::I8(0)).unwrap();
    let expected = picked.iter().fold(0i8, |acc, s| acc.wrapping_add(s.i8_field));
    assert_eq!(i8_total, Accumulator::I8(expected));

    let i16_total = query().sum("i16_field", Accumulator::I16(0)).unwrap();
    let expected = picked.iter().map(|s| s.i16_field).sum::<i16>();
    assert_eq!(i16_total, Accumulator::I16(expected));

    let i64_total = query().sum("i64_field", Accumulator::I64(0)).unwrap();
    let expected = picked.iter().map(|s| s.i64_field).sum::<i64>();
    assert_eq!(i64_total, Accumulator::I64(expected));

    let u16_total = query().sum("u16_field", Accumulator::U16(0)).unwrap();
    let expected = picked.iter().map(|s| s.u16_field).sum::<u16>();
    assert_eq!(u16_total, Accumulator::U16(expected));

    let u64_total = query().sum("u64_field", Accumulator::U64(0)).unwrap();
    let expected = picked.iter().map(|s| s.u64_field).sum::<u64>();
    assert_eq!(u64_total, Accumulator::U64(expected));

    let f32_total = query().sum("f32_field", Accumulator::F32(0.0)).unwrap();
    let expected = picked.iter().map(|s| s.f32_field as f64).sum::<f64>();
    assert!((f32_total.as_f64() - expected).abs() < 1e-3);

    let f64_total = query().sum("f64_field", Accumulator::F64(0.0)).unwrap();
    let expected = picked.iter().map(|s| s.f64_field).sum::<f64>();
    assert!((f64_total.as_f64() - expected).abs() < 1e-9);
}

#[test]
fn test_sum_on_the_predicate_index() {
    let (db, samples) = setup(0..50);
    let expected: f64 = samples
        .iter()
        .filter(|s| s.f64_field >= 10.0 && s.f64_field <= 40.0)
        .map(|s| s.f64_field)
        .sum();
    let total = db
        .find::<Sample>()
        .range("f64_field", Some(10.0), Some(40.0))
        .sum("f64_field", Accumulator::F64(0.0))
        .unwrap();
    assert_eq!(total, Accumulator::F64(expected));
}

#[test]
fn test_sum_without_predicate_covers_everything() {
    let (db, samples) = setup(1..=10);
    let total = db
        .find::<Sample>()
        .sum("u64_field", Accumulator::U64(0))
        .unwrap();
    assert_eq!(
        total,
        Accumulator::U64(samples.iter().map(|s| s.u64_field).sum())
    );
}

#[test]
fn test_sum_respects_date_window() {
    let (db, _) = setup_dated(1..=10);
    let total = db
        .find::<Sample>()
        .range("IntField", Some(1), None)
        .from(day(8))
        .sum("IntField", Accumulator::Int(0))
        .unwrap();
    assert_eq!(total, Accumulator::Int(8 + 9 + 10));
}

#[test]
fn test_sum_over_match_and_limit() {
    init_tracing();
    let db = Database::in_memory();
    let mut samples: Vec<Sample> = [4, 4, 4, 7].into_iter().map(sample).collect();
    db.save(&mut samples).unwrap();

    let all_fours = db
        .find::<Sample>()
        .matching("IntField", 4)
        .sum("IntField", Accumulator::Int(0))
        .unwrap();
    assert_eq!(all_fours, Accumulator::Int(12));

    let two_fours = db
        .find::<Sample>()
        .matching("IntField", 4)
        .limit(2)
        .sum("IntField", Accumulator::Int(0))
        .unwrap();
    assert_eq!(two_fours, Accumulator::Int(8));
}

#[test]
fn test_sum_starts_from_given_total() {
    let (db, _) = setup(1..=3);
    let total = db
        .find::<Sample>()
        .sum("IntField", Accumulator::Int(100))
        .unwrap();
    assert_eq!(total, Accumulator::Int(106));
}

#[test]
fn test_sum_rejects_wrong_accumulator_and_non_numeric_index() {
    let (db, _) = setup(1..=3);
    assert!(matches!(
        db.find::<Sample>()
            .sum("IntField", Accumulator::F64(0.0))
            .unwrap_err(),
        Error::TypeMismatch(_)
    ));
    assert_eq!(
        db.find::<Sample>()
            .sum("StringField", Accumulator::Int(0))
            .unwrap_err(),
        Error::NotNumeric("stringfield".to_string())
    );
    assert_eq!(
        db.find::<Sample>()
            .sum("bool_field", Accumulator::Int(0))
            .unwrap_err(),
        Error::NotNumeric("bool_field".to_string())
    );
}
