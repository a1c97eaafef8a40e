//! Scan execution
//!
//! Drives a cursor over one [`ScanPlan`]. Per key, in order:
//! 1. stop when the key leaves `valid_to`
//! 2. stop when `limit` keys have been retained
//! 3. stop when the key is past `compare_to`
//! 4. skip keys whose id falls outside the date window
//! 5. skip the first `offset` remaining keys
//! 6. hand the key to the visitor

use std::collections::HashSet;

use tormenta_core::{keys, Id};
use tormenta_storage::{Cursor, ReadTransaction};
use tracing::debug;

use crate::aggregate::Accumulator;
use crate::error::{Error, Result};
use crate::idlist::IdList;
use crate::plan::ScanPlan;

/// Run `plan`, calling `visit` with every retained key
///
/// Returns the number of retained keys.
pub fn execute<T, F>(txn: &T, plan: &ScanPlan, mut visit: F) -> Result<usize>
where
    T: ReadTransaction,
    F: FnMut(&[u8]) -> Result<()>,
{
    let mut cursor = txn.cursor(plan.direction)?;
    cursor.seek(&plan.seek_from)?;

    let mut scanned = 0usize;
    let mut retained = 0usize;
    let mut skipped = 0usize;

    while cursor.valid_for_prefix(&plan.valid_to) {
        if plan.limit > 0 && retained >= plan.limit {
            break;
        }
        let Some(key) = cursor.key() else {
            break;
        };
        if let Some(boundary) = &plan.compare_to {
            if !keys::is_within(boundary, key, plan.is_reverse(), plan.strip) {
                break;
            }
        }
        scanned += 1;

        let in_window = match &plan.window {
            Some(window) => keys::extract_id(key).is_some_and(|id| window.contains(&id)),
            None => true,
        };
        if in_window {
            if skipped < plan.offset {
                skipped += 1;
            } else {
                visit(key)?;
                retained += 1;
            }
        }

        cursor.next()?;
    }

    debug!(target: "tormenta::query", scanned, retained, skipped, "Scan finished");
    Ok(retained)
}

/// Run `plan` and collect the id of every retained key
pub fn collect_ids<T: ReadTransaction>(txn: &T, plan: &ScanPlan) -> Result<IdList> {
    let mut ids = IdList::new();
    execute(txn, plan, |key| {
        ids.push(id_of(key)?);
        Ok(())
    })?;
    Ok(ids)
}

/// Run an index `plan`, adding the value of every retained key to `acc`
///
/// With `only` set, keys whose id is not in the set are ignored.
pub fn accumulate<T: ReadTransaction>(
    txn: &T,
    plan: &ScanPlan,
    root: &str,
    index: &str,
    only: Option<&HashSet<Id>>,
    acc: &mut Accumulator,
) -> Result<()> {
    execute(txn, plan, |key| {
        if let Some(only) = only {
            if !only.contains(&id_of(key)?) {
                return Ok(());
            }
        }
        let segment = keys::index_value_segment(key, root, index).ok_or_else(|| {
            Error::Codec(tormenta_core::CodecError::MalformedKey(format!(
                "index key without a {} value",
                index
            )))
        })?;
        acc.add_encoded(segment)
    })?;
    Ok(())
}

fn id_of(key: &[u8]) -> Result<Id> {
    keys::extract_id(key).ok_or_else(|| {
        Error::Codec(tormenta_core::CodecError::MalformedKey(format!(
            "{} byte key has no id",
            key.len()
        )))
    })
}
