//! Scan planning
//!
//! A [`ScanSpec`] describes one scan declaratively. [`ScanPlan::prepare`]
//! turns it into the three boundary keys that drive a cursor:
//! - `seek_from`: where the cursor is positioned
//! - `valid_to`: prefix every visited key must share
//! - `compare_to`: optional stop boundary, checked in scan direction
//!
//! Preparation is a pure function of the spec and the current time, so a
//! spec can be re-planned and re-executed any number of times.
//!
//! ## Predicate shapes
//!
//! | Shape        | Boundaries                               | Date window           |
//! |--------------|------------------------------------------|-----------------------|
//! | none         | content keys with window ids             | in the keys           |
//! | exact match  | index keys with window ids               | in the keys           |
//! | range        | bare value keys, candidate id stripped   | post-filter on the id |
//! | starts with  | value prefix, forward only               | post-filter on the id |
//!
//! Without an explicit window, plain scans and exact matches run from the
//! epoch to now. Range and prefix scans have no implicit window.

use chrono::{DateTime, Utc};
use tormenta_core::keys::{self, SEPARATOR};
use tormenta_core::{Id, Value, ID_LEN};
use tormenta_storage::Direction;
use tracing::{debug, warn};

/// Index predicate with its values already converted to the field's kind
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Index value equals `value`
    Match {
        /// Index name
        index: String,
        /// Value to match
        value: Value,
    },
    /// Index value within `start..=end`; either end may be open
    Range {
        /// Index name
        index: String,
        /// Lower bound
        start: Option<Value>,
        /// Upper bound
        end: Option<Value>,
    },
    /// String index value starts with `prefix`
    StartsWith {
        /// Index name
        index: String,
        /// Prefix, compared case-insensitively
        prefix: String,
    },
}

impl Predicate {
    /// Index the predicate applies to
    pub fn index(&self) -> &str {
        match self {
            Predicate::Match { index, .. }
            | Predicate::Range { index, .. }
            | Predicate::StartsWith { index, .. } => index,
        }
    }
}

/// Everything a single scan needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSpec {
    /// Key root of the entity type
    pub root: String,
    /// Index predicate; `None` scans content keys
    pub predicate: Option<Predicate>,
    /// Lower date bound, as a boundary id
    pub from: Option<Id>,
    /// Upper date bound, as a boundary id
    pub to: Option<Id>,
    /// Scan newest / highest value first
    pub reverse: bool,
    /// Maximum retained keys, 0 for unbounded
    pub limit: usize,
    /// Retained keys to skip before collecting
    pub offset: usize,
}

/// Inclusive id window applied to keys after boundary checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// Lower bound
    pub from: Option<Id>,
    /// Upper bound
    pub to: Option<Id>,
}

impl DateWindow {
    /// Whether `id` lies inside the window
    pub fn contains(&self, id: &Id) -> bool {
        self.from.map_or(true, |from| *id >= from) && self.to.map_or(true, |to| *id <= to)
    }
}

/// Prepared boundary keys for one scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    /// Cursor start position
    pub seek_from: Vec<u8>,
    /// Prefix shared by every key in scope
    pub valid_to: Vec<u8>,
    /// Stop boundary, checked with [`keys::is_within`]
    pub compare_to: Option<Vec<u8>>,
    /// Strip the candidate's id before comparing with `compare_to`
    pub strip: bool,
    /// Cursor direction
    pub direction: Direction,
    /// Date filter on the key's id, for scans whose keys are not date ordered
    pub window: Option<DateWindow>,
    /// Maximum retained keys, 0 for unbounded
    pub limit: usize,
    /// Retained keys to skip
    pub offset: usize,
}

impl ScanPlan {
    /// Compute the boundary keys for `spec` as of `now`
    pub fn prepare(spec: &ScanSpec, now: DateTime<Utc>) -> ScanPlan {
        let root = spec.root.as_str();
        let from = spec.from.unwrap_or_else(|| Id::lower_bound(DateTime::<Utc>::UNIX_EPOCH));
        let to = spec.to.unwrap_or_else(|| Id::upper_bound(now));
        let user_window = (spec.from.is_some() || spec.to.is_some()).then_some(DateWindow {
            from: spec.from,
            to: spec.to,
        });

        let plan = match &spec.predicate {
            None => Self::bracketed(
                spec,
                keys::content_key(root, None),
                keys::content_key(root, Some(&from)),
                keys::content_key(root, Some(&to)),
            ),

            Some(Predicate::Match { index, value }) => {
                let value = value.encode();
                let mut valid_to = keys::index_range_key(root, index, Some(&value));
                valid_to.extend_from_slice(SEPARATOR);
                // The epoch bound is the nil id; it still has to be appended
                // or the seek lands on values extending this one.
                Self::bracketed(
                    spec,
                    valid_to,
                    keys::index_key(root, index, &value, &from),
                    keys::index_key(root, index, &value, &to),
                )
            }

            Some(Predicate::Range { index, start, end }) => {
                let start = start.as_ref().map(Value::encode);
                let end = end.as_ref().map(Value::encode);
                let valid_to = keys::index_range_key(root, index, None);
                let (seek_from, compare_to) = if spec.reverse {
                    let seek_from = match &end {
                        Some(end) => with_max_byte(keys::index_range_key(root, index, Some(end))),
                        // No encoded value starts with more than ID_LEN 0xFF bytes
                        None => {
                            let mut key = valid_to.clone();
                            key.extend_from_slice(&[0xFF; ID_LEN + 1]);
                            key
                        }
                    };
                    let compare_to = start.map(|s| keys::index_range_key(root, index, Some(&s)));
                    (seek_from, compare_to)
                } else {
                    let seek_from = keys::index_range_key(root, index, start.as_deref());
                    let compare_to = end.map(|e| keys::index_range_key(root, index, Some(&e)));
                    (seek_from, compare_to)
                };
                ScanPlan {
                    seek_from,
                    valid_to,
                    compare_to,
                    strip: true,
                    direction: Direction::from_reverse(spec.reverse),
                    window: user_window,
                    limit: spec.limit,
                    offset: spec.offset,
                }
            }

            Some(Predicate::StartsWith { index, prefix }) => {
                if spec.reverse {
                    warn!(target: "tormenta::query", index = %index, "Starts-with scans only run forward; ignoring reverse");
                }
                let prefix = Value::Str(prefix.clone()).encode();
                let valid_to = keys::index_range_key(root, index, Some(&prefix));
                ScanPlan {
                    seek_from: valid_to.clone(),
                    valid_to,
                    compare_to: None,
                    strip: false,
                    direction: Direction::Forward,
                    window: user_window,
                    limit: spec.limit,
                    offset: spec.offset,
                }
            }
        };

        debug!(
            target: "tormenta::query",
            root,
            predicate = ?spec.predicate.as_ref().map(Predicate::index),
            direction = ?plan.direction,
            limit = plan.limit,
            offset = plan.offset,
            "Prepared scan"
        );
        plan
    }

    /// Plan for keys ordered by id between `lower` and `upper`
    fn bracketed(spec: &ScanSpec, valid_to: Vec<u8>, lower: Vec<u8>, upper: Vec<u8>) -> ScanPlan {
        let (seek_from, compare_to) = if spec.reverse {
            (with_max_byte(upper), lower)
        } else {
            (lower, upper)
        };
        ScanPlan {
            seek_from,
            valid_to,
            compare_to: Some(compare_to),
            strip: false,
            direction: Direction::from_reverse(spec.reverse),
            window: None,
            limit: spec.limit,
            offset: spec.offset,
        }
    }

    /// Whether the plan walks keys backwards
    pub fn is_reverse(&self) -> bool {
        self.direction.is_reverse()
    }
}

/// Reverse seeks land on the last key `<=` the seek key; appending 0xFF
/// makes that include keys extending the boundary
fn with_max_byte(mut key: Vec<u8>) -> Vec<u8> {
    key.push(0xFF);
    key
}
