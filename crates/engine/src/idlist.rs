//! ID lists and their set algebra
//!
//! Scans produce an [`IdList`] in iterator order. Combining sub-query results
//! with AND / OR goes through [`intersection`] and [`union`], which both
//! deduplicate and re-sort the output by creation time.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tormenta_core::Id;

/// Order of combined results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recently created first
    #[default]
    NewestFirst,
    /// Oldest first
    OldestFirst,
}

/// How sub-query results are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Combinator {
    /// Ids present in every list
    #[default]
    And,
    /// Ids present in any list
    Or,
}

impl Combinator {
    /// Combine `lists` and sort the result
    pub fn apply(self, lists: &[IdList], order: SortOrder) -> IdList {
        match self {
            Combinator::And => intersection(lists, order),
            Combinator::Or => union(lists, order),
        }
    }
}

/// Ordered sequence of entity ids, possibly with duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdList(Vec<Id>);

impl IdList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an id
    pub fn push(&mut self, id: Id) {
        self.0.push(id);
    }

    /// Number of ids, counting duplicates
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ids in list order
    pub fn iter(&self) -> std::slice::Iter<'_, Id> {
        self.0.iter()
    }

    /// Ids as a slice
    pub fn as_slice(&self) -> &[Id] {
        &self.0
    }

    /// Unwrap into the inner vector
    pub fn into_vec(self) -> Vec<Id> {
        self.0
    }

    /// Sort by creation time
    pub fn sort(&mut self, order: SortOrder) {
        match order {
            SortOrder::OldestFirst => self.0.sort_unstable(),
            SortOrder::NewestFirst => self.0.sort_unstable_by(|a, b| b.cmp(a)),
        }
    }

    /// Drop repeated ids, keeping the first occurrence of each
    pub fn dedup(&mut self) {
        let mut seen = HashSet::with_capacity(self.0.len());
        self.0.retain(|id| seen.insert(*id));
    }

    /// Skip `offset` ids, then keep at most `limit` (0 keeps all)
    pub fn paginate(&mut self, offset: usize, limit: usize) {
        let offset = offset.min(self.0.len());
        self.0.drain(..offset);
        if limit > 0 {
            self.0.truncate(limit);
        }
    }

    /// Ids as a set, for membership tests
    pub fn to_set(&self) -> HashSet<Id> {
        self.0.iter().copied().collect()
    }
}

impl From<Vec<Id>> for IdList {
    fn from(ids: Vec<Id>) -> Self {
        Self(ids)
    }
}

impl FromIterator<Id> for IdList {
    fn from_iter<I: IntoIterator<Item = Id>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for IdList {
    type Item = Id;
    type IntoIter = std::vec::IntoIter<Id>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a IdList {
    type Item = &'a Id;
    type IntoIter = std::slice::Iter<'a, Id>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Ids appearing in any of `lists` (OR)
pub fn union(lists: &[IdList], order: SortOrder) -> IdList {
    let all: HashSet<Id> = lists.iter().flat_map(|list| list.iter().copied()).collect();
    let mut result: IdList = all.into_iter().collect();
    result.sort(order);
    result
}

/// Ids appearing in every one of `lists` (AND)
///
/// Duplicates within one list count once. No lists gives an empty result;
/// a single list gives that list deduplicated.
pub fn intersection(lists: &[IdList], order: SortOrder) -> IdList {
    if lists.is_empty() {
        return IdList::new();
    }

    let mut counts: HashMap<Id, usize> = HashMap::new();
    for list in lists {
        for id in list.to_set() {
            *counts.entry(id).or_default() += 1;
        }
    }

    let mut result: IdList = counts
        .into_iter()
        .filter(|(_, count)| *count == lists.len())
        .map(|(id, _)| id)
        .collect();
    result.sort(order);
    result
}
