//! Query builder and executor
//!
//! A [`Query`] is built fluently from a [`Database`] handle and executed with
//! one of [`Query::ids`], [`Query::run`], [`Query::count`], [`Query::first`]
//! or [`Query::sum`]:
//!
//! ```text
//! let paid = db
//!     .find::<Order>()
//!     .matching("status", "paid")
//!     .range("total", Some(10.0), Some(50.0))
//!     .from(yesterday)
//!     .reverse()
//!     .limit(20)
//!     .run()?;
//! ```
//!
//! Builder methods never fail. The first invalid call is remembered and
//! returned by the executor before any scan runs.
//!
//! ## Execution paths
//!
//! | Query shape                | Execution                                        |
//! |----------------------------|--------------------------------------------------|
//! | no predicate               | one content scan, limit/offset in the scan       |
//! | one predicate              | one index scan, limit/offset in the scan         |
//! | several predicates         | concurrent sub-scans, AND / OR, then paginate    |
//! | combined (`Database::and`) | stored id list, re-sorted, then paginate         |
//! | `order_by`                 | matching ids, walked in index order, paginate    |

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use tormenta_core::{Id, Value, ValueKind};
use tormenta_storage::Store;
use tracing::debug;

use crate::aggregate::Accumulator;
use crate::context::Context;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::idlist::{Combinator, IdList, SortOrder};
use crate::plan::{Predicate, ScanPlan, ScanSpec};
use crate::scan;
use crate::schema::Entity;

/// Fluent query over one entity type
pub struct Query<'db, E: Entity, S: Store> {
    db: &'db Database<S>,
    from: Option<Id>,
    to: Option<Id>,
    reverse: bool,
    limit: usize,
    offset: usize,
    predicates: Vec<Predicate>,
    combinator: Combinator,
    order_by: Option<String>,
    sort: Option<SortOrder>,
    materialized: Option<IdList>,
    context: Option<Context>,
    error: Option<Error>,
    _entity: PhantomData<fn() -> E>,
}

impl<'db, E: Entity, S: Store> Query<'db, E, S> {
    pub(crate) fn new(db: &'db Database<S>) -> Self {
        Query {
            db,
            from: None,
            to: None,
            reverse: false,
            limit: 0,
            offset: 0,
            predicates: Vec::new(),
            combinator: Combinator::And,
            order_by: None,
            sort: None,
            materialized: None,
            context: None,
            error: None,
            _entity: PhantomData,
        }
    }

    /// Query whose ids were already computed by combining other queries
    pub(crate) fn combined(db: &'db Database<S>, ids: IdList) -> Self {
        let mut query = Self::new(db);
        query.materialized = Some(ids);
        query
    }

    pub(crate) fn failed(db: &'db Database<S>, error: Error) -> Self {
        let mut query = Self::new(db);
        query.error = Some(error);
        query
    }

    // ========================================
    // Predicates
    // ========================================

    /// Entities whose `index` value equals `value`
    ///
    /// The value is converted to the field's kind first; string comparisons
    /// ignore case.
    pub fn matching(self, index: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        let predicate = lookup::<E>(index).and_then(|(name, kind)| {
            Ok(Predicate::Match {
                value: coerce(value, kind, &name)?,
                index: name,
            })
        });
        self.push(predicate)
    }

    /// Entities whose `index` value lies in `start..=end`
    ///
    /// Either bound may be `None` for an open-ended range, but not both.
    /// Equal bounds are run as an exact match.
    pub fn range<V: Into<Value>>(self, index: &str, start: Option<V>, end: Option<V>) -> Self {
        let start = start.map(Into::into);
        let end = end.map(Into::into);
        let predicate = lookup::<E>(index).and_then(|(name, kind)| {
            if let (Some(s), Some(e)) = (&start, &end) {
                if s.kind() != e.kind() {
                    return Err(Error::type_mismatch(format!(
                        "Range start ({}) and end ({}) must be of the same kind",
                        s.kind(),
                        e.kind()
                    )));
                }
            }
            let start = start.map(|v| coerce(v, kind, &name)).transpose()?;
            let end = end.map(|v| coerce(v, kind, &name)).transpose()?;
            match (start, end) {
                (None, None) => Err(Error::invalid_predicate(
                    "Nil from both ends of the range is not a valid input for an index range search",
                )),
                (Some(s), Some(e)) if s.encode() == e.encode() => Ok(Predicate::Match {
                    index: name,
                    value: s,
                }),
                (start, end) => Ok(Predicate::Range {
                    index: name,
                    start,
                    end,
                }),
            }
        });
        self.push(predicate)
    }

    /// Entities whose string `index` value starts with `prefix`, ignoring case
    ///
    /// Always scans forward; [`Query::reverse`] is ignored for this predicate.
    pub fn starts_with(self, index: &str, prefix: &str) -> Self {
        let predicate = lookup::<E>(index).and_then(|(name, kind)| {
            if prefix.is_empty() {
                return Err(Error::invalid_predicate(
                    "Blank string is not valid input for 'starts with' query",
                ));
            }
            if kind != ValueKind::Str {
                return Err(Error::type_mismatch(format!(
                    "'starts with' needs a string index, {} is {}",
                    name, kind
                )));
            }
            Ok(Predicate::StartsWith {
                index: name,
                prefix: prefix.to_string(),
            })
        });
        self.push(predicate)
    }

    fn push(mut self, predicate: Result<Predicate>) -> Self {
        if self.error.is_some() {
            return self;
        }
        if self.materialized.is_some() {
            self.error = Some(Error::invalid_input(
                "Predicates cannot be added to a combined query",
            ));
            return self;
        }
        match predicate {
            Ok(p) => self.predicates.push(p),
            Err(e) => self.error = Some(e),
        }
        self
    }

    // ========================================
    // Modifiers
    // ========================================

    /// Only entities created at or after `time`
    pub fn from(mut self, time: DateTime<Utc>) -> Self {
        self.from = Some(Id::lower_bound(time));
        self
    }

    /// Only entities created at or before `time`
    pub fn to(mut self, time: DateTime<Utc>) -> Self {
        self.to = Some(Id::upper_bound(time));
        self
    }

    /// Date window given directly as boundary ids, both inclusive
    pub fn between_ids(mut self, lower: Id, upper: Id) -> Self {
        self.from = Some(lower);
        self.to = Some(upper);
        self
    }

    /// Newest (or highest value) first
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Return at most `n` results
    ///
    /// A limit can only be lowered; `0` leaves the current limit in place.
    pub fn limit(mut self, n: usize) -> Self {
        if n > 0 && (self.limit == 0 || n < self.limit) {
            self.limit = n;
        }
        self
    }

    /// Skip the first `n` results
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = n;
        self
    }

    /// Combine this query's predicates with OR
    pub fn or(mut self) -> Self {
        self.combinator = Combinator::Or;
        self
    }

    /// Combine this query's predicates with AND (the default)
    pub fn and(mut self) -> Self {
        self.combinator = Combinator::And;
        self
    }

    /// Return results in the value order of `index`
    pub fn order_by(mut self, index: &str) -> Self {
        match lookup::<E>(index) {
            Ok((name, _)) => self.order_by = Some(name),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Order of combined results; defaults to the database configuration
    pub fn sort(mut self, order: SortOrder) -> Self {
        self.sort = Some(order);
        self
    }

    /// Context handed to `post_get` on every entity this query loads
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Whether the query holds a stored id list from a combination
    pub fn is_combined(&self) -> bool {
        self.materialized.is_some()
    }

    // ========================================
    // Executors
    // ========================================

    /// Matching ids
    pub fn ids(&self) -> Result<IdList> {
        self.collect(self.limit)
    }

    /// Matching entities
    ///
    /// # Errors
    ///
    /// [`Error::EntityNotFound`] if a matching id has no record, which can
    /// happen when a delete lands between the scan and the load.
    pub fn run(&self) -> Result<Vec<E>> {
        let ids = self.ids()?;
        self.hydrate(&ids)
    }

    /// Number of matching entities
    pub fn count(&self) -> Result<usize> {
        self.check()?;
        if self.is_single_scan() {
            let txn = self.db.store().begin_read()?;
            let plan = self.plan(self.predicates.first().cloned(), self.limit, self.offset);
            return scan::execute(&txn, &plan, |_| Ok(()));
        }
        Ok(self.ids()?.len())
    }

    /// First matching entity
    pub fn first(&self) -> Result<Option<E>> {
        let ids = self.collect(1)?;
        Ok(self.hydrate(&ids)?.into_iter().next())
    }

    /// Sum the values of numeric `index` over the matching entities
    ///
    /// Values are read from the index keys; no record is loaded. `acc` is
    /// the starting total and must be of the index's kind.
    pub fn sum(&self, index: &str, mut acc: Accumulator) -> Result<Accumulator> {
        self.check()?;
        let schema = E::schema();
        let field = schema.index(index)?;
        if !field.kind().is_numeric() {
            return Err(Error::NotNumeric(field.name().to_string()));
        }
        if field.kind() != acc.kind() {
            return Err(Error::type_mismatch(format!(
                "Cannot sum {} index {} into a {} accumulator",
                field.kind(),
                field.name(),
                acc.kind()
            )));
        }

        let on_summed_index = self.is_single_scan()
            && self
                .predicates
                .first()
                .is_some_and(|p| p.index() == field.name());

        if on_summed_index {
            let txn = self.db.store().begin_read()?;
            let plan = self.plan(self.predicates.first().cloned(), self.limit, self.offset);
            scan::accumulate(&txn, &plan, schema.root(), field.name(), None, &mut acc)?;
        } else {
            let only = self.ids()?.to_set();
            let txn = self.db.store().begin_read()?;
            let plan = ScanPlan::prepare(
                &ScanSpec {
                    root: schema.root().to_string(),
                    predicate: Some(whole_index(field.name())),
                    ..ScanSpec::default()
                },
                tormenta_core::id::now(),
            );
            scan::accumulate(&txn, &plan, schema.root(), field.name(), Some(&only), &mut acc)?;
        }

        debug!(target: "tormenta::query", index = field.name(), fast = on_summed_index, "Summed index");
        Ok(acc)
    }

    // ========================================
    // Internals
    // ========================================

    fn check(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn is_single_scan(&self) -> bool {
        self.materialized.is_none() && self.order_by.is_none() && self.predicates.len() <= 1
    }

    fn sort_order(&self) -> SortOrder {
        self.sort.unwrap_or(self.db.config().combined_order)
    }

    fn plan(&self, predicate: Option<Predicate>, limit: usize, offset: usize) -> ScanPlan {
        let spec = ScanSpec {
            root: E::schema().root().to_string(),
            predicate,
            from: self.from,
            to: self.to,
            reverse: self.reverse,
            limit,
            offset,
        };
        ScanPlan::prepare(&spec, tormenta_core::id::now())
    }

    fn collect(&self, limit: usize) -> Result<IdList> {
        self.check()?;

        if let Some(index) = &self.order_by {
            let matching = self.matching_ids()?.to_set();
            let mut ids = self.ordered_by(index, &matching)?;
            ids.paginate(self.offset, limit);
            return Ok(ids);
        }

        if self.is_single_scan() {
            let txn = self.db.store().begin_read()?;
            let plan = self.plan(self.predicates.first().cloned(), limit, self.offset);
            return scan::collect_ids(&txn, &plan);
        }

        let mut ids = self.matching_ids()?;
        if self.materialized.is_some() {
            ids.sort(self.sort_order());
        }
        ids.paginate(self.offset, limit);
        Ok(ids)
    }

    /// Every matching id, before pagination
    fn matching_ids(&self) -> Result<IdList> {
        if let Some(ids) = &self.materialized {
            return Ok(ids.clone());
        }
        match self.predicates.as_slice() {
            [] => self.scan_ids(None),
            [predicate] => self.scan_ids(Some(predicate.clone())),
            predicates => {
                let lists = join_all(
                    predicates
                        .iter()
                        .map(|p| move || self.scan_ids(Some(p.clone())))
                        .collect(),
                )?;
                let ids = self.combinator.apply(&lists, self.sort_order());
                debug!(
                    target: "tormenta::query",
                    sub_queries = lists.len(),
                    combinator = ?self.combinator,
                    results = ids.len(),
                    "Combined predicates"
                );
                Ok(ids)
            }
        }
    }

    fn scan_ids(&self, predicate: Option<Predicate>) -> Result<IdList> {
        let txn = self.db.store().begin_read()?;
        scan::collect_ids(&txn, &self.plan(predicate, 0, 0))
    }

    /// Walk `index` in value order, keeping each id of `matching` once
    fn ordered_by(&self, index: &str, matching: &HashSet<Id>) -> Result<IdList> {
        let txn = self.db.store().begin_read()?;
        let spec = ScanSpec {
            root: E::schema().root().to_string(),
            predicate: Some(whole_index(index)),
            reverse: self.reverse,
            ..ScanSpec::default()
        };
        let plan = ScanPlan::prepare(&spec, tormenta_core::id::now());
        let mut ids: IdList = scan::collect_ids(&txn, &plan)?
            .into_iter()
            .filter(|id| matching.contains(id))
            .collect();
        ids.dedup();
        Ok(ids)
    }

    fn hydrate(&self, ids: &IdList) -> Result<Vec<E>> {
        let txn = self.db.store().begin_read()?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match self.db.load::<E, _>(&txn, id, self.context.as_ref())? {
                Some(entity) => out.push(entity),
                None => return Err(Error::EntityNotFound(*id)),
            }
        }
        Ok(out)
    }
}

impl<E: Entity, S: Store> fmt::Debug for Query<'_, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("root", &E::schema().root())
            .field("from", &self.from)
            .field("to", &self.to)
            .field("reverse", &self.reverse)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("predicates", &self.predicates)
            .field("combinator", &self.combinator)
            .field("order_by", &self.order_by)
            .field("combined", &self.materialized.as_ref().map(IdList::len))
            .field("context", &self.context)
            .field("error", &self.error)
            .finish()
    }
}

/// Combine the results of `queries`
///
/// Queries that are already combined contribute their stored ids; the rest
/// run concurrently. Any failure fails the whole combination.
pub(crate) fn combine<'db, E: Entity, S: Store>(
    db: &'db Database<S>,
    combinator: Combinator,
    queries: Vec<Query<'db, E, S>>,
) -> Query<'db, E, S> {
    let (ready, pending): (Vec<_>, Vec<_>) = queries.iter().partition(|q| q.is_combined());

    let lists = ready
        .iter()
        .map(|q| q.ids())
        .collect::<Result<Vec<_>>>()
        .and_then(|mut lists| {
            lists.extend(join_all(
                pending.into_iter().map(|q| move || q.ids()).collect(),
            )?);
            Ok(lists)
        });

    match lists {
        Ok(lists) => {
            let ids = combinator.apply(&lists, db.config().combined_order);
            debug!(
                target: "tormenta::query",
                queries = lists.len(),
                combinator = ?combinator,
                results = ids.len(),
                "Combined queries"
            );
            Query::combined(db, ids)
        }
        Err(e) => Query::failed(db, e),
    }
}

/// Run every job on its own scoped thread and wait for all of them
///
/// Results keep job order. The first error (in job order) is returned once
/// every job has finished; a panicking job is re-raised.
fn join_all<T, F>(jobs: Vec<F>) -> Result<Vec<T>>
where
    T: Send,
    F: FnOnce() -> Result<T> + Send,
{
    std::thread::scope(|s| {
        let handles: Vec<_> = jobs.into_iter().map(|job| s.spawn(job)).collect();
        let mut results = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(value)) => results.push(value),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    })
}

/// Name and kind of a queryable field
fn lookup<E: Entity>(index: &str) -> Result<(String, ValueKind)> {
    let field = E::schema().index(index)?;
    Ok((field.name().to_string(), field.kind()))
}

fn coerce(value: Value, kind: ValueKind, index: &str) -> Result<Value> {
    value
        .coerce(kind)
        .map_err(|e| Error::type_mismatch(format!("index {}: {}", index, e)))
}

/// Range predicate covering every value of `index`
fn whole_index(index: &str) -> Predicate {
    Predicate::Range {
        index: index.to_string(),
        start: None,
        end: None,
    }
}
