//! Per-request query context: the join cache and its identity model.
//!
//! A [`QueryContext`] lives exactly as long as one logical request. The
//! same specification tree is asked for its predicate at least twice per
//! request — once for the result set, once for the count — so joins are
//! registered lazily and realized at most once per `(alias, query)` pair.
//! Two different [`QueryId`]s never share a realized join; the count query
//! must not inherit (or duplicate) the data query's join clauses.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sift_schema::Schema;
use smol_str::SmolStr;

use crate::error::SpecResult;

/// Caller-supplied identity of one query object.
///
/// Each evaluation pass over a specification tree (data query, count query)
/// gets its own id; the join cache and the conjunction initialization
/// protocol key off it instead of pointer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(pub u64);

/// SQL join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    /// Inner join.
    Inner,
    /// Left outer join.
    Left,
}

impl JoinKind {
    /// Get the SQL keyword for this join kind.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// A join that has been materialized against a concrete query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealizedJoin {
    /// Alias the joined table is known under.
    pub alias: SmolStr,
    /// Model the join lands on.
    pub model: SmolStr,
    /// Table backing the target model.
    pub table: SmolStr,
    /// The ON condition, fully qualified.
    pub on: String,
    /// Join flavor.
    pub kind: JoinKind,
}

impl RealizedJoin {
    /// Render the join clause.
    pub fn to_sql(&self) -> String {
        format!("{} {} {} ON {}", self.kind.as_sql(), self.table, self.alias, self.on)
    }
}

/// A fetch join: realized eagerly, used by the execution layer to widen the
/// select list rather than to filter. Kept apart from plain joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealizedFetch {
    /// The relation path the fetch was declared for.
    pub path: SmolStr,
    /// The underlying join clause.
    pub join: RealizedJoin,
}

/// A deferred join: invoked at most once per `(alias, query)` pair.
pub type LazyJoin = Arc<dyn Fn(&QueryRoot, QueryId) -> SpecResult<RealizedJoin> + Send + Sync>;

/// The root a specification tree is evaluated against: schema metadata,
/// root model, root alias, and the request's shared [`QueryContext`].
#[derive(Clone)]
pub struct QueryRoot {
    /// Schema the path resolver consults.
    pub schema: Arc<Schema>,
    /// Name of the root model.
    pub model: SmolStr,
    /// SQL alias of the root table.
    pub alias: SmolStr,
    /// The request's join context.
    pub ctx: Arc<QueryContext>,
}

impl QueryRoot {
    /// Create a root over `model` aliased as `alias`.
    pub fn new(
        schema: Arc<Schema>,
        model: impl Into<SmolStr>,
        alias: impl Into<SmolStr>,
        ctx: Arc<QueryContext>,
    ) -> Self {
        Self {
            schema,
            model: model.into(),
            alias: alias.into(),
            ctx,
        }
    }
}

impl fmt::Debug for QueryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRoot")
            .field("model", &self.model)
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}

/// Request-scoped cache of relation joins.
#[derive(Default)]
pub struct QueryContext {
    lazy_joins: Mutex<HashMap<SmolStr, LazyJoin>>,
    evaluated: Mutex<IndexMap<(SmolStr, QueryId), RealizedJoin>>,
    fetches: Mutex<IndexMap<SmolStr, RealizedFetch>>,
}

impl QueryContext {
    /// Create an empty context for a fresh request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lazy join under `alias`. The last registration for a
    /// given alias wins; the path may be declared before it is first used.
    pub fn register_join(&self, alias: impl Into<SmolStr>, join: LazyJoin) {
        let alias = alias.into();
        tracing::trace!(alias = %alias, "registering lazy join");
        self.lazy_joins.lock().insert(alias, join);
    }

    /// Whether a lazy join is registered under `alias`.
    pub fn join_registered(&self, alias: &str) -> bool {
        self.lazy_joins.lock().contains_key(alias)
    }

    /// Realize (or reuse) the join registered under `alias` for `query`.
    ///
    /// Returns `Ok(None)` when nothing is registered under the alias.
    /// Calling this twice with the same [`QueryId`] returns the identical
    /// realized join; a different id re-realizes independently.
    pub fn resolve_join(
        &self,
        alias: &str,
        root: &QueryRoot,
        query: QueryId,
    ) -> SpecResult<Option<RealizedJoin>> {
        let Some(lazy) = self.lazy_joins.lock().get(alias).cloned() else {
            return Ok(None);
        };
        let key = (SmolStr::new(alias), query);
        if let Some(join) = self.evaluated.lock().get(&key) {
            return Ok(Some(join.clone()));
        }
        // No lock held here: the lazy function may resolve further aliases.
        let realized = lazy(root, query)?;
        tracing::trace!(alias, query = query.0, join = %realized.to_sql(), "realized join");
        Ok(Some(
            self.evaluated
                .lock()
                .entry(key)
                .or_insert(realized)
                .clone(),
        ))
    }

    /// Memoize an implicitly realized join (nested path navigation).
    pub(crate) fn cache_join(
        &self,
        alias: &str,
        query: QueryId,
        join: RealizedJoin,
    ) -> RealizedJoin {
        self.evaluated
            .lock()
            .entry((SmolStr::new(alias), query))
            .or_insert(join)
            .clone()
    }

    /// All joins realized for `query`, in realization order (a chained join
    /// always appears after its base).
    pub fn joins_for(&self, query: QueryId) -> Vec<RealizedJoin> {
        self.evaluated
            .lock()
            .iter()
            .filter(|((_, id), _)| *id == query)
            .map(|(_, join)| join.clone())
            .collect()
    }

    /// Store a realized fetch join under its path.
    pub fn put_fetch(&self, path: impl Into<SmolStr>, fetch: RealizedFetch) {
        self.fetches.lock().insert(path.into(), fetch);
    }

    /// Look up a realized fetch join by path.
    pub fn fetch(&self, path: &str) -> Option<RealizedFetch> {
        self.fetches.lock().get(path).cloned()
    }

    /// All realized fetch joins, in declaration order.
    pub fn fetches(&self) -> Vec<RealizedFetch> {
        self.fetches.lock().values().cloned().collect()
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("registered", &self.lazy_joins.lock().len())
            .field("evaluated", &self.evaluated.lock().len())
            .field("fetches", &self.fetches.lock().len())
            .finish()
    }
}
