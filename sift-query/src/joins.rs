//! Fake specifications that declare joins instead of filtering.
//!
//! These nodes never contribute a predicate. A [`JoinSpec`] registers a
//! lazy join under an alias so that sibling leaves can resolve paths
//! through it; a [`JoinFetchSpec`] realizes fetch joins eagerly for the
//! execution layer to widen its select list.

use std::sync::Arc;

use smol_str::SmolStr;

use crate::context::{JoinKind, LazyJoin, QueryId, QueryRoot, RealizedFetch, RealizedJoin};
use crate::error::{SpecError, SpecResult};
use crate::predicate::Predicate;

/// Declares a relation join under an alias.
///
/// `path` names a relation of the root model, or chains off another
/// registered alias as `"alias.relation"`. Registration happens every time
/// the node is evaluated (last registration wins); realization is deferred
/// until a path actually resolves through the alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinSpec {
    path: SmolStr,
    alias: SmolStr,
    kind: JoinKind,
}

impl JoinSpec {
    /// Create a join declaration.
    pub fn new(path: impl Into<SmolStr>, alias: impl Into<SmolStr>, kind: JoinKind) -> Self {
        Self {
            path: path.into(),
            alias: alias.into(),
            kind,
        }
    }

    pub(crate) fn to_predicate(
        &self,
        root: &QueryRoot,
        _query: QueryId,
    ) -> SpecResult<Option<Predicate>> {
        root.ctx
            .register_join(self.alias.clone(), lazy_join(self.path.clone(), self.alias.clone(), self.kind));
        Ok(None)
    }
}

fn lazy_join(path: SmolStr, alias: SmolStr, kind: JoinKind) -> LazyJoin {
    Arc::new(move |root: &QueryRoot, query: QueryId| match path.split_once('.') {
        None => realize(root, &root.model, &root.alias, &path, &alias, kind),
        Some((base, relation)) => {
            let base_join = root
                .ctx
                .resolve_join(base, root, query)?
                .ok_or_else(|| SpecError::UnregisteredAlias(SmolStr::new(base)))?;
            realize(root, &base_join.model, &base_join.alias, relation, &alias, kind)
        }
    })
}

fn realize(
    root: &QueryRoot,
    source_model: &str,
    source_alias: &str,
    relation: &str,
    alias: &SmolStr,
    kind: JoinKind,
) -> SpecResult<RealizedJoin> {
    let rel = root.schema.relation(source_model, relation)?;
    let target = root.schema.model(&rel.target)?;
    Ok(RealizedJoin {
        alias: alias.clone(),
        model: rel.target.clone(),
        table: target.table.clone(),
        on: format!(
            "{}.{} = {}.{}",
            source_alias, rel.local_key, alias, rel.foreign_key
        ),
        kind,
    })
}

/// Declares fetch joins for one or more relations of the root model.
///
/// Fetch joins are realized eagerly (a fetch that nothing filters on must
/// still reach the execution layer) and keyed by path, shared across both
/// evaluation passes of the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinFetchSpec {
    paths: Vec<SmolStr>,
    kind: JoinKind,
}

impl JoinFetchSpec {
    /// Create a fetch declaration.
    pub fn new<I, S>(paths: I, kind: JoinKind) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            kind,
        }
    }

    pub(crate) fn to_predicate(
        &self,
        root: &QueryRoot,
        _query: QueryId,
    ) -> SpecResult<Option<Predicate>> {
        for path in &self.paths {
            if root.ctx.fetch(path).is_some() {
                continue;
            }
            let join = realize(root, &root.model, &root.alias, path, path, self.kind)?;
            root.ctx.put_fetch(
                path.clone(),
                RealizedFetch {
                    path: path.clone(),
                    join,
                },
            );
        }
        Ok(None)
    }
}
