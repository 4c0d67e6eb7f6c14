//! Dotted-path resolution against a query root.

use sift_schema::{FieldType, SchemaError};
use smol_str::SmolStr;

use crate::context::{JoinKind, QueryId, QueryRoot, RealizedJoin};
use crate::error::{SpecError, SpecResult};

/// A resolved path: the qualified column to compare against and the scalar
/// type living there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHandle {
    /// Fully qualified column (`alias.column`).
    pub column: String,
    /// Scalar type on the path.
    pub ty: FieldType,
}

/// Resolve `path` (e.g. `"orders.item_name"` or `"o.item_name"`) to a
/// column and its type.
///
/// The first segment consults the join context: if a lazy join is
/// registered under that name it is realized (or reused from the cache for
/// this `query`) and used as the base. Otherwise segments are plain field
/// or relation accesses on the current model; walking through a relation
/// realizes an implicit join aliased by the relation name, so the
/// execution layer sees every table the predicate references. Lookup
/// failures surface the schema layer's error for the exact missing
/// segment.
pub fn resolve_path(root: &QueryRoot, query: QueryId, path: &str) -> SpecResult<FieldHandle> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut model = root.model.clone();
    let mut alias = root.alias.clone();

    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();

        if i == 0 {
            if let Some(join) = root.ctx.resolve_join(segment, root, query)? {
                if last {
                    return Err(SpecError::InvalidPath(path.to_string()));
                }
                model = join.model;
                alias = join.alias;
                continue;
            }
        }

        let current = root.schema.model(&model)?;
        if last {
            match current.field_named(segment) {
                Some(field) => {
                    return Ok(FieldHandle {
                        column: format!("{}.{}", alias, field.column),
                        ty: field.ty.clone(),
                    });
                }
                None if current.relation_named(segment).is_some() => {
                    return Err(SpecError::InvalidPath(path.to_string()));
                }
                None => {
                    return Err(SchemaError::UnknownField {
                        model: model.to_string(),
                        field: segment.to_string(),
                    }
                    .into());
                }
            }
        }

        match current.relation_named(segment) {
            Some(rel) => {
                let target = root.schema.model(&rel.target)?;
                let join = RealizedJoin {
                    alias: SmolStr::new(segment),
                    model: rel.target.clone(),
                    table: target.table.clone(),
                    on: format!("{}.{} = {}.{}", alias, rel.local_key, segment, rel.foreign_key),
                    kind: JoinKind::Inner,
                };
                let join = root.ctx.cache_join(segment, query, join);
                model = join.model;
                alias = join.alias;
            }
            None if current.field_named(segment).is_some() => {
                return Err(SpecError::InvalidPath(path.to_string()));
            }
            None => {
                return Err(SchemaError::UnknownRelation {
                    model: model.to_string(),
                    relation: segment.to_string(),
                }
                .into());
            }
        }
    }

    Err(SpecError::InvalidPath(path.to_string()))
}
