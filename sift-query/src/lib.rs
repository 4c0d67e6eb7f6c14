//! # sift-query
//!
//! Compiles declarative, per-field request filters into composable SQL
//! predicate trees.
//!
//! An application declares its filters once — operator, target path,
//! parameter binding — and for each request the compiler turns whatever
//! parameters actually arrived into a [`Specification`] tree. Asking the
//! tree for its predicate resolves dotted paths through a per-request join
//! cache and coerces raw text into the types found on those paths, so the
//! same tree can be evaluated for the result-set query and again for the
//! count query without duplicating join clauses.
//!
//! ## Compiling a filter
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use sift_query::{
//!     Compiler, FilterDef, FilterDescriptor, Operator, QueryContext, QueryId, QueryRoot,
//! };
//! use sift_schema::{FieldType, Model, Schema};
//!
//! let schema = Arc::new(
//!     Schema::builder()
//!         .model(
//!             Model::new("Customer", "customers")
//!                 .field("id", "id", FieldType::Int)
//!                 .field("last_name", "last_name", FieldType::String),
//!         )
//!         .build(),
//! );
//!
//! // the declaration layer provides this once
//! let declared = FilterDef::Filter(FilterDescriptor::new(Operator::Like, "last_name"));
//!
//! // the HTTP layer provides these per request
//! let mut params: HashMap<String, Vec<String>> = HashMap::new();
//! params.insert("last_name".into(), vec!["Simpson".into()]);
//!
//! let spec = Compiler::new().compile(&declared, &params).expect("filter requested");
//!
//! let ctx = Arc::new(QueryContext::new());
//! let root = QueryRoot::new(schema, "Customer", "c", ctx);
//! let predicate = spec.to_predicate(&root, QueryId(1)).unwrap().unwrap();
//!
//! let (sql, params) = predicate.to_sql(0);
//! assert_eq!(sql, "c.last_name LIKE $1");
//! assert_eq!(params.len(), 1);
//! ```
//!
//! ## Absent filters
//!
//! A filter whose bound parameters are missing from the request — or
//! present with an empty value — compiles to `None`: not an error, just
//! "not filtering on this".
//!
//! ## Type mismatches
//!
//! Each descriptor picks a policy: `Fail` surfaces a rejection carrying
//! the offending raw value, `EmptyResult` wraps the leaf so an
//! unconvertible value degrades that branch to a never-matching predicate
//! instead of aborting the query — the useful behavior for heterogeneous
//! OR filters like "numeric id or text name".

pub mod compiler;
pub mod composite;
pub mod context;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod joins;
pub mod logging;
pub mod path;
pub mod predicate;
pub mod specification;

pub use compiler::{Compiler, ParamSource};
pub use composite::{Conjunction, Disjunction};
pub use context::{
    JoinKind, LazyJoin, QueryContext, QueryId, QueryRoot, RealizedFetch, RealizedJoin,
};
pub use convert::{Converter, FallbackFn, MismatchPolicy};
pub use descriptor::{FilterDef, FilterDescriptor, JoinDef, JoinFetchDef, Operator};
pub use error::{SpecError, SpecResult};
pub use joins::{JoinFetchSpec, JoinSpec};
pub use path::{FieldHandle, resolve_path};
pub use predicate::{Predicate, Value};
pub use specification::{
    CompareOp, CompareSpec, InSpec, LikeSpec, NullSpec, Specification,
};
