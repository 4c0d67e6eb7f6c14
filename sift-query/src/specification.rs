//! Specification nodes: the predicate tree built by the compiler.
//!
//! Every node shares one contract: given a query root and a query
//! identity, produce a predicate — or nothing, for nodes whose role is a
//! side effect. Nodes are immutable after construction, cheap to clone,
//! and compare structurally over `(operator, path, raw values, converter
//! configuration)`, so two compilation passes over the same request yield
//! equal trees.

use sift_schema::FieldType;
use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::composite::{Conjunction, Disjunction};
use crate::context::{QueryId, QueryRoot};
use crate::convert::Converter;
use crate::error::SpecResult;
use crate::joins::{JoinFetchSpec, JoinSpec};
use crate::path::resolve_path;
use crate::predicate::{Predicate, Value};

/// Comparison operator of a [`CompareSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
}

/// A single-value comparison against the type found on the path.
///
/// The raw value is converted when the predicate is built, never earlier:
/// an ordering comparison on an unordered type, or a value the path's type
/// cannot represent, fails at conversion time with a rejection the
/// mismatch decorator can intercept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompareSpec {
    op: CompareOp,
    path: SmolStr,
    value: String,
    ignore_case: bool,
    converter: Converter,
}

impl CompareSpec {
    /// Create a comparison leaf.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one raw value is supplied; wiring a
    /// multi-valued parameter to a single-value operator is a declaration
    /// bug, not bad request input.
    pub fn new(
        op: CompareOp,
        path: impl Into<SmolStr>,
        values: &[String],
        ignore_case: bool,
        converter: Converter,
    ) -> Self {
        let path = path.into();
        assert!(
            values.len() == 1,
            "expected exactly one value for {op:?} on `{path}`, got {values:?}"
        );
        Self {
            op,
            path,
            value: values[0].clone(),
            ignore_case,
            converter,
        }
    }

    fn to_predicate(&self, root: &QueryRoot, query: QueryId) -> SpecResult<Option<Predicate>> {
        let handle = resolve_path(root, query, &self.path)?;
        let value = self
            .converter
            .convert_with(&self.value, &handle.ty, self.ignore_case)?;
        let predicate = match self.op {
            CompareOp::Equal => Predicate::Eq(handle.column, value),
            CompareOp::NotEqual => Predicate::Ne(handle.column, value),
            CompareOp::GreaterThan => Predicate::Gt(handle.column, value),
            CompareOp::GreaterThanOrEqual => Predicate::Ge(handle.column, value),
            CompareOp::LessThan => Predicate::Lt(handle.column, value),
            CompareOp::LessThanOrEqual => Predicate::Le(handle.column, value),
        };
        Ok(Some(predicate))
    }
}

/// Substring pattern match. Performs no type conversion; patterns only
/// apply to text columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LikeSpec {
    path: SmolStr,
    pattern: String,
    ignore_case: bool,
}

impl LikeSpec {
    /// Create a pattern leaf; the single raw value becomes `%value%`.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one raw value is supplied.
    pub fn new(path: impl Into<SmolStr>, values: &[String], ignore_case: bool) -> Self {
        let path = path.into();
        assert!(
            values.len() == 1,
            "expected exactly one value (the fragment to match against) for `{path}`, got {values:?}"
        );
        Self {
            path,
            pattern: format!("%{}%", values[0]),
            ignore_case,
        }
    }

    fn to_predicate(&self, root: &QueryRoot, query: QueryId) -> SpecResult<Option<Predicate>> {
        let handle = resolve_path(root, query, &self.path)?;
        Ok(Some(Predicate::Like {
            column: handle.column,
            pattern: self.pattern.clone(),
            ignore_case: self.ignore_case,
        }))
    }
}

/// Set membership or its negation, with batch value conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InSpec {
    negated: bool,
    path: SmolStr,
    values: SmallVec<[String; 2]>,
    converter: Converter,
}

impl InSpec {
    /// Create a membership leaf.
    ///
    /// # Panics
    ///
    /// Panics when the value set is empty.
    pub fn new(
        negated: bool,
        path: impl Into<SmolStr>,
        values: impl IntoIterator<Item = String>,
        converter: Converter,
    ) -> Self {
        let path = path.into();
        let values: SmallVec<[String; 2]> = values.into_iter().collect();
        assert!(
            !values.is_empty(),
            "expected at least one value for membership test on `{path}`"
        );
        Self {
            negated,
            path,
            values,
            converter,
        }
    }

    fn to_predicate(&self, root: &QueryRoot, query: QueryId) -> SpecResult<Option<Predicate>> {
        let handle = resolve_path(root, query, &self.path)?;
        let converted = self.converter.convert_all(&self.values, &handle.ty)?;
        Ok(Some(if self.negated {
            Predicate::NotIn(handle.column, converted)
        } else {
            Predicate::In(handle.column, converted)
        }))
    }
}

/// Nullability check. The converted boolean **value** picks the emitted
/// predicate; the `negated` form flips it (the NotNull declaration).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NullSpec {
    negated: bool,
    path: SmolStr,
    value: String,
    converter: Converter,
}

impl NullSpec {
    /// Create a nullability leaf.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one raw value is supplied.
    pub fn new(
        negated: bool,
        path: impl Into<SmolStr>,
        values: &[String],
        converter: Converter,
    ) -> Self {
        let path = path.into();
        assert!(
            values.len() == 1,
            "expected exactly one boolean value for null check on `{path}`, got {values:?}"
        );
        Self {
            negated,
            path,
            value: values[0].clone(),
            converter,
        }
    }

    fn to_predicate(&self, root: &QueryRoot, query: QueryId) -> SpecResult<Option<Predicate>> {
        let handle = resolve_path(root, query, &self.path)?;
        let wants_null = match self.converter.convert(&self.value, &FieldType::Boolean)? {
            Value::Bool(b) => b != self.negated,
            _ => unreachable!("boolean conversion yields a boolean"),
        };
        Ok(Some(if wants_null {
            Predicate::IsNull(handle.column)
        } else {
            Predicate::IsNotNull(handle.column)
        }))
    }
}

/// A node of the predicate tree.
///
/// A closed set of variants keyed by operator; new operators are new
/// variants implementing the same `(root, query) -> predicate` contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Specification {
    /// Single-value comparison.
    Compare(CompareSpec),
    /// Substring pattern match.
    Like(LikeSpec),
    /// Set membership / negated membership.
    In(InSpec),
    /// Nullability check.
    Null(NullSpec),
    /// AND of children, with one-time fake initialization per query.
    Conjunction(Conjunction),
    /// OR of children.
    Disjunction(Disjunction),
    /// Decorator turning a value rejection into a never-matching predicate.
    EmptyOnMismatch(Box<Specification>),
    /// Fake node registering a relation join.
    Join(JoinSpec),
    /// Fake node realizing fetch joins.
    JoinFetch(JoinFetchSpec),
}

impl Specification {
    /// Build the native predicate for this node.
    ///
    /// `None` means the node contributes no predicate (a pure side
    /// effect). The same tree may be built several times per request with
    /// different [`QueryId`]s — once for the result set, once for the
    /// count — and behaves identically on every pass.
    pub fn to_predicate(&self, root: &QueryRoot, query: QueryId) -> SpecResult<Option<Predicate>> {
        match self {
            Self::Compare(spec) => spec.to_predicate(root, query),
            Self::Like(spec) => spec.to_predicate(root, query),
            Self::In(spec) => spec.to_predicate(root, query),
            Self::Null(spec) => spec.to_predicate(root, query),
            Self::Conjunction(spec) => spec.to_predicate(root, query),
            Self::Disjunction(spec) => spec.to_predicate(root, query),
            Self::EmptyOnMismatch(inner) => match inner.to_predicate(root, query) {
                Err(e) if e.is_rejection() => Ok(Some(Predicate::AlwaysFalse)),
                other => other,
            },
            Self::Join(spec) => spec.to_predicate(root, query),
            Self::JoinFetch(spec) => spec.to_predicate(root, query),
        }
    }

    /// Wrap this node in the type-mismatch decorator.
    pub fn empty_on_mismatch(self) -> Self {
        Self::EmptyOnMismatch(Box::new(self))
    }

    /// Whether this node is a pure side effect contributing no predicate.
    pub(crate) fn is_fake(&self) -> bool {
        matches!(self, Self::Join(_) | Self::JoinFetch(_))
    }
}
