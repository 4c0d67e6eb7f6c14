//! The declarative filter surface consumed by the compiler.
//!
//! Descriptors are immutable records produced once by whatever declaration
//! layer the application uses (attributes, route metadata, config files —
//! out of scope here) and reused for every request.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::context::JoinKind;
use crate::convert::MismatchPolicy;

/// Filter operator selecting the leaf specification to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Equality comparison.
    Equal,
    /// Inequality comparison.
    NotEqual,
    /// `>` comparison.
    GreaterThan,
    /// `>=` comparison.
    GreaterThanOrEqual,
    /// `<` comparison.
    LessThan,
    /// `<=` comparison.
    LessThanOrEqual,
    /// Substring pattern match.
    Like,
    /// Set membership.
    In,
    /// Negated set membership.
    NotIn,
    /// Nullability check driven by the parameter value.
    Null,
    /// Nullability check with the value flipped.
    NotNull,
}

/// One declared filter: operator, target path, and binding rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    /// Operator kind.
    pub op: Operator,
    /// Dot-separated target path.
    pub path: SmolStr,
    /// Bound request parameter names; empty means "use the path".
    #[serde(default)]
    pub params: Vec<SmolStr>,
    /// Constant value overriding parameter lookup entirely.
    #[serde(default)]
    pub const_value: Option<String>,
    /// Multi-value separator character.
    #[serde(default)]
    pub separator: Option<char>,
    /// Match patterns and enum members ignoring case.
    #[serde(default)]
    pub ignore_case: bool,
    /// What to do when a value cannot be coerced to the path's type.
    #[serde(default)]
    pub mismatch: MismatchPolicy,
    /// Fixed date/time format overriding the per-type defaults.
    #[serde(default)]
    pub date_format: Option<String>,
}

impl FilterDescriptor {
    /// Create a descriptor with defaults: parameter bound to the path,
    /// case-sensitive, failing on type mismatch.
    pub fn new(op: Operator, path: impl Into<SmolStr>) -> Self {
        Self {
            op,
            path: path.into(),
            params: Vec::new(),
            const_value: None,
            separator: None,
            ignore_case: false,
            mismatch: MismatchPolicy::Fail,
            date_format: None,
        }
    }

    /// Bind to the given request parameter names instead of the path.
    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Use a constant value, ignoring request parameters.
    pub fn const_value(mut self, value: impl Into<String>) -> Self {
        self.const_value = Some(value.into());
        self
    }

    /// Split every raw value on the given separator.
    pub fn separator(mut self, separator: char) -> Self {
        self.separator = Some(separator);
        self
    }

    /// Match patterns and enum members ignoring case.
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Set the type-mismatch policy.
    pub fn mismatch(mut self, mismatch: MismatchPolicy) -> Self {
        self.mismatch = mismatch;
        self
    }

    /// Fix the date/time format for this filter.
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }
}

/// Declares a relation join under an alias (see [`crate::joins::JoinSpec`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDef {
    /// Relation path: a relation of the root model, or `"alias.relation"`.
    pub path: SmolStr,
    /// Alias the joined table will be known under.
    pub alias: SmolStr,
    /// Join flavor.
    pub kind: JoinKind,
}

impl JoinDef {
    /// Create a join declaration.
    pub fn new(path: impl Into<SmolStr>, alias: impl Into<SmolStr>, kind: JoinKind) -> Self {
        Self {
            path: path.into(),
            alias: alias.into(),
            kind,
        }
    }
}

/// Declares fetch joins for relations of the root model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinFetchDef {
    /// Relation paths to fetch.
    pub paths: Vec<SmolStr>,
    /// Join flavor.
    pub kind: JoinKind,
}

impl JoinFetchDef {
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
}

/// The declarative filter tree for one endpoint: leaves plus arbitrary
/// AND/OR nesting and join declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterDef {
    /// One filter descriptor.
    Filter(FilterDescriptor),
    /// All children must hold.
    And(Vec<FilterDef>),
    /// Any child must hold.
    Or(Vec<FilterDef>),
    /// A join declaration.
    Join(JoinDef),
    /// A fetch-join declaration.
    JoinFetch(JoinFetchDef),
}

impl From<FilterDescriptor> for FilterDef {
    fn from(descriptor: FilterDescriptor) -> Self {
        Self::Filter(descriptor)
    }
}
