//! Error types for filter compilation and predicate building.

use smol_str::SmolStr;
use thiserror::Error;

pub use sift_schema::SchemaError;

/// Result type for specification building.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors raised while building a predicate from a specification.
///
/// The two rejection variants are the type-mismatch signals: they carry the
/// exact raw input that could not be coerced, so the boundary layer can turn
/// them into a client-facing bad-request response. Everything else is a
/// metadata lookup failure surfaced from the schema layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// One raw value could not be coerced to the target type.
    #[error("rejected value `{value}`: {reason}")]
    ValueRejected { value: String, reason: String },

    /// One or more values of a batch conversion were rejected.
    #[error("rejected values {values:?}: {reason}")]
    ValuesRejected { values: Vec<String>, reason: String },

    /// A path segment did not resolve against the schema metadata.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A join declaration referenced an alias nothing has registered.
    #[error("no join registered under alias `{0}`")]
    UnregisteredAlias(SmolStr),

    /// A dotted path ended on a relation instead of a scalar field, or
    /// walked through a scalar field.
    #[error("path `{0}` does not end at a scalar field")]
    InvalidPath(String),
}

impl SpecError {
    /// Whether this error is a value-rejection signal (single or batch).
    ///
    /// The empty-result decorator suppresses exactly these; everything else
    /// propagates.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::ValueRejected { .. } | Self::ValuesRejected { .. }
        )
    }
}
