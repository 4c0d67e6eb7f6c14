//! Error types for schema lookups.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised when a path segment does not resolve against the metadata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No model registered under the given name.
    #[error("unknown model `{0}`")]
    UnknownModel(String),

    /// The model exists but has no such field or relation.
    #[error("unknown field `{field}` on model `{model}`")]
    UnknownField { model: String, field: String },

    /// The model exists but has no such relation.
    #[error("unknown relation `{relation}` on model `{model}`")]
    UnknownRelation { model: String, relation: String },
}
