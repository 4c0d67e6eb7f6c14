//! The native predicate tree handed to the query-execution layer.
//!
//! Specifications build [`Predicate`] values; the execution layer renders
//! them into a parameterized WHERE fragment with [`Predicate::to_sql`].
//! Converted parameter values travel as [`Value`]s and are bound by the
//! driver, never spliced into the SQL text.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use uuid::Uuid;

/// A raw request value coerced to the type found on the filtered path.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String value (also the passthrough for unconverted input).
    String(String),
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Single-precision float value.
    Float(f32),
    /// Double-precision float value.
    Double(f64),
    /// Arbitrary-precision decimal value.
    Decimal(Decimal),
    /// UUID value.
    Uuid(Uuid),
    /// Date value.
    Date(NaiveDate),
    /// Date-time value without offset.
    DateTime(NaiveDateTime),
    /// Date-time value with a fixed UTC offset.
    DateTimeTz(DateTime<FixedOffset>),
    /// UTC instant.
    Timestamp(DateTime<Utc>),
    /// Canonical member name of a declared enumeration.
    Enum(SmolStr),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

/// A complete predicate that can be rendered to SQL.
///
/// Columns arrive already qualified (`alias.column`) from path resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Never matches (`0 = 1`). Substituted by the empty-result decorator
    /// when a branch's input cannot possibly satisfy the branch's type.
    AlwaysFalse,

    /// Equals comparison.
    Eq(String, Value),
    /// Not equals comparison.
    Ne(String, Value),
    /// Less than comparison.
    Lt(String, Value),
    /// Less than or equal comparison.
    Le(String, Value),
    /// Greater than comparison.
    Gt(String, Value),
    /// Greater than or equal comparison.
    Ge(String, Value),

    /// In a list of values.
    In(String, Vec<Value>),
    /// Not in a list of values.
    NotIn(String, Vec<Value>),

    /// Substring pattern match; the pattern is already wrapped in `%`.
    /// The case-insensitive form upper-cases both sides.
    Like {
        column: String,
        pattern: String,
        ignore_case: bool,
    },

    /// Is null check.
    IsNull(String),
    /// Is not null check.
    IsNotNull(String),

    /// Logical AND of multiple predicates.
    And(Vec<Predicate>),
    /// Logical OR of multiple predicates.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Combine predicates with AND, collapsing a single-element list.
    pub fn and(predicates: Vec<Predicate>) -> Self {
        match predicates.len() {
            1 => predicates.into_iter().next().unwrap(),
            _ => Self::And(predicates),
        }
    }

    /// Combine predicates with OR, collapsing a single-element list.
    pub fn or(predicates: Vec<Predicate>) -> Self {
        match predicates.len() {
            1 => predicates.into_iter().next().unwrap(),
            _ => Self::Or(predicates),
        }
    }

    /// Render SQL for this predicate with `$n` parameter placeholders.
    ///
    /// Returns `(sql, params)` where params are the values to bind.
    /// `param_offset` is the number of placeholders already used by the
    /// surrounding statement.
    pub fn to_sql(&self, param_offset: usize) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = self.render(param_offset, &mut params);
        (sql, params)
    }

    fn binary(col: &str, op: &str, val: &Value, offset: usize, params: &mut Vec<Value>) -> String {
        params.push(val.clone());
        format!("{} {} ${}", col, op, offset + params.len())
    }

    fn render(&self, offset: usize, params: &mut Vec<Value>) -> String {
        match self {
            Self::AlwaysFalse => "0 = 1".to_string(),

            Self::Eq(col, val) => Self::binary(col, "=", val, offset, params),
            Self::Ne(col, val) => Self::binary(col, "!=", val, offset, params),
            Self::Lt(col, val) => Self::binary(col, "<", val, offset, params),
            Self::Le(col, val) => Self::binary(col, "<=", val, offset, params),
            Self::Gt(col, val) => Self::binary(col, ">", val, offset, params),
            Self::Ge(col, val) => Self::binary(col, ">=", val, offset, params),

            Self::In(col, values) => {
                if values.is_empty() {
                    return "FALSE".to_string();
                }
                let placeholders: Vec<_> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        format!("${}", offset + params.len())
                    })
                    .collect();
                format!("{} IN ({})", col, placeholders.join(", "))
            }
            Self::NotIn(col, values) => {
                if values.is_empty() {
                    return "TRUE".to_string();
                }
                let placeholders: Vec<_> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        format!("${}", offset + params.len())
                    })
                    .collect();
                format!("{} NOT IN ({})", col, placeholders.join(", "))
            }

            Self::Like {
                column,
                pattern,
                ignore_case,
            } => {
                if *ignore_case {
                    params.push(Value::String(pattern.to_uppercase()));
                    format!("UPPER({}) LIKE ${}", column, offset + params.len())
                } else {
                    params.push(Value::String(pattern.clone()));
                    format!("{} LIKE ${}", column, offset + params.len())
                }
            }

            Self::IsNull(col) => format!("{} IS NULL", col),
            Self::IsNotNull(col) => format!("{} IS NOT NULL", col),

            Self::And(predicates) => {
                if predicates.is_empty() {
                    return "TRUE".to_string();
                }
                let parts: Vec<_> = predicates.iter().map(|p| p.render(offset, params)).collect();
                format!("({})", parts.join(" AND "))
            }
            Self::Or(predicates) => {
                if predicates.is_empty() {
                    return "FALSE".to_string();
                }
                let parts: Vec<_> = predicates.iter().map(|p| p.render(offset, params)).collect();
                format!("({})", parts.join(" OR "))
            }
        }
    }
}
