//! Coercion of raw request text into typed values.
//!
//! A [`Converter`] is an immutable value object configured per filter
//! declaration (date format, mismatch policy, optional fallback). It is
//! safe to share across nodes and across requests; every conversion is a
//! pure function of the input.
//!
//! Type dispatch order is a hard contract: enumeration, then the date/time
//! family, then boolean, integer, single- and double-precision floats,
//! decimal, UUID, the pluggable fallback, and finally string passthrough.
//! Several of these grammars partially overlap (a UUID is not a number, a
//! number is not a boolean), so reordering the arms changes behavior.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sift_schema::FieldType;
use uuid::Uuid;

use crate::error::{SpecError, SpecResult};
use crate::predicate::Value;

/// Default format for [`FieldType::Date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Default format for [`FieldType::DateTime`].
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
/// Default format for [`FieldType::DateTimeTz`] and [`FieldType::Timestamp`].
pub const OFFSET_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// What to do when raw input cannot be coerced to the target type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MismatchPolicy {
    /// Surface the rejection to the caller as an illegal-input condition.
    #[default]
    Fail,
    /// Degrade the affected filter to a never-matching predicate instead.
    EmptyResult,
}

/// Pluggable conversion for [`FieldType::Custom`] targets: receives the raw
/// value and the declared type name, returns `None` to decline.
pub type FallbackFn = Arc<dyn Fn(&str, &str) -> Option<Value> + Send + Sync>;

/// Stateless coercion of raw text into typed values.
#[derive(Clone, Default)]
pub struct Converter {
    date_format: Option<String>,
    on_mismatch: MismatchPolicy,
    fallback: Option<FallbackFn>,
}

impl Converter {
    /// Create a converter with an optional fixed date/time format.
    ///
    /// When `date_format` is set it applies to every date/time target type;
    /// otherwise each type uses its own default.
    pub fn new(date_format: Option<String>, on_mismatch: MismatchPolicy) -> Self {
        Self {
            date_format,
            on_mismatch,
            fallback: None,
        }
    }

    /// Create a converter with per-type default formats.
    pub fn with_mismatch(on_mismatch: MismatchPolicy) -> Self {
        Self::new(None, on_mismatch)
    }

    /// Install a fallback conversion for types the converter does not
    /// natively recognize. The fallback is configuration, not identity:
    /// two converters differing only in fallback compare equal.
    pub fn with_fallback(mut self, fallback: FallbackFn) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// The mismatch policy this converter was configured with.
    pub fn on_mismatch(&self) -> MismatchPolicy {
        self.on_mismatch
    }

    /// The format used for the given date/time type.
    pub fn date_format(&self, ty: &FieldType) -> &str {
        if let Some(format) = &self.date_format {
            return format;
        }
        match ty {
            FieldType::Date => DATE_FORMAT,
            FieldType::DateTime => DATE_TIME_FORMAT,
            _ => OFFSET_DATE_TIME_FORMAT,
        }
    }

    /// Convert one raw value to the target type.
    pub fn convert(&self, value: &str, ty: &FieldType) -> SpecResult<Value> {
        self.convert_with(value, ty, false)
    }

    /// Convert one raw value, matching enumeration members case-insensitively
    /// when `ignore_case` is set.
    pub fn convert_with(&self, value: &str, ty: &FieldType, ignore_case: bool) -> SpecResult<Value> {
        match ty {
            FieldType::Enum(def) => def
                .matching_variant(value, ignore_case)
                .map(|v| Value::Enum(v.clone()))
                .ok_or_else(|| {
                    rejected(value, format!("no member `{value}` in enum {}", def.name))
                }),
            FieldType::Date => {
                let format = self.date_format(ty);
                NaiveDate::parse_from_str(value, format)
                    .map(Value::Date)
                    .map_err(|_| rejected(value, format!("expected date in format {format}")))
            }
            FieldType::DateTime => {
                let format = self.date_format(ty);
                NaiveDateTime::parse_from_str(value, format)
                    .map(Value::DateTime)
                    .map_err(|_| rejected(value, format!("expected date-time in format {format}")))
            }
            FieldType::DateTimeTz => {
                let format = self.date_format(ty);
                DateTime::parse_from_str(value, format)
                    .map(Value::DateTimeTz)
                    .map_err(|_| {
                        rejected(value, format!("expected offset date-time in format {format}"))
                    })
            }
            FieldType::Timestamp => {
                let format = self.date_format(ty);
                DateTime::parse_from_str(value, format)
                    .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
                    .map_err(|_| {
                        rejected(value, format!("expected instant in format {format}"))
                    })
            }
            FieldType::Boolean => match value {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(rejected(value, "unparseable boolean")),
            },
            FieldType::Int => value
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| rejected(value, "unparseable number")),
            FieldType::Float => value
                .parse::<f32>()
                .map(Value::Float)
                .map_err(|_| rejected(value, "unparseable number")),
            FieldType::Double => value
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| rejected(value, "unparseable number")),
            FieldType::Decimal => value
                .parse()
                .map(Value::Decimal)
                .map_err(|_| rejected(value, "unparseable number")),
            FieldType::Uuid => Uuid::parse_str(value)
                .map(Value::Uuid)
                .map_err(|_| rejected(value, "unparseable uuid")),
            FieldType::Custom(name) => {
                if let Some(fallback) = self.fallback.as_deref() {
                    if let Some(converted) = fallback(value, name) {
                        return Ok(converted);
                    }
                }
                Ok(Value::String(value.to_string()))
            }
            FieldType::String => Ok(Value::String(value.to_string())),
        }
    }

    /// Convert a batch of raw values, each attempted independently.
    ///
    /// Under [`MismatchPolicy::Fail`] any rejection aborts the whole batch:
    /// the error aggregates every rejected value and the successfully
    /// converted ones are discarded. Under [`MismatchPolicy::EmptyResult`]
    /// the rejected subset is silently dropped and the rest is returned —
    /// possibly an empty list, which downstream renders as a never-matching
    /// membership test.
    pub fn convert_all(&self, values: &[String], ty: &FieldType) -> SpecResult<Vec<Value>> {
        if matches!(ty, FieldType::String) {
            return Ok(values.iter().cloned().map(Value::String).collect());
        }
        let mut converted = Vec::with_capacity(values.len());
        let mut rejected_values = Vec::new();
        for value in values {
            match self.convert(value, ty) {
                Ok(v) => converted.push(v),
                Err(SpecError::ValueRejected { value, .. }) => rejected_values.push(value),
                Err(other) => return Err(other),
            }
        }
        if !rejected_values.is_empty() {
            match self.on_mismatch {
                MismatchPolicy::Fail => {
                    return Err(SpecError::ValuesRejected {
                        values: rejected_values,
                        reason: format!("expected values of type {ty}"),
                    });
                }
                MismatchPolicy::EmptyResult => {
                    tracing::debug!(
                        rejected = rejected_values.len(),
                        ty = %ty,
                        "dropping unconvertible values"
                    );
                }
            }
        }
        Ok(converted)
    }
}

fn rejected(value: &str, reason: impl Into<String>) -> SpecError {
    SpecError::ValueRejected {
        value: value.to_string(),
        reason: reason.into(),
    }
}

impl PartialEq for Converter {
    fn eq(&self, other: &Self) -> bool {
        self.date_format == other.date_format && self.on_mismatch == other.on_mismatch
    }
}

impl Eq for Converter {}

impl Hash for Converter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.date_format.hash(state);
        self.on_mismatch.hash(state);
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("date_format", &self.date_format)
            .field("on_mismatch", &self.on_mismatch)
            .field("fallback", &self.fallback.as_ref().map(|_| "..."))
            .finish()
    }
}
