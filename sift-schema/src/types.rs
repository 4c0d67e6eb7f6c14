//! Scalar field types.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A declared enumeration: a closed set of member names.
///
/// Raw filter input matches against the member names, either exactly or
/// ignoring ASCII case depending on the filter declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumDef {
    /// Enumeration name.
    pub name: SmolStr,
    /// Member names, in declaration order.
    pub variants: Vec<SmolStr>,
}

impl EnumDef {
    /// Create an enum definition.
    pub fn new<I, S>(name: impl Into<SmolStr>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// Find the member matching `raw`, exactly or case-insensitively.
    ///
    /// Returns the canonical member name on a match.
    pub fn matching_variant(&self, raw: &str, ignore_case: bool) -> Option<&SmolStr> {
        self.variants.iter().find(|v| {
            if ignore_case {
                v.eq_ignore_ascii_case(raw)
            } else {
                v.as_str() == raw
            }
        })
    }
}

/// Scalar type of a filterable field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// String type (maps to VARCHAR/TEXT).
    String,
    /// Boolean type.
    Boolean,
    /// Integer type (maps to INT/BIGINT).
    Int,
    /// Single-precision floating point type.
    Float,
    /// Double-precision floating point type.
    Double,
    /// Decimal type for precise calculations (maps to DECIMAL/NUMERIC).
    Decimal,
    /// UUID type.
    Uuid,
    /// Date only type.
    Date,
    /// Date and time type, without offset.
    DateTime,
    /// Date and time type, with UTC offset.
    DateTimeTz,
    /// Point-in-time type (UTC instant).
    Timestamp,
    /// A declared enumeration.
    Enum(EnumDef),
    /// A type the engine does not natively convert; handled by a pluggable
    /// fallback or passed through as raw text.
    Custom(SmolStr),
}

impl FieldType {
    /// Get the type name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::Decimal => "Decimal",
            Self::Uuid => "Uuid",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::DateTimeTz => "DateTimeTz",
            Self::Timestamp => "Timestamp",
            Self::Enum(def) => def.name.as_str(),
            Self::Custom(name) => name.as_str(),
        }
    }

    /// Check whether this is a date/time family type.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date | Self::DateTime | Self::DateTimeTz | Self::Timestamp
        )
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_variant_matching() {
        let def = EnumDef::new("Gender", ["MALE", "FEMALE", "OTHER"]);
        assert_eq!(def.matching_variant("MALE", false).unwrap(), "MALE");
        assert_eq!(def.matching_variant("male", true).unwrap(), "MALE");
        assert!(def.matching_variant("male", false).is_none());
        assert!(def.matching_variant("unknown", true).is_none());
    }

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::Decimal.as_str(), "Decimal");
        let def = EnumDef::new("Gender", ["MALE"]);
        assert_eq!(FieldType::Enum(def).as_str(), "Gender");
    }

    #[test]
    fn test_temporal_family() {
        assert!(FieldType::Date.is_temporal());
        assert!(FieldType::Timestamp.is_temporal());
        assert!(!FieldType::Int.is_temporal());
    }
}
