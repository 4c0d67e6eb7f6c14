//! Models, relations, and the schema registry.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{SchemaError, SchemaResult};
use crate::types::FieldType;

/// A filterable scalar field of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, as used in filter paths.
    pub name: SmolStr,
    /// Database column name.
    pub column: SmolStr,
    /// Scalar type of the field.
    pub ty: FieldType,
}

/// A named relation to another model.
///
/// `local_key` is the column on the owning model, `foreign_key` the column
/// on the target model; a realized join compares the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Relation name, as used in filter paths and join declarations.
    pub name: SmolStr,
    /// Name of the target model.
    pub target: SmolStr,
    /// Join column on the owning model.
    pub local_key: SmolStr,
    /// Join column on the target model.
    pub foreign_key: SmolStr,
}

impl Relation {
    /// Create a relation spec.
    pub fn new(
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        local_key: impl Into<SmolStr>,
        foreign_key: impl Into<SmolStr>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
        }
    }
}

/// A model definition (maps to a database table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model name.
    pub name: SmolStr,
    /// Database table name.
    pub table: SmolStr,
    /// Scalar fields, in declaration order.
    pub fields: IndexMap<SmolStr, Field>,
    /// Relations to other models, in declaration order.
    pub relations: IndexMap<SmolStr, Relation>,
}

impl Model {
    /// Create a new model.
    pub fn new(name: impl Into<SmolStr>, table: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            fields: IndexMap::new(),
            relations: IndexMap::new(),
        }
    }

    /// Add a scalar field (builder style).
    pub fn field(
        mut self,
        name: impl Into<SmolStr>,
        column: impl Into<SmolStr>,
        ty: FieldType,
    ) -> Self {
        let name = name.into();
        self.fields.insert(
            name.clone(),
            Field {
                name,
                column: column.into(),
                ty,
            },
        );
        self
    }

    /// Add a relation (builder style).
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.insert(relation.name.clone(), relation);
        self
    }

    /// Get a field by name.
    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Get a relation by name.
    pub fn relation_named(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }
}

/// Registry of all models visible to the filter compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    models: IndexMap<SmolStr, Model>,
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Look up a model by name.
    pub fn model(&self, name: &str) -> SchemaResult<&Model> {
        self.models
            .get(name)
            .ok_or_else(|| SchemaError::UnknownModel(name.to_string()))
    }

    /// Look up a field on a model, failing with the exact missing segment.
    pub fn field(&self, model: &str, field: &str) -> SchemaResult<&Field> {
        self.model(model)?
            .field_named(field)
            .ok_or_else(|| SchemaError::UnknownField {
                model: model.to_string(),
                field: field.to_string(),
            })
    }

    /// Look up a relation on a model.
    pub fn relation(&self, model: &str, relation: &str) -> SchemaResult<&Relation> {
        self.model(model)?
            .relation_named(relation)
            .ok_or_else(|| SchemaError::UnknownRelation {
                model: model.to_string(),
                relation: relation.to_string(),
            })
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    models: IndexMap<SmolStr, Model>,
}

impl SchemaBuilder {
    /// Register a model. A later model with the same name replaces it.
    pub fn model(mut self, model: Model) -> Self {
        self.models.insert(model.name.clone(), model);
        self
    }

    /// Finish building.
    pub fn build(self) -> Schema {
        Schema {
            models: self.models,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Schema {
        Schema::builder()
            .model(
                Model::new("Customer", "customers")
                    .field("id", "id", FieldType::Int)
                    .field("last_name", "last_name", FieldType::String)
                    .relation(Relation::new("orders", "Order", "id", "customer_id")),
            )
            .model(
                Model::new("Order", "orders")
                    .field("id", "id", FieldType::Int)
                    .field("item_name", "item_name", FieldType::String),
            )
            .build()
    }

    #[test]
    fn test_field_lookup() {
        let schema = sample();
        let field = schema.field("Customer", "last_name").unwrap();
        assert_eq!(field.column, "last_name");
        assert_eq!(field.ty, FieldType::String);
    }

    #[test]
    fn test_unknown_field_names_the_segment() {
        let schema = sample();
        let err = schema.field("Customer", "nope").unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownField {
                model: "Customer".into(),
                field: "nope".into(),
            }
        );
    }

    #[test]
    fn test_relation_lookup() {
        let schema = sample();
        let rel = schema.relation("Customer", "orders").unwrap();
        assert_eq!(rel.target, "Order");
        assert_eq!(rel.foreign_key, "customer_id");
    }

    #[test]
    fn test_unknown_model() {
        let schema = sample();
        assert_eq!(
            schema.model("Ghost").unwrap_err(),
            SchemaError::UnknownModel("Ghost".into())
        );
    }
}
