//! # sift-schema
//!
//! Entity and field metadata for the Sift filter engine.
//!
//! The filter compiler needs to know two things about the data it filters:
//! which scalar type lives at the end of a dotted path, and which relations
//! can be joined along the way. This crate holds exactly that metadata and
//! nothing else — no persistence, no mapping, no SQL.
//!
//! ## Example
//!
//! ```rust
//! use sift_schema::{FieldType, Model, Relation, Schema};
//!
//! let schema = Schema::builder()
//!     .model(
//!         Model::new("Customer", "customers")
//!             .field("id", "id", FieldType::Int)
//!             .field("last_name", "last_name", FieldType::String)
//!             .relation(Relation::new("orders", "Order", "id", "customer_id")),
//!     )
//!     .model(
//!         Model::new("Order", "orders")
//!             .field("id", "id", FieldType::Int)
//!             .field("item_name", "item_name", FieldType::String),
//!     )
//!     .build();
//!
//! let customer = schema.model("Customer").unwrap();
//! assert_eq!(customer.field_named("last_name").unwrap().ty, FieldType::String);
//! assert_eq!(customer.relation_named("orders").unwrap().target, "Order");
//! ```

pub mod error;
pub mod model;
pub mod types;

pub use error::{SchemaError, SchemaResult};
pub use model::{Field, Model, Relation, Schema, SchemaBuilder};
pub use types::{EnumDef, FieldType};
