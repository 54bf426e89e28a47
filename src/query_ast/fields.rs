//! Projection side of the operation tree.

use serde_json::{Map, Value};

use super::operations::{
    AggregateOperation, CompositeReadOperation, ConnectionReadOperation, ReadOperation,
};
use crate::schema_model::ScalarType;

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeField {
    /// Response key
    pub alias: String,
    pub field: String,
    pub property: String,
    pub scalar: Option<ScalarType>,
    pub is_list: bool,
    pub coalesce: Option<Value>,
}

/// A `@cypher` field in a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct CypherAttributeField {
    pub alias: String,
    pub field: String,
    pub statement: String,
    pub column_name: String,
    pub is_list: bool,
    /// Field arguments, bound as statement parameters under their own names
    pub args: Map<String, Value>,
    /// Projection of the returned nodes for entity-typed fields
    pub target: Option<Box<ReadOperation>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Attribute(AttributeField),
    /// `__typename`, known statically per concrete type
    Typename { alias: String, type_name: String },
    Read(Box<ReadOperation>),
    CompositeRead(Box<CompositeReadOperation>),
    Connection(Box<ConnectionReadOperation>),
    Aggregate(Box<AggregateOperation>),
    Cypher(Box<CypherAttributeField>),
}

impl Field {
    pub fn alias(&self) -> &str {
        match self {
            Field::Attribute(a) => &a.alias,
            Field::Typename { alias, .. } => alias,
            Field::Read(r) => &r.alias,
            Field::CompositeRead(r) => &r.alias,
            Field::Connection(c) => &c.alias,
            Field::Aggregate(a) => &a.alias,
            Field::Cypher(c) => &c.alias,
        }
    }

    /// Declared field names of the attributes this projection reads, used
    /// to pick attribute-level authorization rules.
    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            Field::Attribute(a) => Some(&a.field),
            Field::Cypher(c) => Some(&c.field),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationSelection {
    Min,
    Max,
    Average,
    Sum,
    Shortest,
    Longest,
}

impl AggregationSelection {
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(AggregationSelection::Min),
            "max" => Some(AggregationSelection::Max),
            "average" => Some(AggregationSelection::Average),
            "sum" => Some(AggregationSelection::Sum),
            "shortest" => Some(AggregationSelection::Shortest),
            "longest" => Some(AggregationSelection::Longest),
            _ => None,
        }
    }
}

/// `title { shortest longest }` inside an aggregate selection.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationField {
    pub alias: String,
    pub field: String,
    pub property: String,
    pub scalar: Option<ScalarType>,
    /// (response key, selection)
    pub selections: Vec<(String, AggregationSelection)>,
}
