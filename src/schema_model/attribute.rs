use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::annotations::{Annotations, TimestampOperation};
use super::model::ConcreteEntityId;

/// Built-in scalar types understood by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    ID,
    String,
    Int,
    Float,
    Boolean,
    BigInt,
    DateTime,
    Date,
    Time,
    LocalTime,
    LocalDateTime,
    Duration,
    Point,
    CartesianPoint,
}

impl ScalarType {
    pub fn from_name(name: &str) -> Option<Self> {
        let scalar = match name {
            "ID" => ScalarType::ID,
            "String" => ScalarType::String,
            "Int" => ScalarType::Int,
            "Float" => ScalarType::Float,
            "Boolean" => ScalarType::Boolean,
            "BigInt" => ScalarType::BigInt,
            "DateTime" => ScalarType::DateTime,
            "Date" => ScalarType::Date,
            "Time" => ScalarType::Time,
            "LocalTime" => ScalarType::LocalTime,
            "LocalDateTime" => ScalarType::LocalDateTime,
            "Duration" => ScalarType::Duration,
            "Point" => ScalarType::Point,
            "CartesianPoint" => ScalarType::CartesianPoint,
            _ => return None,
        };
        Some(scalar)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::Float | ScalarType::BigInt)
    }

    pub fn is_string_like(&self) -> bool {
        matches!(self, ScalarType::ID | ScalarType::String)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ScalarType::DateTime
                | ScalarType::Date
                | ScalarType::Time
                | ScalarType::LocalTime
                | ScalarType::LocalDateTime
                | ScalarType::Duration
        )
    }

    /// Cypher function that turns an ISO string parameter into this type.
    pub fn cypher_constructor(&self) -> Option<&'static str> {
        match self {
            ScalarType::DateTime => Some("datetime"),
            ScalarType::Date => Some("date"),
            ScalarType::Time => Some("time"),
            ScalarType::LocalTime => Some("localtime"),
            ScalarType::LocalDateTime => Some("localdatetime"),
            ScalarType::Duration => Some("duration"),
            ScalarType::Point | ScalarType::CartesianPoint => Some("point"),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    Scalar(ScalarType),
    Enum(String),
    /// An object type without storage of its own: only valid behind
    /// `@cypher` or `@customResolver`.
    Object(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    pub kind: AttributeKind,
    pub is_list: bool,
    pub is_required: bool,
    pub list_items_required: bool,
}

impl AttributeType {
    pub fn scalar(&self) -> Option<ScalarType> {
        match self.kind {
            AttributeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeFlags {
    pub autogenerated: bool,
    pub unique: bool,
    /// `@id` or `@unique`: usable to address exactly one node (connectOrCreate)
    pub identifying: bool,
}

/// A persisted (or `@cypher`/custom-resolved) field of an entity or of a
/// relationship-properties type.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub attribute_type: AttributeType,
    /// Property key in the database (`@alias(property)` or the field name)
    pub database_name: String,
    pub flags: AttributeFlags,
    pub annotations: Annotations,
    /// For `@cypher` fields returning a node type: the concrete entity used
    /// to filter and project the returned nodes.
    pub cypher_target: Option<ConcreteEntityId>,
}

impl Attribute {
    pub fn is_cypher(&self) -> bool {
        self.annotations.cypher.is_some()
    }

    pub fn is_custom_resolved(&self) -> bool {
        self.annotations.custom_resolver.is_some()
    }

    /// Whether the attribute maps to a stored property.
    pub fn is_persisted(&self) -> bool {
        !self.is_cypher() && !self.is_custom_resolved()
    }

    pub fn coalesce_value(&self) -> Option<&Value> {
        self.annotations.coalesce.as_ref().map(|c| &c.value)
    }

    /// Whether the emitter sets this attribute itself on the given event.
    pub fn is_autogenerated_on(&self, event: TimestampOperation) -> bool {
        if let Some(id) = &self.annotations.id {
            return id.autogenerate && event == TimestampOperation::Create;
        }
        match &self.annotations.timestamp {
            Some(timestamp) => timestamp.operations.contains(&event),
            None => false,
        }
    }
}
