//! # Schema Validation Errors
//!
//! Every failure while turning a type-definition document into a schema
//! model. Any of these aborts the build; a partially built model is never
//! returned.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaValidationError {
    #[error("Unknown type `{type_name}` referenced by {referenced_by}")]
    UnresolvedType {
        type_name: String,
        referenced_by: String,
    },
    #[error("Type `{type_name}` is declared more than once")]
    DuplicateType { type_name: String },
    #[error("Field `{field}` is declared more than once on `{type_name}`")]
    DuplicateField { type_name: String, field: String },
    #[error("Types `{first}` and `{second}` both pluralize to `{plural}`")]
    PluralCollision {
        first: String,
        second: String,
        plural: String,
    },
    #[error("Ambiguous attribute `{type_name}.{field}`: alias `{alias}` collides with `{other}`")]
    AmbiguousAlias {
        type_name: String,
        field: String,
        alias: String,
        other: String,
    },
    #[error("@cypher field `{type_name}.{field}` cannot return the interface or union `{target}`")]
    InvalidCypherTarget {
        type_name: String,
        field: String,
        target: String,
    },
    #[error("`{entity}` implements `{interface}` but has no @relationship field `{field}`")]
    MissingRelationshipImplementation {
        interface: String,
        entity: String,
        field: String,
    },
    #[error("`{properties}` used by `{type_name}.{field}` is not annotated with @relationshipProperties")]
    InvalidRelationshipProperties {
        type_name: String,
        field: String,
        properties: String,
    },
    #[error("Relationship field `{type_name}.{field}` is declared by both `{first}` and `{second}`")]
    AmbiguousRelationshipDeclaration {
        type_name: String,
        field: String,
        first: String,
        second: String,
    },
    #[error("Invalid @{directive} on {location}: {message}")]
    InvalidDirective {
        directive: String,
        location: String,
        message: String,
    },
    #[error("Invalid type reference `{type_ref}`")]
    InvalidTypeReference { type_ref: String },
    #[error("Field `{type_name}.{field}` of entity type `{target}` needs @relationship or @cypher")]
    MissingRelationshipDirective {
        type_name: String,
        field: String,
        target: String,
    },
    #[error("Failed to read type definitions: {error}")]
    DocumentReadError { error: String },
    #[error("Failed to parse type definitions: {error}")]
    DocumentParseError { error: String },
}

impl SchemaValidationError {
    /// Create an UnresolvedType error, naming the declaration that points at it.
    ///
    /// # Example
    /// ```ignore
    /// SchemaValidationError::unresolved_with_context("Actr", "field Movie.actors")
    /// ```
    pub fn unresolved_with_context(
        type_name: impl Into<String>,
        referenced_by: impl Into<String>,
    ) -> Self {
        SchemaValidationError::UnresolvedType {
            type_name: type_name.into(),
            referenced_by: referenced_by.into(),
        }
    }

    pub fn directive_error_with_context(
        directive: impl Into<String>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SchemaValidationError::InvalidDirective {
            directive: directive.into(),
            location: location.into(),
            message: message.into(),
        }
    }
}
