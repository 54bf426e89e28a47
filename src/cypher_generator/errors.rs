use thiserror::Error;

/// Emission failures. These mean the operation tree and the schema model
/// disagree; a tree built by the factory from the same model never hits
/// them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CypherGeneratorError {
    #[error("Relationship `{field}` is not declared on `{type_name}`")]
    MissingRelationship { type_name: String, field: String },

    #[error("Edge property `{0}` used outside a relationship traversal")]
    EdgePropertyWithoutRelationship(String),

    #[error("Nested {0} cannot be emitted in a batch create")]
    UnsupportedBatchNesting(String),
}

impl CypherGeneratorError {
    pub fn missing_relationship_with_context(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        CypherGeneratorError::MissingRelationship {
            type_name: type_name.into(),
            field: field.into(),
        }
    }
}
