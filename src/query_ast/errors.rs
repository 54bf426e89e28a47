use thiserror::Error;

use crate::cypher_generator::errors::CypherGeneratorError;

/// Failures while turning one request into an operation tree. Each aborts
/// only the operation being translated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    #[error("Unknown root field `{0}`")]
    UnknownRootField(String),

    #[error("Unknown field `{field}` on `{type_name}`")]
    UnknownField { type_name: String, field: String },

    #[error("Unknown entity `{0}`")]
    UnknownEntity(String),

    #[error("Unknown relationship `{field}` on `{type_name}`")]
    UnknownRelationship { type_name: String, field: String },

    #[error("Invalid argument `{argument}`: {message}")]
    InvalidArgument { argument: String, message: String },

    #[error("Nested operation `{operation}` is not allowed on `{type_name}.{field}`")]
    NestedOperationNotAllowed {
        type_name: String,
        field: String,
        operation: String,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error(transparent)]
    Generation(#[from] CypherGeneratorError),
}

impl TranslationError {
    pub fn unknown_field_with_context(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        TranslationError::UnknownField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    /// Create an InvalidArgument error for the named argument.
    ///
    /// # Example
    /// ```ignore
    /// TranslationError::invalid_argument_with_context("after", "requires `sort`")
    /// ```
    pub fn invalid_argument_with_context(
        argument: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        TranslationError::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }
}
