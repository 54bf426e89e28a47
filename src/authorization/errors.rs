use thiserror::Error;

/// Message the emitted validation calls raise; the driver reports it back
/// inside its own error text.
pub const AUTH_FORBIDDEN_ERROR: &str = "@neo4j/graphql/FORBIDDEN";

/// Prefix of the message raised when a singular relationship ends up with
/// more than one (or, if required, no) related node.
pub const RELATIONSHIP_REQUIRED_ERROR: &str = "@neo4j/graphql/RELATIONSHIP-REQUIRED";

/// The only authorization failure a caller ever sees. It carries no
/// detail about which predicate failed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Forbidden")]
    Forbidden,
}

impl AuthorizationError {
    /// Recognise a failed validation in a database error message.
    pub fn from_database_message(message: &str) -> Option<Self> {
        if message.contains(AUTH_FORBIDDEN_ERROR) {
            Some(AuthorizationError::Forbidden)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_is_opaque() {
        let error = AuthorizationError::from_database_message(
            "Failed to invoke procedure `apoc.util.validate`: Caused by: java.lang.RuntimeException: @neo4j/graphql/FORBIDDEN",
        )
        .unwrap();
        assert_eq!(error.to_string(), "Forbidden");
        assert_eq!(AuthorizationError::from_database_message("Constraint violation"), None);
    }
}
