//! Authorization Weaver: attaches `@authorization` filter and validate
//! predicates to an operation tree.

pub mod errors;
pub mod weaver;

pub use errors::{AuthorizationError, AUTH_FORBIDDEN_ERROR, RELATIONSHIP_REQUIRED_ERROR};
pub use weaver::AuthorizationWeaver;

use crate::query_ast::{QueryOperation, TranslationContext, TranslationError};
use crate::schema_model::Neo4jGraphQLSchemaModel;

pub fn weave(
    model: &Neo4jGraphQLSchemaModel,
    context: &TranslationContext,
    operation: &mut QueryOperation,
) -> Result<(), TranslationError> {
    AuthorizationWeaver::new(model, context).weave(operation)
}
