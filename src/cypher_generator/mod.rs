//! Cypher emission: renders an operation tree as one parameterised
//! statement.

pub mod aggregate;
pub mod ast;
pub mod authorization;
pub mod connection;
pub mod create;
pub mod environment;
pub mod errors;
pub mod mutation;
pub mod predicates;
pub mod projection;
pub mod read;
pub mod update;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::query_ast::{QueryOperation, TranslationContext};
use crate::schema_model::Neo4jGraphQLSchemaModel;
use ast::render_clauses;
pub use ast::ToCypher;
pub use environment::{ConnectionWindow, CypherEnv};
pub use errors::CypherGeneratorError;

/// A statement ready for the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CypherQuery {
    pub cypher: String,
    pub params: Map<String, Value>,
    /// Connections whose cursors and `pageInfo` are filled in from the
    /// returned rows
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connection_windows: Vec<ConnectionWindow>,
}

pub fn generate_cypher(
    model: &Neo4jGraphQLSchemaModel,
    context: &TranslationContext,
    operation: &QueryOperation,
) -> Result<CypherQuery, CypherGeneratorError> {
    let mut env = CypherEnv::new(model, context);
    let clauses = match operation {
        QueryOperation::Read(read) => read::read_statement(&mut env, read)?,
        QueryOperation::CompositeRead(read) => read::composite_read_statement(&mut env, read)?,
        QueryOperation::Connection(connection) => connection::connection_statement(&mut env, connection)?,
        QueryOperation::Aggregate(aggregate) => aggregate::aggregate_statement(&mut env, aggregate)?,
        QueryOperation::Create(create) => create::create_statement(&mut env, create)?,
        QueryOperation::UnwindCreate(create) => create::unwind_create_statement(&mut env, create)?,
        QueryOperation::Update(update) => update::update_statement(&mut env, update)?,
        QueryOperation::Delete(delete) => update::delete_statement(&mut env, delete)?,
        QueryOperation::CustomCypher(cypher) => read::custom_cypher_statement(&mut env, cypher)?,
    };
    let cypher = render_clauses(&clauses);
    let (params, connection_windows) = env.into_parts();
    log::debug!(
        "generated {} statement: {} clause(s), {} parameter(s)",
        operation.kind(),
        clauses.len(),
        params.len()
    );
    log::trace!("{}", cypher);
    Ok(CypherQuery {
        cypher,
        params,
        connection_windows,
    })
}
