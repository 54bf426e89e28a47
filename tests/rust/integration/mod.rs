//! Integration tests - drive the whole pipeline from a YAML schema fixture
//! and a request tree to Cypher text and parameters.

mod authorization_tests;
mod mutation_translation_tests;
mod read_translation_tests;

use neographql::config::TranslatorConfig;
use neographql::query_ast::{ResolveTree, TranslationContext, TranslationError};
use neographql::schema_model::{build_schema_model, Neo4jGraphQLSchemaModel, SchemaBuildOptions, TypeDefinitionDocument};
use neographql::CypherQuery;
use serde_json::Value;

pub const MOVIES_SCHEMA: &str = include_str!("../../fixtures/movies.yaml");
pub const AUTH_SCHEMA: &str = include_str!("../../fixtures/auth.yaml");

pub fn model(yaml: &str) -> Neo4jGraphQLSchemaModel {
    let document = TypeDefinitionDocument::from_yaml_str(yaml).expect("fixture parses");
    build_schema_model(document, &SchemaBuildOptions::default()).expect("fixture builds")
}

pub fn translate_with(
    schema: &str,
    request: Value,
    context: &TranslationContext,
) -> Result<CypherQuery, TranslationError> {
    let model = model(schema);
    let tree: ResolveTree = serde_json::from_value(request).expect("request tree");
    neographql::translate(&model, &tree, context)
}

pub fn translate(schema: &str, request: Value) -> CypherQuery {
    translate_with(schema, request, &TranslationContext::new(TranslatorConfig::default())).expect("translates")
}
