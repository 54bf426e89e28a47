//! Shared schema fixtures for unit tests.

use super::{build_schema_model, Neo4jGraphQLSchemaModel, SchemaBuildOptions, TypeDefinitionDocument};

pub const MOVIES_SCHEMA: &str = include_str!("../../tests/fixtures/movies.yaml");
pub const AUTH_SCHEMA: &str = include_str!("../../tests/fixtures/auth.yaml");

pub fn model_from_yaml(yaml: &str) -> Neo4jGraphQLSchemaModel {
    let document = TypeDefinitionDocument::from_yaml_str(yaml).expect("fixture parses");
    build_schema_model(document, &SchemaBuildOptions::default()).expect("fixture builds")
}

pub fn movies_model() -> Neo4jGraphQLSchemaModel {
    model_from_yaml(MOVIES_SCHEMA)
}

pub fn auth_model() -> Neo4jGraphQLSchemaModel {
    model_from_yaml(AUTH_SCHEMA)
}
