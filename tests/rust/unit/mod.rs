//! Unit tests - public API pieces exercised in isolation.

mod cypher_ast_tests;
mod schema_loading_tests;
