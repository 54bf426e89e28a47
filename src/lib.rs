//! neographql - GraphQL to Cypher translation
//!
//! This crate turns GraphQL requests into parameterised Cypher through:
//! - A typed schema model compiled from type definitions
//! - An operation tree built per request
//! - Authorization rules woven into that tree
//! - Cypher emission, including single-statement batch creates

pub mod utils;

pub mod authorization;
pub mod config;
pub mod cypher_generator;
pub mod query_ast;
pub mod schema_model;
pub mod translate;

pub use cypher_generator::CypherQuery;
pub use translate::{finalize_connection, translate, MutationCounters};
