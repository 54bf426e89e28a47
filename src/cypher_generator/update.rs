//! `updateMovies` and `deleteMovies`.

use super::ast::{Clause, NodePattern, Pattern, Projection};
use super::authorization::validate_clauses;
use super::environment::CypherEnv;
use super::errors::CypherGeneratorError;
use super::mutation::{
    cardinality_checks, entity_generated_items, mutation_return, relationship_mutations, write_items, Gather,
};
use super::predicates::Scope;
use super::read::match_section;
use crate::query_ast::operations::{DeleteOperation, UpdateOperation};
use crate::query_ast::{AuthorizationFilters, Filter};
use crate::schema_model::annotations::TimestampOperation;
use crate::schema_model::ConcreteEntityId;

type Result<T> = std::result::Result<T, CypherGeneratorError>;

const ROOT: &str = "this";

/// `MATCH (this:Label) WHERE ...` then the BEFORE validation as its own
/// clause, so it only runs on the rows that survived the filters.
fn matched_root(
    env: &mut CypherEnv<'_>,
    entity: ConcreteEntityId,
    filters: &[Filter],
    authorization: &AuthorizationFilters,
) -> Result<Vec<Clause>> {
    let filtering = AuthorizationFilters {
        filters: authorization.filters.clone(),
        ..Default::default()
    };
    let pattern = Pattern::node(NodePattern::new(ROOT, &env.labels(entity)));
    let mut clauses = match_section(env, Some(pattern), Scope::node(ROOT), filters, &filtering)?;
    clauses.extend(validate_clauses(env, Scope::node(ROOT), &authorization.validate_before)?);
    Ok(clauses)
}

pub fn update_statement(env: &mut CypherEnv<'_>, update: &UpdateOperation) -> Result<Vec<Clause>> {
    let mut clauses = matched_root(env, update.entity, &update.filters, &update.authorization)?;

    let mut items = write_items(env, ROOT, &update.writes);
    if !update.writes.is_empty() {
        items.extend(entity_generated_items(env, ROOT, update.entity, TimestampOperation::Update));
    }
    if !items.is_empty() {
        clauses.push(Clause::Set(items));
    }

    let nested = relationship_mutations(env, ROOT, &update.relationships)?;
    let touched: Vec<&str> = update
        .relationships
        .iter()
        .map(|r| r.relationship.name.as_str())
        .collect();
    let checks = cardinality_checks(env, ROOT, update.entity, &touched, false);
    if !nested.is_empty() || !checks.is_empty() {
        clauses.push(Clause::With(Projection::star()));
    }
    clauses.extend(nested);
    clauses.extend(checks);
    clauses.extend(validate_clauses(env, Scope::node(ROOT), &update.authorization.validate_after)?);

    clauses.extend(mutation_return(
        env,
        &[ROOT.to_string()],
        update.projection.as_ref(),
        Gather::CollectDistinct,
    )?);
    Ok(clauses)
}

pub fn delete_statement(env: &mut CypherEnv<'_>, delete: &DeleteOperation) -> Result<Vec<Clause>> {
    let mut clauses = matched_root(env, delete.entity, &delete.filters, &delete.authorization)?;
    let nested = relationship_mutations(env, ROOT, &delete.relationships)?;
    if !nested.is_empty() {
        clauses.push(Clause::With(Projection::star()));
        clauses.extend(nested);
    }
    clauses.push(Clause::Delete {
        detach: true,
        variables: vec![ROOT.to_string()],
    });
    Ok(clauses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::cypher_generator::ast::render_clauses;
    use crate::query_ast::{QueryAstFactory, QueryOperation, ResolveTree, TranslationContext};
    use crate::schema_model::testing::movies_model;
    use serde_json::{json, Value};

    fn emit(tree: Value) -> String {
        let model = movies_model();
        let context = TranslationContext::new(TranslatorConfig::default());
        let tree: ResolveTree = serde_json::from_value(tree).unwrap();
        let operation = QueryAstFactory::new(&model, &context).create_query_ast(&tree).unwrap();
        let mut env = CypherEnv::new(&model, &context);
        let clauses = match &operation {
            QueryOperation::Update(update) => update_statement(&mut env, update).unwrap(),
            QueryOperation::Delete(delete) => delete_statement(&mut env, delete).unwrap(),
            other => panic!("unexpected {:?}", other.kind()),
        };
        render_clauses(&clauses)
    }

    #[test]
    fn test_update_operators() {
        let cypher = emit(json!({
            "name": "updateMovies",
            "args": {
                "where": { "title": "Heat" },
                "update": { "released_INCREMENT": 1, "title_SET": "Heat 2" }
            },
            "fields": [{ "name": "movies", "fields": [{ "name": "title" }] }]
        }));
        assert_eq!(
            cypher,
            "MATCH (this:Movie)\n\
             WHERE this.title = $param0\n\
             SET\n    this.released = this.released + $param1,\n    this.title = $param2\n\
             WITH *\n\
             RETURN collect(DISTINCT this { .title }) AS data"
        );
    }

    #[test]
    fn test_nested_update_disconnect_and_connect_or_create() {
        let cypher = emit(json!({
            "name": "updateMovies",
            "args": { "update": {
                "actors": {
                    "update": [{ "where": { "node": { "name": "Keanu" } }, "update": { "edge": { "screenTime_INCREMENT": 5 } } }],
                    "disconnect": [{ "where": { "edge": { "screenTime_LT": 1 } } }],
                    "connectOrCreate": [{ "where": { "node": { "name": "Carrie" } }, "onCreate": { "node": { "born": 1967 } } }]
                }
            } },
            "fields": []
        }));
        assert!(cypher.starts_with("MATCH (this:Movie)\nWITH *\nCALL {\n    WITH this\n    MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)\n"));
        assert!(cypher.contains("SET\n        this0.screenTime = this0.screenTime + $param"));
        assert!(cypher.contains("WHERE this5.screenTime < $param7"));
        assert!(cypher.contains("    DELETE this5\n"));
        assert!(cypher.contains("MERGE (this"));
        assert!(cypher.contains(":Actor { name: $param"));
        assert!(cypher.contains("ON CREATE SET\n"));
    }

    #[test]
    fn test_delete_with_nested_delete() {
        let cypher = emit(json!({
            "name": "deleteMovies",
            "args": {
                "where": { "title": "Heat" },
                "delete": { "actors": [{ "where": { "node": { "name": "Al" } } }] }
            },
            "fields": []
        }));
        assert_eq!(
            cypher,
            "MATCH (this:Movie)\n\
             WHERE this.title = $param0\n\
             WITH *\n\
             CALL {\n    WITH this\n    MATCH (this)<-[this1:ACTED_IN]-(this2:Actor)\n    WHERE this2.name = $param3\n    \
             WITH collect(this2) AS var4\n    FOREACH (var5 IN var4 | DETACH DELETE var5)\n    RETURN count(*) AS var6\n}\n\
             DETACH DELETE this"
        );
    }
}
