//! Emission of woven `@authorization` predicates.

use serde_json::json;

use super::ast::{Clause, Expr, Projection};
use super::environment::CypherEnv;
use super::errors::CypherGeneratorError;
use super::predicates::{filters_predicate, Scope};
use crate::authorization::AUTH_FORBIDDEN_ERROR;
use crate::query_ast::{AuthorizationFilters, Filter};

fn forbidden_args(predicate: Expr) -> Vec<Expr> {
    vec![
        Expr::not(predicate),
        Expr::Literal(json!(AUTH_FORBIDDEN_ERROR)),
        Expr::List(vec![Expr::Literal(json!(0))]),
    ]
}

/// Part of a read's WHERE: the filter rules ANDed with the user filters.
pub fn read_filter_predicate(
    env: &mut CypherEnv<'_>,
    scope: Scope<'_>,
    authorization: &AuthorizationFilters,
    subqueries: &mut Vec<Clause>,
) -> Result<Option<Expr>, CypherGeneratorError> {
    filters_predicate(env, scope, &authorization.filters, subqueries)
}

/// `WITH * WHERE apoc.util.validatePredicate(...)` over the rows left by the
/// MATCH, so a row excluded by the filters never raises.
pub fn read_validate_clauses(
    env: &mut CypherEnv<'_>,
    scope: Scope<'_>,
    authorization: &AuthorizationFilters,
) -> Result<Vec<Clause>, CypherGeneratorError> {
    let mut clauses = Vec::new();
    let validate = match filters_predicate(env, scope, &authorization.validate_before, &mut clauses)? {
        Some(validate) => validate,
        None => return Ok(Vec::new()),
    };
    clauses.push(Clause::With(Projection::star().with_where(Some(Expr::function(
        "apoc.util.validatePredicate",
        forbidden_args(validate),
    )))));
    Ok(clauses)
}

/// `WITH * CALL apoc.util.validate(NOT (...), ...)` raising the forbidden
/// error when `predicates` do not all hold. Nothing when there are none.
pub fn validate_clauses(
    env: &mut CypherEnv<'_>,
    scope: Scope<'_>,
    predicates: &[Filter],
) -> Result<Vec<Clause>, CypherGeneratorError> {
    let mut clauses = Vec::new();
    let predicate = match filters_predicate(env, scope, predicates, &mut clauses)? {
        Some(predicate) => predicate,
        None => return Ok(Vec::new()),
    };
    clauses.push(Clause::With(Projection::star()));
    clauses.push(Clause::Procedure {
        name: "apoc.util.validate",
        args: forbidden_args(predicate),
    });
    Ok(clauses)
}

/// Validation of a batch-created row: type rules always, attribute rules
/// only when the row supplies the attribute.
pub fn row_validate_clauses(
    env: &mut CypherEnv<'_>,
    scope: Scope<'_>,
    row: &Expr,
    authorization: &AuthorizationFilters,
) -> Result<Vec<Clause>, CypherGeneratorError> {
    let mut clauses = Vec::new();
    let mut parts = Vec::new();
    if let Some(predicate) = filters_predicate(env, scope, &authorization.validate_after, &mut clauses)? {
        parts.push(predicate);
    }
    for (field, filter) in &authorization.field_validate_after {
        if let Some(predicate) = filters_predicate(env, scope, std::slice::from_ref(filter), &mut clauses)? {
            parts.push(Expr::Or(vec![
                Expr::IsNull(Box::new(Expr::Property(Box::new(row.clone()), field.clone()))),
                predicate,
            ]));
        }
    }
    let predicate = match Expr::and_all(parts) {
        Some(predicate) => predicate,
        None => return Ok(Vec::new()),
    };
    clauses.push(Clause::With(Projection::star()));
    clauses.push(Clause::Procedure {
        name: "apoc.util.validate",
        args: forbidden_args(predicate),
    });
    Ok(clauses)
}

/// Returned nodes of a mutation cannot be filtered away, so READ filter
/// rules on them are validated like BEFORE rules.
pub fn projection_validate_clauses(
    env: &mut CypherEnv<'_>,
    scope: Scope<'_>,
    authorization: &AuthorizationFilters,
) -> Result<Vec<Clause>, CypherGeneratorError> {
    let mut predicates = authorization.filters.clone();
    predicates.extend(authorization.validate_before.iter().cloned());
    validate_clauses(env, scope, &predicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::cypher_generator::ast::{render_clauses, ToCypher};
    use crate::query_ast::TranslationContext;
    use crate::schema_model::testing::movies_model;

    #[test]
    fn test_read_validation_is_a_separate_clause() {
        let model = movies_model();
        let context = TranslationContext::new(TranslatorConfig::default());
        let mut env = CypherEnv::new(&model, &context);
        let authorization = AuthorizationFilters {
            filters: vec![Filter::Authenticated],
            validate_before: vec![Filter::Authenticated],
            ..Default::default()
        };
        let mut subqueries = Vec::new();
        let predicate = read_filter_predicate(&mut env, Scope::node("this"), &authorization, &mut subqueries)
            .unwrap()
            .unwrap();
        assert_eq!(predicate.to_cypher(), "$isAuthenticated = true");
        let clauses = read_validate_clauses(&mut env, Scope::node("this"), &authorization).unwrap();
        assert_eq!(
            render_clauses(&clauses),
            "WITH *\nWHERE apoc.util.validatePredicate(NOT ($isAuthenticated = true), \"@neo4j/graphql/FORBIDDEN\", [0])"
        );
        assert!(read_validate_clauses(&mut env, Scope::node("this"), &AuthorizationFilters::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_validate_clauses() {
        let model = movies_model();
        let context = TranslationContext::new(TranslatorConfig::default());
        let mut env = CypherEnv::new(&model, &context);
        assert!(validate_clauses(&mut env, Scope::node("this"), &[]).unwrap().is_empty());
        let clauses = validate_clauses(&mut env, Scope::node("this"), &[Filter::Authenticated]).unwrap();
        assert_eq!(
            render_clauses(&clauses),
            "WITH *\nCALL apoc.util.validate(NOT ($isAuthenticated = true), \"@neo4j/graphql/FORBIDDEN\", [0])"
        );
    }
}
