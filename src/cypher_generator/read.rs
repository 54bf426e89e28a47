//! Emission of reads: plain, composite (interface/union) and `@cypher`
//! backed roots, plus the MATCH/WHERE and ORDER/SKIP/LIMIT sections every
//! read shares.

use serde_json::json;

use super::ast::{Clause, Expr, NodePattern, Pattern, ProjectionItem, Projection};
use super::authorization::{read_filter_predicate, read_validate_clauses};
use super::environment::CypherEnv;
use super::errors::CypherGeneratorError;
use super::predicates::{cypher_statement_call, filters_predicate, Scope};
use super::projection::{has_key, projection};
use crate::query_ast::operations::{CompositeReadOperation, CustomCypherOperation, ReadOperation};
use crate::query_ast::{AuthorizationFilters, Filter, Pagination, PropertyOwner, SortField};

type Result<T> = std::result::Result<T, CypherGeneratorError>;

/// MATCH and WHERE. Filter subqueries go between the MATCH and a
/// `WITH * WHERE`; the predicate is user filters, then authorization
/// filters. The read validation follows in its own `WITH * WHERE` on the
/// surviving rows. Without a pattern the variables are already bound and
/// only the filtering WITH is emitted.
pub(crate) fn match_section(
    env: &mut CypherEnv<'_>,
    pattern: Option<Pattern>,
    scope: Scope<'_>,
    filters: &[Filter],
    authorization: &AuthorizationFilters,
) -> Result<Vec<Clause>> {
    let mut subqueries = Vec::new();
    let mut parts = Vec::new();
    if let Some(predicate) = filters_predicate(env, scope, filters, &mut subqueries)? {
        parts.push(predicate);
    }
    if let Some(predicate) = read_filter_predicate(env, scope, authorization, &mut subqueries)? {
        parts.push(predicate);
    }
    let predicate = Expr::and_all(parts);

    let mut clauses = Vec::new();
    match pattern {
        Some(pattern) if subqueries.is_empty() => clauses.push(Clause::Match {
            optional: false,
            pattern,
            where_: predicate,
        }),
        Some(pattern) => {
            clauses.push(Clause::Match {
                optional: false,
                pattern,
                where_: None,
            });
            clauses.extend(subqueries);
            if predicate.is_some() {
                clauses.push(Clause::With(Projection::star().with_where(predicate)));
            }
        }
        None => {
            clauses.extend(subqueries);
            if predicate.is_some() {
                clauses.push(Clause::With(Projection::star().with_where(predicate)));
            }
        }
    }
    clauses.extend(read_validate_clauses(env, scope, authorization)?);
    Ok(clauses)
}

pub(crate) fn paging(env: &mut CypherEnv<'_>, pagination: Pagination) -> (Option<Expr>, Option<Expr>) {
    let skip = pagination.offset.map(|offset| env.param(json!(offset)));
    let limit = pagination.limit.map(|limit| env.param(json!(limit)));
    (skip, limit)
}

/// `WITH * ORDER BY ... SKIP ... LIMIT ...` over matched variables.
/// `@cypher` sort keys are computed in a subquery first.
pub(crate) fn order_section(
    env: &mut CypherEnv<'_>,
    node: &str,
    edge: Option<&str>,
    sort: &[SortField],
    pagination: Pagination,
) -> Result<Vec<Clause>> {
    if sort.is_empty() && pagination.is_empty() {
        return Ok(Vec::new());
    }
    let mut clauses = Vec::new();
    let mut order_by = Vec::with_capacity(sort.len());
    for field in sort {
        let key = match (&field.cypher, field.owner) {
            (Some(cypher), _) => {
                let column = env.next_this();
                let result = env.next_var();
                let mut body = cypher_statement_call(node, &cypher.statement, &cypher.column_name, &column);
                body.push(Clause::Return(Projection::item(
                    Expr::function("head", vec![Expr::function("collect", vec![Expr::var(column.as_str())])]),
                    &result,
                )));
                clauses.push(Clause::Call(body));
                Expr::var(result)
            }
            (None, PropertyOwner::Edge) => Expr::property(
                edge.ok_or_else(|| CypherGeneratorError::EdgePropertyWithoutRelationship(field.field.clone()))?,
                &field.property,
            ),
            (None, PropertyOwner::Node) => Expr::property(node, &field.property),
        };
        order_by.push((key, field.direction));
    }
    let (skip, limit) = paging(env, pagination);
    clauses.push(Clause::With(Projection {
        order_by,
        skip,
        limit,
        ..Projection::star()
    }));
    Ok(clauses)
}

fn relationship_cardinality(env: &CypherEnv<'_>, read_relationship: Option<&crate::schema_model::relationship::RelationshipRef>) -> Result<bool> {
    match read_relationship {
        Some(reference) => Ok(env.relationship(reference)?.cardinality.is_list),
        None => Ok(true),
    }
}

fn collected(variable: &str, is_list: bool) -> Expr {
    let collected = Expr::function("collect", vec![Expr::var(variable)]);
    if is_list {
        collected
    } else {
        Expr::function("head", vec![collected])
    }
}

/// `MATCH (this:Movie) ... RETURN this { ... } AS this`
pub fn read_statement(env: &mut CypherEnv<'_>, read: &ReadOperation) -> Result<Vec<Clause>> {
    let node = "this";
    let pattern = Pattern::node(NodePattern::new(node, &env.labels(read.entity)));
    let mut clauses = match_section(env, Some(pattern), Scope::node(node), &read.filters, &read.authorization)?;
    clauses.extend(order_section(env, node, None, &read.sort, read.pagination)?);
    let (subqueries, items) = projection(env, node, &read.fields)?;
    clauses.extend(subqueries);
    clauses.push(Clause::Return(Projection::item(
        Expr::MapProjection(node.to_string(), items),
        "this",
    )));
    Ok(clauses)
}

/// Subquery reading across a relationship; returns the CALL and the
/// variable holding the collected projection.
pub(crate) fn nested_read(env: &mut CypherEnv<'_>, parent: &str, read: &ReadOperation) -> Result<(Clause, String)> {
    let reference = read
        .relationship
        .as_ref()
        .ok_or_else(|| CypherGeneratorError::missing_relationship_with_context(env.type_name(read.entity), &read.alias))?;
    let relationship = env.relationship(reference)?;
    let edge = env.next_this();
    let node = env.next_this();
    let pattern = env.hop(
        parent,
        relationship,
        Some(&edge),
        NodePattern::new(&node, &env.labels(read.entity)),
    );

    let mut body = vec![Clause::With(Projection::variables(&[parent]))];
    body.extend(match_section(
        env,
        Some(pattern),
        Scope::with_edge(&node, &edge),
        &read.filters,
        &read.authorization,
    )?);
    body.extend(order_section(env, &node, Some(&edge), &read.sort, read.pagination)?);
    let (subqueries, items) = projection(env, &node, &read.fields)?;
    body.extend(subqueries);
    body.push(Clause::With(Projection::item(Expr::MapProjection(node.clone(), items), &node)));
    let result = env.next_var();
    body.push(Clause::Return(Projection::item(
        collected(&node, relationship.cardinality.is_list),
        &result,
    )));
    Ok((Clause::Call(body), result))
}

/// One UNION branch per concrete type, each returning its projection,
/// tagged with `__resolveType`, under `column`.
fn composite_union(
    env: &mut CypherEnv<'_>,
    parent: Option<&str>,
    read: &CompositeReadOperation,
    column: &str,
) -> Result<Clause> {
    let mut branches = Vec::with_capacity(read.branches.len());
    for branch in &read.branches {
        let node = env.next_this();
        let mut clauses = Vec::new();
        let (pattern, edge) = match (parent, read.relationship.as_ref()) {
            (Some(parent), Some(reference)) => {
                clauses.push(Clause::With(Projection::variables(&[parent])));
                let relationship = env.relationship(reference)?;
                let edge = env.next_this();
                let pattern = env.hop(
                    parent,
                    relationship,
                    Some(&edge),
                    NodePattern::new(&node, &env.labels(branch.entity)),
                );
                (pattern, Some(edge))
            }
            _ => (Pattern::node(NodePattern::new(&node, &env.labels(branch.entity))), None),
        };
        let scope = Scope {
            node: &node,
            edge: edge.as_deref(),
        };
        clauses.extend(match_section(env, Some(pattern), scope, &branch.filters, &branch.authorization)?);
        clauses.extend(order_section(env, &node, edge.as_deref(), &branch.sort, branch.pagination)?);

        let (subqueries, mut items) = projection(env, &node, &branch.fields)?;
        items.push(ProjectionItem::Entry(
            "__resolveType".to_string(),
            Expr::Literal(json!(env.type_name(branch.entity))),
        ));
        for sort in &read.sort {
            if !has_key(&items, &sort.field) {
                items.push(ProjectionItem::Entry(sort.field.clone(), Expr::property(&node, &sort.property)));
            }
        }
        clauses.extend(subqueries);
        clauses.push(Clause::With(Projection::item(Expr::MapProjection(node.clone(), items), column)));
        clauses.push(Clause::Return(Projection::variables(&[column])));
        branches.push(clauses);
    }
    Ok(Clause::Call(vec![Clause::Union(branches)]))
}

/// Ordering of unioned projections, by their projected keys.
fn composite_order(env: &mut CypherEnv<'_>, column: &str, read: &CompositeReadOperation) -> Option<Projection> {
    if read.sort.is_empty() && read.pagination.is_empty() {
        return None;
    }
    let (skip, limit) = paging(env, read.pagination);
    Some(Projection {
        items: vec![(Expr::var(column), None)],
        order_by: read
            .sort
            .iter()
            .map(|sort| (Expr::property(column, &sort.field), sort.direction))
            .collect(),
        skip,
        limit,
        ..Default::default()
    })
}

pub fn composite_read_statement(env: &mut CypherEnv<'_>, read: &CompositeReadOperation) -> Result<Vec<Clause>> {
    let column = "this";
    let mut clauses = vec![composite_union(env, None, read, column)?];
    if let Some(order) = composite_order(env, column, read) {
        clauses.push(Clause::With(order));
    }
    clauses.push(Clause::Return(Projection::item(Expr::var(column), "this")));
    Ok(clauses)
}

pub(crate) fn nested_composite_read(
    env: &mut CypherEnv<'_>,
    parent: &str,
    read: &CompositeReadOperation,
) -> Result<(Clause, String)> {
    let column = env.next_var();
    let is_list = relationship_cardinality(env, read.relationship.as_ref())?;
    let mut body = vec![
        Clause::With(Projection::variables(&[parent])),
        composite_union(env, Some(parent), read, &column)?,
    ];
    if let Some(order) = composite_order(env, &column, read) {
        body.push(Clause::With(order));
    }
    body.push(Clause::Return(Projection::item(collected(&column, is_list), &column)));
    Ok((Clause::Call(body), column))
}

fn bind_statement_params(env: &mut CypherEnv<'_>, statement: &str, args: &serde_json::Map<String, serde_json::Value>) {
    for (name, value) in args {
        env.named_param(name, value.clone());
    }
    if statement.contains(&format!("${}", env.context.config.jwt_param_name)) {
        env.jwt();
    }
}

/// Root `@cypher` field: the statement's rows, filtered and projected when
/// it returns nodes.
pub fn custom_cypher_statement(env: &mut CypherEnv<'_>, cypher: &CustomCypherOperation) -> Result<Vec<Clause>> {
    bind_statement_params(env, &cypher.statement, &cypher.args);
    let node = "this";
    let mut clauses = vec![
        Clause::Call(vec![Clause::Statement(cypher.statement.clone())]),
        Clause::With(Projection::item(
            Expr::var(super::ast::escape_name(&cypher.column_name)),
            node,
        )),
    ];
    match &cypher.target {
        Some(target) => {
            clauses.extend(match_section(env, None, Scope::node(node), &target.filters, &target.authorization)?);
            clauses.extend(order_section(env, node, None, &target.sort, target.pagination)?);
            let (subqueries, items) = projection(env, node, &target.fields)?;
            clauses.extend(subqueries);
            clauses.push(Clause::Return(Projection::item(
                Expr::MapProjection(node.to_string(), items),
                "this",
            )));
        }
        None => clauses.push(Clause::Return(Projection::variables(&[node]))),
    }
    Ok(clauses)
}

/// `@cypher` field inside a projection.
pub(crate) fn nested_cypher_field(
    env: &mut CypherEnv<'_>,
    parent: &str,
    field: &crate::query_ast::CypherAttributeField,
) -> Result<(Clause, String)> {
    bind_statement_params(env, &field.statement, &field.args);
    let column = env.next_this();
    let mut body = cypher_statement_call(parent, &field.statement, &field.column_name, &column);
    if let Some(target) = &field.target {
        body.extend(match_section(env, None, Scope::node(&column), &target.filters, &target.authorization)?);
        body.extend(order_section(env, &column, None, &target.sort, target.pagination)?);
        let (subqueries, items) = projection(env, &column, &target.fields)?;
        body.extend(subqueries);
        body.push(Clause::With(Projection::item(Expr::MapProjection(column.clone(), items), &column)));
    }
    let result = env.next_var();
    body.push(Clause::Return(Projection::item(collected(&column, field.is_list), &result)));
    Ok((Clause::Call(body), result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::cypher_generator::ast::render_clauses;
    use crate::query_ast::{QueryAstFactory, QueryOperation, ResolveTree, TranslationContext};
    use crate::schema_model::testing::movies_model;
    use serde_json::Value;

    fn emit(tree: Value) -> (String, serde_json::Map<String, Value>) {
        let model = movies_model();
        let context = TranslationContext::new(TranslatorConfig::default());
        let tree: ResolveTree = serde_json::from_value(tree).unwrap();
        let operation = QueryAstFactory::new(&model, &context).create_query_ast(&tree).unwrap();
        let mut env = CypherEnv::new(&model, &context);
        let clauses = match &operation {
            QueryOperation::Read(read) => read_statement(&mut env, read).unwrap(),
            QueryOperation::CompositeRead(read) => composite_read_statement(&mut env, read).unwrap(),
            QueryOperation::CustomCypher(cypher) => custom_cypher_statement(&mut env, cypher).unwrap(),
            other => panic!("unexpected {:?}", other.kind()),
        };
        (render_clauses(&clauses), env.params().clone())
    }

    #[test]
    fn test_root_read_with_filter_sort_and_limit() {
        let (cypher, params) = emit(json!({
            "name": "movies",
            "args": {
                "where": { "title": "The Matrix" },
                "sort": [{ "title": "DESC" }],
                "limit": 5
            },
            "fields": [
                { "name": "title" },
                { "name": "tagline" }
            ]
        }));
        assert_eq!(
            cypher,
            "MATCH (this:Movie)\nWHERE this.title = $param0\nWITH *\nORDER BY this.title DESC\nLIMIT $param1\nRETURN this { .title, tagline: this.tag_line } AS this"
        );
        assert_eq!(params.get("param0"), Some(&json!("The Matrix")));
        assert_eq!(params.get("param1"), Some(&json!(5)));
    }

    #[test]
    fn test_nested_read_collects_in_subquery() {
        let (cypher, _) = emit(json!({
            "name": "movies",
            "fields": [
                { "name": "title" },
                {
                    "name": "actors",
                    "args": { "where": { "name_STARTS_WITH": "K" } },
                    "fields": [{ "name": "name" }]
                },
                { "name": "director", "fields": [{ "name": "name" }] }
            ]
        }));
        assert!(cypher.contains(
            "CALL {\n    WITH this\n    MATCH (this)<-[this0:ACTED_IN]-(this1:Actor)\n    WHERE this1.name STARTS WITH $param2\n    WITH this1 { .name } AS this1\n    RETURN collect(this1) AS var3\n}"
        ));
        assert!(cypher.contains("RETURN head(collect(this5)) AS var6"));
        assert!(cypher.ends_with("RETURN this { .title, actors: var3, director: var6 } AS this"));
    }

    #[test]
    fn test_coalesce_and_datetime_projection() {
        let (cypher, _) = emit(json!({
            "name": "movies",
            "fields": [{ "name": "views" }, { "name": "createdAt" }]
        }));
        assert!(cypher.contains("views: coalesce(this.views, 0)"));
        assert!(cypher.contains(
            "createdAt: apoc.date.convertFormat(toString(this.createdAt), \"iso_zoned_date_time\", \"iso_offset_date_time\")"
        ));
    }

    #[test]
    fn test_interface_read_unions_branches() {
        let (cypher, _) = emit(json!({
            "name": "productions",
            "args": { "sort": [{ "title": "ASC" }] },
            "fields": [{ "name": "title" }]
        }));
        assert!(cypher.starts_with("CALL {\n    MATCH (this0:Movie)"));
        assert!(cypher.contains("__resolveType: \"Movie\""));
        assert!(cypher.contains("\n    UNION\n    MATCH (this1:Series)"));
        assert!(cypher.contains("WITH this\nORDER BY this.title ASC\nRETURN this"));
    }

    #[test]
    fn test_root_cypher_field() {
        let (cypher, _) = emit(json!({
            "name": "topMovies",
            "fields": [{ "name": "title" }]
        }));
        assert_eq!(
            cypher,
            "CALL {\n    MATCH (m:Movie) RETURN m ORDER BY m.rating DESC LIMIT 5\n}\nWITH m AS this\nRETURN this { .title } AS this"
        );
    }

    #[test]
    fn test_nested_cypher_field_projects_target() {
        let (cypher, _) = emit(json!({
            "name": "movies",
            "fields": [
                { "name": "actorCount" },
                { "name": "topActor", "fields": [{ "name": "name" }] }
            ]
        }));
        assert!(cypher.contains(
            "CALL {\n    WITH this\n    CALL {\n        WITH this\n        WITH this\n        MATCH (this)<-[:ACTED_IN]-(a:Actor) RETURN count(a) AS c\n    }\n    WITH c AS this0\n    RETURN head(collect(this0)) AS var1\n}"
        ));
        assert!(cypher.contains("WITH this2 { .name } AS this2"));
        assert!(cypher.ends_with("RETURN this { actorCount: var1, topActor: var3 } AS this"));
    }
}
