//! Relay connections.
//!
//! Matched rows become `{ node, properties }` edge maps which are counted
//! before paging and paged after sorting on the projected keys. Cursors
//! and `pageInfo` are not emitted: the window is recorded so the response
//! can be finished once the rows are back.

use serde_json::json;

use super::ast::{Clause, Expr, NodePattern, Pattern, ProjectionItem, Projection};
use super::environment::{ConnectionWindow, CypherEnv, TOTAL_COUNT_KEY};
use super::errors::CypherGeneratorError;
use super::predicates::Scope;
use super::projection::{has_key, projection};
use super::read::{match_section, paging};
use crate::query_ast::operations::ConnectionReadOperation;
use crate::query_ast::PropertyOwner;

type Result<T> = std::result::Result<T, CypherGeneratorError>;

const NODE_KEY: &str = "node";
const PROPERTIES_KEY: &str = "properties";

/// Clauses computing the connection map, and the map itself. `parent` is
/// the node the connection hangs off; nested connections are wrapped in a
/// CALL by the caller.
fn connection_clauses(
    env: &mut CypherEnv<'_>,
    parent: Option<&str>,
    connection: &ConnectionReadOperation,
) -> Result<(Vec<Clause>, Expr)> {
    let selection = &connection.selection;
    let node_key = selection.node.clone().unwrap_or_else(|| NODE_KEY.to_string());
    let properties_key = selection.properties.clone().unwrap_or_else(|| PROPERTIES_KEY.to_string());
    let union = connection.branches.len() > 1;
    let edge_column = env.next_var();

    let mut branches = Vec::with_capacity(connection.branches.len());
    for branch in &connection.branches {
        let node = env.next_this();
        let mut clauses = Vec::new();
        let (pattern, relationship) = match (parent, connection.relationship.as_ref()) {
            (Some(parent), Some(reference)) => {
                if union {
                    clauses.push(Clause::With(Projection::variables(&[parent])));
                }
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
            edge: relationship.as_deref(),
        };
        clauses.extend(match_section(env, Some(pattern), scope, &branch.filters, &branch.authorization)?);

        env.enter(&selection.edges.clone().unwrap_or_default());
        env.enter(&node_key);
        let projected = projection(env, &node, &branch.node_fields);
        env.leave();
        env.leave();
        let (subqueries, mut node_items) = projected?;
        if union {
            node_items.push(ProjectionItem::Entry(
                "__resolveType".to_string(),
                Expr::Literal(json!(env.type_name(branch.entity))),
            ));
        }
        let mut edge_entries = vec![(node_key.clone(), Expr::MapProjection(node.clone(), node_items))];

        if let Some(edge) = &relationship {
            let (_, mut property_items) = projection(env, edge, &connection.edge_fields)?;
            for sort in connection.sort.iter().filter(|s| s.owner == PropertyOwner::Edge) {
                if !has_key(&property_items, &sort.field) {
                    property_items.push(ProjectionItem::Entry(sort.field.clone(), Expr::property(edge, &sort.property)));
                }
            }
            if selection.properties.is_some() || !property_items.is_empty() {
                edge_entries.push((properties_key.clone(), Expr::MapProjection(edge.clone(), property_items)));
            }
        }
        if let Some((_, Expr::MapProjection(_, node_items))) = edge_entries.first_mut() {
            for sort in connection.sort.iter().filter(|s| s.owner == PropertyOwner::Node) {
                if !has_key(node_items, &sort.field) {
                    node_items.push(ProjectionItem::Entry(sort.field.clone(), Expr::property(&node, &sort.property)));
                }
            }
        }

        clauses.extend(subqueries);
        clauses.push(Clause::With(Projection::item(Expr::Map(edge_entries), &edge_column)));
        if union {
            clauses.push(Clause::Return(Projection::variables(&[edge_column.as_str()])));
        }
        branches.push(clauses);
    }

    let mut clauses = if union {
        vec![Clause::Call(vec![Clause::Union(branches)])]
    } else {
        branches.into_iter().flatten().collect()
    };

    let edges = env.next_var();
    let total = env.next_var();
    clauses.push(Clause::With(Projection::item(
        Expr::function("collect", vec![Expr::var(edge_column.as_str())]),
        &edges,
    )));
    clauses.push(Clause::With(Projection {
        items: vec![
            (Expr::var(edges.as_str()), None),
            (Expr::function("size", vec![Expr::var(edges.as_str())]), Some(total.clone())),
        ],
        ..Default::default()
    }));

    let mut result = Vec::new();
    if let Some(edges_key) = &selection.edges {
        let edge = env.next_var();
        let page = env.next_var();
        let order_by = connection
            .sort
            .iter()
            .map(|sort| {
                let key = match sort.owner {
                    PropertyOwner::Node => &node_key,
                    PropertyOwner::Edge => &properties_key,
                };
                (
                    Expr::Property(Box::new(Expr::property(&edge, key)), sort.field.clone()),
                    sort.direction,
                )
            })
            .collect();
        let (skip, limit) = paging(env, connection.pagination);
        clauses.push(Clause::Call(vec![
            Clause::With(Projection::variables(&[edges.as_str()])),
            Clause::Unwind {
                expr: Expr::var(edges.as_str()),
                alias: edge.clone(),
            },
            Clause::With(Projection {
                items: vec![(Expr::var(edge.as_str()), None)],
                order_by,
                skip,
                limit,
                ..Default::default()
            }),
            Clause::Return(Projection::item(
                Expr::function("collect", vec![Expr::var(edge.as_str())]),
                &page,
            )),
        ]));
        result.push((edges_key.clone(), Expr::var(page)));
    }
    result.push((
        selection.total_count.clone().unwrap_or_else(|| TOTAL_COUNT_KEY.to_string()),
        Expr::var(total),
    ));

    let path = env.current_path();
    env.add_window(ConnectionWindow {
        path,
        offset: connection.pagination.offset.unwrap_or(0),
        first: connection.pagination.limit,
        edges: selection.edges.clone(),
        cursor: selection.cursor.clone(),
        total_count: selection.total_count.clone(),
        page_info: selection.page_info.clone(),
    });
    Ok((clauses, Expr::Map(result)))
}

/// `moviesConnection`: one row holding the connection map.
pub fn connection_statement(env: &mut CypherEnv<'_>, connection: &ConnectionReadOperation) -> Result<Vec<Clause>> {
    let (mut clauses, map) = connection_clauses(env, None, connection)?;
    clauses.push(Clause::Return(Projection::item(map, "this")));
    Ok(clauses)
}

pub(crate) fn nested_connection(
    env: &mut CypherEnv<'_>,
    parent: &str,
    connection: &ConnectionReadOperation,
) -> Result<(Clause, String)> {
    let mut body = vec![Clause::With(Projection::variables(&[parent]))];
    let (clauses, map) = connection_clauses(env, Some(parent), connection)?;
    body.extend(clauses);
    let result = env.next_var();
    body.push(Clause::Return(Projection::item(map, &result)));
    Ok((Clause::Call(body), result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::cypher_generator::ast::render_clauses;
    use crate::cypher_generator::read::read_statement;
    use crate::query_ast::{QueryAstFactory, QueryOperation, ResolveTree, TranslationContext};
    use crate::schema_model::testing::movies_model;
    use serde_json::Value;

    fn emit(tree: Value) -> (String, serde_json::Map<String, Value>, Vec<ConnectionWindow>) {
        let model = movies_model();
        let context = TranslationContext::new(TranslatorConfig::default());
        let tree: ResolveTree = serde_json::from_value(tree).unwrap();
        let operation = QueryAstFactory::new(&model, &context).create_query_ast(&tree).unwrap();
        let mut env = CypherEnv::new(&model, &context);
        let clauses = match &operation {
            QueryOperation::Connection(connection) => connection_statement(&mut env, connection).unwrap(),
            QueryOperation::Read(read) => read_statement(&mut env, read).unwrap(),
            other => panic!("unexpected {:?}", other.kind()),
        };
        let cypher = render_clauses(&clauses);
        let (params, windows) = env.into_parts();
        (cypher, params, windows)
    }

    #[test]
    fn test_root_connection() {
        let (cypher, params, windows) = emit(json!({
            "name": "moviesConnection",
            "args": { "first": 2, "sort": [{ "title": "ASC" }] },
            "fields": [
                { "name": "totalCount" },
                { "name": "edges", "fields": [
                    { "name": "cursor" },
                    { "name": "node", "fields": [{ "name": "title" }] }
                ] }
            ]
        }));
        assert_eq!(
            cypher,
            "MATCH (this1:Movie)\n\
             WITH { node: this1 { .title } } AS var0\n\
             WITH collect(var0) AS var2\n\
             WITH var2, size(var2) AS var3\n\
             CALL {\n    WITH var2\n    UNWIND var2 AS var4\n    WITH var4\n    ORDER BY var4.node.title ASC\n    LIMIT $param6\n    RETURN collect(var4) AS var5\n}\n\
             RETURN { edges: var5, totalCount: var3 } AS this"
        );
        assert_eq!(params.get("param6"), Some(&json!(2)));
        assert_eq!(
            windows,
            vec![ConnectionWindow {
                path: vec![],
                offset: 0,
                first: Some(2),
                edges: Some("edges".to_string()),
                cursor: Some("cursor".to_string()),
                total_count: Some("totalCount".to_string()),
                page_info: None,
            }]
        );
    }

    #[test]
    fn test_nested_connection_with_edge_properties() {
        let (cypher, _, windows) = emit(json!({
            "name": "movies",
            "fields": [
                { "name": "actorsConnection", "args": { "where": { "edge": { "screenTime_GT": 10 } } }, "fields": [
                    { "name": "edges", "fields": [
                        { "name": "properties", "fields": [{ "name": "screenTime" }] },
                        { "name": "node", "fields": [{ "name": "name" }] }
                    ] }
                ] }
            ]
        }));
        assert!(cypher.contains("MATCH (this)<-[this2:ACTED_IN]-(this1:Actor)\n    WHERE this2.screenTime > $param3"));
        assert!(cypher.contains("WITH { node: this1 { .name }, properties: this2 { .screenTime } } AS var0"));
        assert!(cypher.ends_with("RETURN this { actorsConnection: var8 } AS this"));
        assert_eq!(windows[0].path, vec!["actorsConnection".to_string()]);
        assert_eq!(windows[0].total_count, None);
    }

    #[test]
    fn test_interface_connection_unions_branches() {
        let (cypher, _, _) = emit(json!({
            "name": "productionsConnection",
            "fields": [
                { "name": "edges", "fields": [
                    { "name": "node", "fields": [{ "name": "title" }] }
                ] }
            ]
        }));
        assert!(cypher.starts_with("CALL {\n    MATCH (this1:Movie)"));
        assert!(cypher.contains("__resolveType: \"Movie\""));
        assert!(cypher.contains("RETURN var0\n    UNION\n    MATCH (this2:Series)"));
    }
}
