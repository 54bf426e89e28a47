//! Aggregate selections: one CALL per selected value, each matching and
//! filtering on its own.

use super::ast::{Clause, Expr, NodePattern, Pattern, Projection};
use super::environment::CypherEnv;
use super::errors::CypherGeneratorError;
use super::predicates::Scope;
use super::read::match_section;
use crate::query_ast::fields::{AggregationField, AggregationSelection};
use crate::query_ast::operations::AggregateOperation;
use crate::query_ast::SortDirection;

type Result<T> = std::result::Result<T, CypherGeneratorError>;

/// CALL body prefix: import, MATCH and WHERE. Returns the node and
/// relationship variables bound by it.
fn matched(
    env: &mut CypherEnv<'_>,
    parent: Option<&str>,
    aggregate: &AggregateOperation,
) -> Result<(Vec<Clause>, String, Option<String>)> {
    let node = env.next_this();
    let mut clauses = Vec::new();
    let (pattern, edge) = match (parent, aggregate.relationship.as_ref()) {
        (Some(parent), Some(reference)) => {
            clauses.push(Clause::With(Projection::variables(&[parent])));
            let relationship = env.relationship(reference)?;
            let edge = env.next_this();
            let pattern = env.hop(
                parent,
                relationship,
                Some(&edge),
                NodePattern::new(&node, &env.labels(aggregate.entity)),
            );
            (pattern, Some(edge))
        }
        _ => (Pattern::node(NodePattern::new(&node, &env.labels(aggregate.entity))), None),
    };
    let scope = Scope {
        node: &node,
        edge: edge.as_deref(),
    };
    clauses.extend(match_section(
        env,
        Some(pattern),
        scope,
        &aggregate.filters,
        &aggregate.authorization,
    )?);
    Ok((clauses, node, edge))
}

/// Aggregations of one field. Shortest and longest come from the values
/// sorted by length; the rest are plain aggregate functions.
fn field_tail(env: &mut CypherEnv<'_>, variable: &str, field: &AggregationField, result: &str) -> Vec<Clause> {
    let value = Expr::property(variable, &field.property);
    let by_length = field
        .selections
        .iter()
        .any(|(_, s)| matches!(s, AggregationSelection::Shortest | AggregationSelection::Longest));

    if !by_length {
        let entries = field
            .selections
            .iter()
            .map(|(key, selection)| {
                let function = match selection {
                    AggregationSelection::Min => "min",
                    AggregationSelection::Max => "max",
                    AggregationSelection::Average => "avg",
                    AggregationSelection::Sum | AggregationSelection::Shortest | AggregationSelection::Longest => {
                        "sum"
                    }
                };
                (key.clone(), Expr::function(function, vec![value.clone()]))
            })
            .collect();
        return vec![Clause::Return(Projection::item(Expr::Map(entries), result))];
    }

    let list = env.next_var();
    let list_expr = Expr::var(list.as_str());
    let entries = field
        .selections
        .iter()
        .map(|(key, selection)| {
            let value = match selection {
                AggregationSelection::Longest => Expr::function("head", vec![list_expr.clone()]),
                AggregationSelection::Shortest => Expr::function("last", vec![list_expr.clone()]),
                AggregationSelection::Min => Expr::function("apoc.coll.min", vec![list_expr.clone()]),
                AggregationSelection::Max => Expr::function("apoc.coll.max", vec![list_expr.clone()]),
                AggregationSelection::Average => Expr::function("apoc.coll.avg", vec![list_expr.clone()]),
                AggregationSelection::Sum => Expr::function("apoc.coll.sum", vec![list_expr.clone()]),
            };
            (key.clone(), value)
        })
        .collect();
    vec![
        Clause::With(Projection {
            items: vec![(Expr::var(variable), None)],
            order_by: vec![(Expr::function("size", vec![value.clone()]), SortDirection::Desc)],
            ..Default::default()
        }),
        Clause::With(Projection::item(Expr::function("collect", vec![value]), &list)),
        Clause::Return(Projection::item(Expr::Map(entries), result)),
    ]
}

/// The CALLs and the map assembling their results.
fn aggregate_clauses(
    env: &mut CypherEnv<'_>,
    parent: Option<&str>,
    aggregate: &AggregateOperation,
) -> Result<(Vec<Clause>, Expr)> {
    let mut calls = Vec::new();
    let mut result = Vec::new();

    if let Some(count_key) = &aggregate.count {
        let (mut body, node, _) = matched(env, parent, aggregate)?;
        let variable = env.next_var();
        body.push(Clause::Return(Projection::item(
            Expr::function("count", vec![Expr::var(node)]),
            &variable,
        )));
        calls.push(Clause::Call(body));
        result.push((count_key.clone(), Expr::var(variable)));
    }

    let mut node_entries = Vec::new();
    for field in &aggregate.node_fields {
        let (mut body, node, _) = matched(env, parent, aggregate)?;
        let variable = env.next_var();
        body.extend(field_tail(env, &node, field, &variable));
        calls.push(Clause::Call(body));
        node_entries.push((field.alias.clone(), Expr::var(variable)));
    }
    match &aggregate.node_key {
        Some(key) => result.push((key.clone(), Expr::Map(node_entries))),
        None => result.extend(node_entries),
    }

    let mut edge_entries = Vec::new();
    for field in &aggregate.edge_fields {
        let (mut body, _, edge) = matched(env, parent, aggregate)?;
        let edge = edge.ok_or_else(|| CypherGeneratorError::EdgePropertyWithoutRelationship(field.field.clone()))?;
        let variable = env.next_var();
        body.extend(field_tail(env, &edge, field, &variable));
        calls.push(Clause::Call(body));
        edge_entries.push((field.alias.clone(), Expr::var(variable)));
    }
    if let Some(key) = &aggregate.edge_key {
        result.push((key.clone(), Expr::Map(edge_entries)));
    }

    Ok((calls, Expr::Map(result)))
}

/// `moviesAggregate`
pub fn aggregate_statement(env: &mut CypherEnv<'_>, aggregate: &AggregateOperation) -> Result<Vec<Clause>> {
    let (mut clauses, map) = aggregate_clauses(env, None, aggregate)?;
    clauses.push(Clause::Return(Projection::item(map, "this")));
    Ok(clauses)
}

/// `actorsAggregate` inside a projection: the CALLs go with the parent's
/// subqueries and the map is the field value.
pub(crate) fn nested_aggregate(
    env: &mut CypherEnv<'_>,
    parent: &str,
    aggregate: &AggregateOperation,
) -> Result<(Vec<Clause>, Expr)> {
    aggregate_clauses(env, Some(parent), aggregate)
}
