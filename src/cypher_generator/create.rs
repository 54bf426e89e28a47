//! `createMovies`: either one CALL block per input row, or a single UNWIND
//! over the rows when every row is a plain nested create.

use super::ast::{Clause, Expr, NodePattern, Pattern, Projection, SetItem};
use super::authorization::row_validate_clauses;
use super::environment::CypherEnv;
use super::errors::CypherGeneratorError;
use super::mutation::{
    cardinality_checks, create_node, create_tail, edge_generated_items, entity_generated_items, mutation_return,
    typed_value, Gather,
};
use super::predicates::Scope;
use crate::query_ast::operations::{CreateOperation, UnwindCreateNode, UnwindCreateOperation, UnwindProperty};
use crate::schema_model::annotations::TimestampOperation;

type Result<T> = std::result::Result<T, CypherGeneratorError>;

pub fn create_statement(env: &mut CypherEnv<'_>, create: &CreateOperation) -> Result<Vec<Clause>> {
    let mut clauses = Vec::with_capacity(create.rows.len() + 1);
    let mut nodes = Vec::with_capacity(create.rows.len());
    for row in &create.rows {
        let node = env.next_this();
        let mut body = create_node(env, &node, row);
        body.extend(create_tail(env, &node, row)?);
        body.push(Clause::Return(Projection::variables(&[node.as_str()])));
        clauses.push(Clause::Call(body));
        nodes.push(node);
    }
    clauses.extend(mutation_return(env, &nodes, create.projection.as_ref(), Gather::List)?);
    Ok(clauses)
}

/// `SET node.p = row.f` for each property supplied by at least one row.
fn row_items(
    env: &mut CypherEnv<'_>,
    variable: &str,
    row: &Expr,
    properties: &[UnwindProperty],
    is_list: impl Fn(&str) -> bool,
) -> Vec<SetItem> {
    properties
        .iter()
        .map(|property| {
            let value = Expr::Property(Box::new(row.clone()), property.field.clone());
            SetItem::Property {
                variable: variable.to_string(),
                property: property.property.clone(),
                value: typed_value(env, value, property.scalar, is_list(&property.field)),
            }
        })
        .collect()
}

/// `CREATE` and `SET` of the node for one UNWIND level.
fn unwind_node(env: &mut CypherEnv<'_>, node: &str, row: &Expr, level: &UnwindCreateNode) -> Vec<Clause> {
    let model = env.model;
    let entity = model.concrete_entity(level.entity);
    let mut clauses = vec![Clause::Create(Pattern::node(NodePattern::new(node, &env.labels(level.entity))))];
    let mut items = row_items(env, node, row, &level.properties, |field| {
        entity.attribute(field).map_or(false, |a| a.attribute_type.is_list)
    });
    items.extend(entity_generated_items(env, node, level.entity, TimestampOperation::Create));
    if !items.is_empty() {
        clauses.push(Clause::Set(items));
    }
    clauses
}

/// What follows once the node of a level is connected to its parent: a
/// CALL per nested relationship unwinding `row.<field>.create`, then the
/// cardinality checks and the row validation.
fn unwind_tail(
    env: &mut CypherEnv<'_>,
    node: &str,
    row_variable: &str,
    row: &Expr,
    level: &UnwindCreateNode,
) -> Result<Vec<Clause>> {
    let model = env.model;
    let mut clauses = Vec::new();
    for nested in &level.relationships {
        let relationship = env.relationship(&nested.relationship)?;
        let item = env.next_var();
        let child = env.next_this();
        let edge = env.next_this();
        let child_row = Expr::property(&item, "node");
        let mut body = vec![
            Clause::With(Projection::variables(&[node, row_variable])),
            Clause::Unwind {
                expr: Expr::Property(
                    Box::new(Expr::Property(Box::new(row.clone()), relationship.name.clone())),
                    "create".to_string(),
                ),
                alias: item.clone(),
            },
        ];
        body.extend(unwind_node(env, &child, &child_row, &nested.node));
        body.push(Clause::Create(env.hop(node, relationship, Some(&edge), NodePattern::bound(&child))));
        let edge_row = Expr::property(&item, "edge");
        let mut edge_items = match relationship.properties {
            Some(id) => {
                let properties = model.relationship_properties(id);
                row_items(env, &edge, &edge_row, &nested.edge_properties, |field| {
                    properties
                        .attributes
                        .iter()
                        .any(|a| a.name == field && a.attribute_type.is_list)
                })
            }
            None => Vec::new(),
        };
        edge_items.extend(edge_generated_items(env, &edge, relationship, TimestampOperation::Create));
        if !edge_items.is_empty() {
            body.push(Clause::Set(edge_items));
        }
        body.extend(unwind_tail(env, &child, &item, &child_row, &nested.node)?);
        let result = env.next_var();
        body.push(Clause::Return(Projection::item(
            Expr::function("collect", vec![Expr::Literal(serde_json::Value::Null)]),
            &result,
        )));
        clauses.push(Clause::With(Projection::star()));
        clauses.push(Clause::Call(body));
    }

    let touched: Vec<&str> = level
        .relationships
        .iter()
        .map(|r| r.relationship.name.as_str())
        .collect();
    let checks = cardinality_checks(env, node, level.entity, &touched, true);
    if !checks.is_empty() && level.relationships.is_empty() {
        clauses.push(Clause::With(Projection::star()));
    }
    clauses.extend(checks);
    clauses.extend(row_validate_clauses(env, Scope::node(node), row, &level.authorization)?);
    Ok(clauses)
}

pub fn unwind_create_statement(env: &mut CypherEnv<'_>, create: &UnwindCreateOperation) -> Result<Vec<Clause>> {
    let rows = env.param(create.rows.clone());
    let row = env.next_var();
    let node = env.next_this();
    let mut body = vec![Clause::With(Projection::variables(&[row.as_str()]))];
    let row_expr = Expr::var(row.as_str());
    body.extend(unwind_node(env, &node, &row_expr, &create.tree));
    body.extend(unwind_tail(env, &node, &row, &row_expr, &create.tree)?);
    body.push(Clause::Return(Projection::variables(&[node.as_str()])));
    let mut clauses = vec![
        Clause::Unwind {
            expr: rows,
            alias: row.clone(),
        },
        Clause::Call(body),
    ];
    clauses.extend(mutation_return(env, &[node], create.projection.as_ref(), Gather::Collect)?);
    Ok(clauses)
}
