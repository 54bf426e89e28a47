//! Pieces shared by every mutation: property writes, generated values,
//! nested relationship operations, cardinality checks and the returned
//! projection.

use serde_json::json;

use super::ast::{BinaryOperator, Clause, Expr, NodePattern, Pattern, Projection, SetItem};
use super::authorization::{projection_validate_clauses, validate_clauses};
use super::environment::CypherEnv;
use super::errors::CypherGeneratorError;
use super::predicates::{filters_predicate, Scope};
use super::projection::projection;
use crate::authorization::RELATIONSHIP_REQUIRED_ERROR;
use crate::query_ast::operations::{
    CreateInput, MutationProjection, NestedConnect, NestedConnectOrCreate, NestedCreate, NestedDelete,
    NestedDisconnect, NestedMutation, NestedUpdate, PropertyWrite, RelationshipMutation, WriteOperator,
};
use crate::query_ast::{AuthorizationFilters, Filter};
use crate::schema_model::annotations::TimestampOperation;
use crate::schema_model::{Attribute, ConcreteEntityId, EntityRef, Relationship, ScalarType};

type Result<T> = std::result::Result<T, CypherGeneratorError>;

/// Wrap a parameter (or row value) holding a temporal or spatial input in
/// the type's constructor.
pub(crate) fn typed_value(env: &mut CypherEnv<'_>, value: Expr, scalar: Option<ScalarType>, is_list: bool) -> Expr {
    let constructor = match scalar.and_then(|s| s.cypher_constructor()) {
        Some(constructor) => constructor,
        None => return value,
    };
    if is_list {
        let item = env.next_var();
        return Expr::ListComprehension {
            variable: item.clone(),
            list: Box::new(value),
            filter: None,
            map: Some(Box::new(Expr::function(constructor, vec![Expr::var(item)]))),
        };
    }
    Expr::function(constructor, vec![value])
}

fn write_value(env: &mut CypherEnv<'_>, variable: &str, write: &PropertyWrite) -> Expr {
    let current = Expr::property(variable, &write.property);
    let is_list = write.value.is_array();
    let param = env.param(write.value.clone());
    match write.operator {
        WriteOperator::Set => typed_value(env, param, write.scalar, is_list),
        WriteOperator::Increment | WriteOperator::Add => Expr::binary(current, BinaryOperator::Add, param),
        WriteOperator::Decrement | WriteOperator::Subtract => Expr::binary(current, BinaryOperator::Subtract, param),
        WriteOperator::Push => {
            let pushed = typed_value(env, param, write.scalar, is_list);
            Expr::binary(
                Expr::function("coalesce", vec![current, Expr::List(Vec::new())]),
                BinaryOperator::Add,
                pushed,
            )
        }
        WriteOperator::Pop => Expr::Slice {
            list: Box::new(current.clone()),
            from: Box::new(Expr::Literal(json!(0))),
            to: Box::new(Expr::binary(
                Expr::function("size", vec![current]),
                BinaryOperator::Subtract,
                param,
            )),
        },
    }
}

pub(crate) fn write_items(env: &mut CypherEnv<'_>, variable: &str, writes: &[PropertyWrite]) -> Vec<SetItem> {
    writes
        .iter()
        .map(|write| SetItem::Property {
            variable: variable.to_string(),
            property: write.property.clone(),
            value: write_value(env, variable, write),
        })
        .collect()
}

/// `@id` and `@timestamp` values the statement fills in itself.
pub(crate) fn generated_items<'m>(
    variable: &str,
    attributes: impl Iterator<Item = &'m Attribute>,
    event: TimestampOperation,
) -> Vec<SetItem> {
    attributes
        .filter(|attribute| attribute.is_autogenerated_on(event))
        .filter_map(|attribute| {
            let value = if attribute.annotations.id.is_some() {
                Expr::function("randomUUID", Vec::new())
            } else {
                let constructor = attribute.attribute_type.scalar()?.cypher_constructor()?;
                Expr::function(constructor, Vec::new())
            };
            Some(SetItem::Property {
                variable: variable.to_string(),
                property: attribute.database_name.clone(),
                value,
            })
        })
        .collect()
}

pub(crate) fn entity_generated_items(
    env: &CypherEnv<'_>,
    variable: &str,
    entity: ConcreteEntityId,
    event: TimestampOperation,
) -> Vec<SetItem> {
    generated_items(variable, env.model.concrete_entity(entity).attributes.iter(), event)
}

pub(crate) fn edge_generated_items(
    env: &CypherEnv<'_>,
    variable: &str,
    relationship: &Relationship,
    event: TimestampOperation,
) -> Vec<SetItem> {
    match relationship.properties {
        Some(id) => generated_items(variable, env.model.relationship_properties(id).attributes.iter(), event),
        None => Vec::new(),
    }
}

fn set_clause(items: Vec<SetItem>) -> Option<Clause> {
    if items.is_empty() {
        None
    } else {
        Some(Clause::Set(items))
    }
}

/// `CREATE (node:Label) SET ...` for one input node.
pub(crate) fn create_node(env: &mut CypherEnv<'_>, node: &str, input: &CreateInput) -> Vec<Clause> {
    let mut clauses = vec![Clause::Create(Pattern::node(NodePattern::new(node, &env.labels(input.entity))))];
    let mut items = write_items(env, node, &input.writes);
    items.extend(entity_generated_items(env, node, input.entity, TimestampOperation::Create));
    clauses.extend(set_clause(items));
    clauses
}

/// Everything after a created node exists: nested operations, cardinality
/// checks and AFTER validation.
pub(crate) fn create_tail(env: &mut CypherEnv<'_>, node: &str, input: &CreateInput) -> Result<Vec<Clause>> {
    let mut clauses = Vec::new();
    let nested = relationship_mutations(env, node, &input.relationships)?;
    if !nested.is_empty() {
        clauses.push(Clause::With(Projection::star()));
        clauses.extend(nested);
    }
    let touched: Vec<&str> = input.relationships.iter().map(|r| r.relationship.name.as_str()).collect();
    clauses.extend(cardinality_checks(env, node, input.entity, &touched, true));
    clauses.extend(validate_clauses(env, Scope::node(node), &input.authorization.validate_after)?);
    Ok(clauses)
}

/// A singular relationship holds at most one node, exactly one if it is
/// required. Required ones are checked whenever `check_required` is set,
/// optional ones only when the mutation touched them.
pub(crate) fn cardinality_checks(
    env: &mut CypherEnv<'_>,
    node: &str,
    entity: ConcreteEntityId,
    touched: &[&str],
    check_required: bool,
) -> Vec<Clause> {
    let model = env.model;
    let entity = model.concrete_entity(entity);
    let mut checks = Vec::new();
    for relationship in entity.relationships.iter().filter(|r| !r.cardinality.is_list) {
        let required = relationship.cardinality.is_required;
        if !(touched.contains(&relationship.name.as_str()) || (required && check_required)) {
            continue;
        }
        let edge = env.next_this();
        let count = env.next_var();
        let target = match relationship.target {
            EntityRef::Concrete(target) => NodePattern {
                labels: env.labels(target),
                ..Default::default()
            },
            EntityRef::Composite(_) => NodePattern::default(),
        };
        let (condition, message) = if required {
            (
                Expr::eq(Expr::var(count.as_str()), Expr::Literal(json!(1))),
                format!("{}{}.{} required exactly once", RELATIONSHIP_REQUIRED_ERROR, entity.name, relationship.name),
            )
        } else {
            (
                Expr::binary(Expr::var(count.as_str()), BinaryOperator::Lte, Expr::Literal(json!(1))),
                format!(
                    "{}{}.{} must be less than or equal to one",
                    RELATIONSHIP_REQUIRED_ERROR, entity.name, relationship.name
                ),
            )
        };
        let result = env.next_var();
        checks.push(Clause::Call(vec![
            Clause::With(Projection::variables(&[node])),
            Clause::Match {
                optional: false,
                pattern: env.hop(node, relationship, Some(&edge), target),
                where_: None,
            },
            Clause::With(
                Projection::item(Expr::function("count", vec![Expr::var(edge.as_str())]), &count).with_where(Some(
                    Expr::function(
                        "apoc.util.validatePredicate",
                        vec![
                            Expr::not(condition),
                            Expr::Literal(json!(message)),
                            Expr::List(vec![Expr::Literal(json!(0))]),
                        ],
                    ),
                )),
            ),
            Clause::Return(Projection::item(Expr::var(count.as_str()), &result)),
        ]));
    }
    checks
}

/// Variables, WHERE and validation for a node reached through
/// `relationship` from `parent`.
fn matched_related(
    env: &mut CypherEnv<'_>,
    parent: &str,
    relationship: &Relationship,
    entity: ConcreteEntityId,
    filters: &[Filter],
    authorization: &AuthorizationFilters,
) -> Result<(Vec<Clause>, String, String)> {
    let edge = env.next_this();
    let node = env.next_this();
    let pattern = env.hop(parent, relationship, Some(&edge), NodePattern::new(&node, &env.labels(entity)));
    let scope = Scope::with_edge(&node, &edge);
    let mut subqueries = Vec::new();
    let mut parts = Vec::new();
    if let Some(predicate) = filters_predicate(env, scope, filters, &mut subqueries)? {
        parts.push(predicate);
    }
    if let Some(predicate) = filters_predicate(env, scope, &authorization.filters, &mut subqueries)? {
        parts.push(predicate);
    }
    let predicate = Expr::and_all(parts);
    let mut clauses = Vec::new();
    if subqueries.is_empty() {
        clauses.push(Clause::Match {
            optional: false,
            pattern,
            where_: predicate,
        });
    } else {
        clauses.push(Clause::Match {
            optional: false,
            pattern,
            where_: None,
        });
        clauses.extend(subqueries);
        clauses.push(Clause::With(Projection::star().with_where(predicate)));
    }
    clauses.extend(validate_clauses(env, scope, &authorization.validate_before)?);
    Ok((clauses, node, edge))
}

fn counted(env: &mut CypherEnv<'_>, mut body: Vec<Clause>) -> Clause {
    let result = env.next_var();
    body.push(Clause::Return(Projection::item(
        Expr::function("count", vec![Expr::Star]),
        &result,
    )));
    Clause::Call(body)
}

fn nested_block(env: &mut CypherEnv<'_>, parent: &str, mutations: &[RelationshipMutation]) -> Result<Vec<Clause>> {
    let nested = relationship_mutations(env, parent, mutations)?;
    if nested.is_empty() {
        return Ok(nested);
    }
    let mut clauses = vec![Clause::With(Projection::star())];
    clauses.extend(nested);
    Ok(clauses)
}

fn nested_create(
    env: &mut CypherEnv<'_>,
    parent: &str,
    relationship: &Relationship,
    create: &NestedCreate,
) -> Result<Clause> {
    let node = env.next_this();
    let edge = env.next_this();
    let mut body = vec![Clause::With(Projection::variables(&[parent]))];
    body.extend(create_node(env, &node, &create.node));
    body.push(Clause::Create(env.hop(parent, relationship, Some(&edge), NodePattern::bound(&node))));
    let mut edge_items = write_items(env, &edge, &create.edge);
    edge_items.extend(edge_generated_items(env, &edge, relationship, TimestampOperation::Create));
    body.extend(set_clause(edge_items));
    body.extend(create_tail(env, &node, &create.node)?);
    Ok(counted(env, body))
}

fn nested_connect(
    env: &mut CypherEnv<'_>,
    parent: &str,
    relationship: &Relationship,
    connect: &NestedConnect,
) -> Result<Clause> {
    let node = env.next_this();
    let edge = env.next_this();
    let scope = Scope::node(&node);
    let mut subqueries = Vec::new();
    let mut parts = Vec::new();
    if let Some(predicate) = filters_predicate(env, scope, &connect.filters, &mut subqueries)? {
        parts.push(predicate);
    }
    if let Some(predicate) = filters_predicate(env, scope, &connect.authorization.filters, &mut subqueries)? {
        parts.push(predicate);
    }
    let pattern = Pattern::node(NodePattern::new(&node, &env.labels(connect.entity)));
    let mut body = vec![Clause::With(Projection::variables(&[parent]))];
    if subqueries.is_empty() {
        body.push(Clause::Match {
            optional: false,
            pattern,
            where_: Expr::and_all(parts),
        });
    } else {
        body.push(Clause::Match {
            optional: false,
            pattern,
            where_: None,
        });
        body.extend(subqueries);
        body.push(Clause::With(Projection::star().with_where(Expr::and_all(parts))));
    }
    body.extend(validate_clauses(env, scope, &connect.authorization.validate_before)?);
    body.push(Clause::Merge {
        pattern: env.hop(parent, relationship, Some(&edge), NodePattern::bound(&node)),
        on_create: Vec::new(),
    });
    let mut edge_items = write_items(env, &edge, &connect.edge);
    edge_items.extend(edge_generated_items(env, &edge, relationship, TimestampOperation::Create));
    body.extend(set_clause(edge_items));
    body.extend(nested_block(env, &node, &connect.relationships)?);
    body.extend(validate_clauses(env, scope, &connect.authorization.validate_after)?);
    Ok(counted(env, body))
}

fn nested_disconnect(
    env: &mut CypherEnv<'_>,
    parent: &str,
    relationship: &Relationship,
    disconnect: &NestedDisconnect,
) -> Result<Clause> {
    let mut body = vec![Clause::With(Projection::variables(&[parent]))];
    let (matched, node, edge) = matched_related(
        env,
        parent,
        relationship,
        disconnect.entity,
        &disconnect.filters,
        &disconnect.authorization,
    )?;
    body.extend(matched);
    body.extend(relationship_mutations(env, &node, &disconnect.relationships)?);
    body.push(Clause::Delete {
        detach: false,
        variables: vec![edge],
    });
    Ok(counted(env, body))
}

fn nested_update(
    env: &mut CypherEnv<'_>,
    parent: &str,
    relationship: &Relationship,
    update: &NestedUpdate,
) -> Result<Clause> {
    let mut body = vec![Clause::With(Projection::variables(&[parent]))];
    let (matched, node, edge) =
        matched_related(env, parent, relationship, update.entity, &update.filters, &update.authorization)?;
    body.extend(matched);
    let mut items = write_items(env, &node, &update.writes);
    if !update.writes.is_empty() {
        items.extend(entity_generated_items(env, &node, update.entity, TimestampOperation::Update));
    }
    items.extend(write_items(env, &edge, &update.edge));
    if !update.edge.is_empty() {
        items.extend(edge_generated_items(env, &edge, relationship, TimestampOperation::Update));
    }
    body.extend(set_clause(items));
    body.extend(nested_block(env, &node, &update.relationships)?);
    body.extend(validate_clauses(env, Scope::node(&node), &update.authorization.validate_after)?);
    Ok(counted(env, body))
}

fn nested_delete(
    env: &mut CypherEnv<'_>,
    parent: &str,
    relationship: &Relationship,
    delete: &NestedDelete,
) -> Result<Clause> {
    let mut body = vec![Clause::With(Projection::variables(&[parent]))];
    let (matched, node, _) =
        matched_related(env, parent, relationship, delete.entity, &delete.filters, &delete.authorization)?;
    body.extend(matched);
    body.extend(relationship_mutations(env, &node, &delete.relationships)?);
    let doomed = env.next_var();
    let item = env.next_var();
    body.push(Clause::With(Projection {
        items: vec![(
            Expr::function("collect", vec![Expr::var(node.as_str())]),
            Some(doomed.clone()),
        )],
        ..Default::default()
    }));
    body.push(Clause::Foreach {
        variable: item.clone(),
        list: Expr::var(doomed.as_str()),
        body: vec![Clause::Delete {
            detach: true,
            variables: vec![item],
        }],
    });
    Ok(counted(env, body))
}

fn nested_connect_or_create(
    env: &mut CypherEnv<'_>,
    parent: &str,
    relationship: &Relationship,
    merge: &NestedConnectOrCreate,
) -> Result<Clause> {
    let node = env.next_this();
    let edge = env.next_this();
    let key: Vec<(String, Expr)> = write_items(env, &node, &merge.key)
        .into_iter()
        .map(|item| match item {
            SetItem::Property { property, value, .. } => (property, value),
        })
        .collect();
    let mut on_create = write_items(env, &node, &merge.on_create);
    on_create.extend(entity_generated_items(env, &node, merge.entity, TimestampOperation::Create));
    let mut edge_on_create = write_items(env, &edge, &merge.edge);
    edge_on_create.extend(edge_generated_items(env, &edge, relationship, TimestampOperation::Create));

    let mut body = vec![
        Clause::With(Projection::variables(&[parent])),
        Clause::Merge {
            pattern: Pattern::node(NodePattern {
                variable: Some(node.clone()),
                labels: env.labels(merge.entity),
                properties: key,
            }),
            on_create,
        },
        Clause::Merge {
            pattern: env.hop(parent, relationship, Some(&edge), NodePattern::bound(&node)),
            on_create: edge_on_create,
        },
    ];
    // a merged node may have existed before: filter rules cannot narrow it
    let mut predicates = merge.authorization.filters.clone();
    predicates.extend(merge.authorization.validate_before.iter().cloned());
    predicates.extend(merge.authorization.validate_after.iter().cloned());
    body.extend(validate_clauses(env, Scope::node(&node), &predicates)?);
    Ok(counted(env, body))
}

/// One CALL per nested operation, in input order.
pub(crate) fn relationship_mutations(
    env: &mut CypherEnv<'_>,
    parent: &str,
    mutations: &[RelationshipMutation],
) -> Result<Vec<Clause>> {
    let mut calls = Vec::new();
    for mutation in mutations {
        let relationship = env.relationship(&mutation.relationship)?;
        for operation in &mutation.operations {
            let call = match operation {
                NestedMutation::Create(create) => nested_create(env, parent, relationship, create)?,
                NestedMutation::Connect(connect) => nested_connect(env, parent, relationship, connect)?,
                NestedMutation::Disconnect(disconnect) => nested_disconnect(env, parent, relationship, disconnect)?,
                NestedMutation::Update(update) => nested_update(env, parent, relationship, update)?,
                NestedMutation::Delete(delete) => nested_delete(env, parent, relationship, delete)?,
                NestedMutation::ConnectOrCreate(merge) => nested_connect_or_create(env, parent, relationship, merge)?,
            };
            calls.push(call);
        }
    }
    Ok(calls)
}

/// How the projected nodes are gathered into the `data` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gather {
    /// `[this0 {..}, this1 {..}]`, one entry per created row
    List,
    /// `collect(this {..})` over the rows of an UNWIND
    Collect,
    /// `collect(DISTINCT this {..})`; nested writes can repeat a node
    CollectDistinct,
}

/// Closing clauses of a create or update: validation and projection of
/// every returned node, then one row holding them under `data`.
pub(crate) fn mutation_return(
    env: &mut CypherEnv<'_>,
    nodes: &[String],
    projected: Option<&MutationProjection>,
    gather: Gather,
) -> Result<Vec<Clause>> {
    let projected = match projected {
        Some(projected) => projected,
        None => {
            return Ok(vec![Clause::Return(Projection::item(
                Expr::Literal(json!("Query cannot conclude with CALL")),
                "data",
            ))])
        }
    };
    let mut clauses = vec![Clause::With(Projection::star())];
    let mut maps = Vec::with_capacity(nodes.len());
    for node in nodes {
        clauses.extend(projection_validate_clauses(env, Scope::node(node), &projected.authorization)?);
        let (subqueries, items) = projection(env, node, &projected.fields)?;
        clauses.extend(subqueries);
        maps.push(Expr::MapProjection(node.clone(), items));
    }
    let data = match gather {
        Gather::List => Expr::List(maps),
        Gather::Collect | Gather::CollectDistinct => {
            let mut map = maps.pop().unwrap_or(Expr::Map(Vec::new()));
            if gather == Gather::CollectDistinct {
                map = Expr::Distinct(Box::new(map));
            }
            Expr::function("collect", vec![map])
        }
    };
    clauses.push(Clause::Return(Projection::item(data, "data")));
    Ok(clauses)
}
