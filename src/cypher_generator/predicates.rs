//! Rendering of the predicate tree.
//!
//! Every function takes the variables in scope explicitly and returns the
//! predicate expression. Predicates that need a subquery (aggregations,
//! `@cypher` fields) push it onto `subqueries`; the caller places those
//! before the WHERE that uses the returned expression.

use serde_json::{json, Value};

use super::ast::{BinaryOperator, Clause, Expr, NodePattern, Pattern, Projection};
use super::environment::CypherEnv;
use super::errors::CypherGeneratorError;
use crate::query_ast::filters::{
    AggregationComparator, AggregationFilter, AggregationFunction, AggregationPredicate, CypherFieldComparison,
    CypherFieldFilter, LogicalOperator, PropertyFilter, RelationshipFilter,
};
use crate::query_ast::{Filter, FilterValue, PropertyOwner, Quantifier};
use crate::schema_model::{FilterOperator, ScalarType};

/// Variables a predicate may refer to.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'s> {
    pub node: &'s str,
    /// The relationship that reached `node`, when there is one
    pub edge: Option<&'s str>,
}

impl<'s> Scope<'s> {
    pub fn node(node: &'s str) -> Self {
        Scope { node, edge: None }
    }

    pub fn with_edge(node: &'s str, edge: &'s str) -> Self {
        Scope { node, edge: Some(edge) }
    }
}

type Result<T> = std::result::Result<T, CypherGeneratorError>;

/// Conjunction of `filters`; `None` when there are none.
pub fn filters_predicate(
    env: &mut CypherEnv<'_>,
    scope: Scope<'_>,
    filters: &[Filter],
    subqueries: &mut Vec<Clause>,
) -> Result<Option<Expr>> {
    let mut parts = Vec::with_capacity(filters.len());
    for filter in filters {
        parts.push(filter_predicate(env, scope, filter, subqueries)?);
    }
    Ok(Expr::and_all(parts))
}

pub fn filter_predicate(
    env: &mut CypherEnv<'_>,
    scope: Scope<'_>,
    filter: &Filter,
    subqueries: &mut Vec<Clause>,
) -> Result<Expr> {
    match filter {
        Filter::Property(property) => property_predicate(env, scope, property),
        Filter::Logical { operator, children } => {
            let mut parts = Vec::with_capacity(children.len());
            for child in children {
                parts.push(filter_predicate(env, scope, child, subqueries)?);
            }
            Ok(match operator {
                LogicalOperator::And => Expr::and_all(parts).unwrap_or_else(|| Expr::boolean(true)),
                LogicalOperator::Or => Expr::or_all(parts).unwrap_or_else(|| Expr::boolean(false)),
                LogicalOperator::Not => Expr::not(Expr::and_all(parts).unwrap_or_else(|| Expr::boolean(true))),
            })
        }
        Filter::Relationship(relationship) => relationship_predicate(env, scope, relationship),
        Filter::Aggregation(aggregation) => aggregation_predicate(env, scope, aggregation, subqueries),
        Filter::TypeName { entities } => {
            let checks = entities
                .iter()
                .map(|entity| Expr::HasLabels(scope.node.to_string(), env.labels(*entity)))
                .collect();
            Ok(Expr::or_all(checks).unwrap_or_else(|| Expr::boolean(false)))
        }
        Filter::CypherField(cypher) => cypher_field_predicate(env, scope, cypher, subqueries),
        Filter::Jwt { path, operator, value } => {
            let claim = env.jwt_claim(path);
            let comparison = compare(env, claim.clone(), None, *operator, value);
            Ok(Expr::And(vec![Expr::IsNotNull(Box::new(claim)), comparison]))
        }
        Filter::Authenticated => Ok(Expr::eq(env.is_authenticated(), Expr::boolean(true))),
    }
}

fn property_predicate(env: &mut CypherEnv<'_>, scope: Scope<'_>, filter: &PropertyFilter) -> Result<Expr> {
    let variable = match filter.owner {
        PropertyOwner::Node => scope.node,
        PropertyOwner::Edge => scope
            .edge
            .ok_or_else(|| CypherGeneratorError::EdgePropertyWithoutRelationship(filter.field.clone()))?,
    };
    let mut property = Expr::property(variable, &filter.property);
    if let Some(coalesce) = &filter.coalesce {
        property = Expr::function("coalesce", vec![property, Expr::Literal(coalesce.clone())]);
    }
    let scalar = if filter.is_list { None } else { filter.scalar };
    Ok(compare(env, property, scalar, filter.operator, &filter.value))
}

/// `left <operator> value`. A JWT value is guarded so that a missing claim
/// never matches.
fn compare(
    env: &mut CypherEnv<'_>,
    left: Expr,
    scalar: Option<ScalarType>,
    operator: FilterOperator,
    value: &FilterValue,
) -> Expr {
    if value.is_null() && operator == FilterOperator::Eq {
        return Expr::IsNull(Box::new(left));
    }
    let (right, guard) = match value {
        FilterValue::Param(value) => (typed_param(env, value.clone(), scalar, operator), None),
        FilterValue::Jwt(path) => {
            let claim = env.jwt_claim(path);
            (claim.clone(), Some(claim))
        }
    };
    let comparison = match operator {
        FilterOperator::Includes => Expr::binary(right, BinaryOperator::In, left),
        other => Expr::binary(left, binary_operator(other), right),
    };
    match guard {
        Some(guard) => Expr::And(vec![Expr::IsNotNull(Box::new(guard)), comparison]),
        None => comparison,
    }
}

fn binary_operator(operator: FilterOperator) -> BinaryOperator {
    match operator {
        FilterOperator::Eq => BinaryOperator::Eq,
        FilterOperator::In | FilterOperator::Includes => BinaryOperator::In,
        FilterOperator::Lt => BinaryOperator::Lt,
        FilterOperator::Lte => BinaryOperator::Lte,
        FilterOperator::Gt => BinaryOperator::Gt,
        FilterOperator::Gte => BinaryOperator::Gte,
        FilterOperator::Contains => BinaryOperator::Contains,
        FilterOperator::StartsWith => BinaryOperator::StartsWith,
        FilterOperator::EndsWith => BinaryOperator::EndsWith,
        FilterOperator::Matches => BinaryOperator::Matches,
    }
}

/// Temporal and spatial values arrive as strings or maps and are converted
/// with the type's constructor before comparing.
fn typed_param(env: &mut CypherEnv<'_>, value: Value, scalar: Option<ScalarType>, operator: FilterOperator) -> Expr {
    let param = env.param(value);
    let constructor = match scalar.and_then(|s| s.cypher_constructor()) {
        Some(constructor) => constructor,
        None => return param,
    };
    if operator == FilterOperator::In {
        let item = env.next_var();
        return Expr::ListComprehension {
            variable: item.clone(),
            list: Box::new(param),
            filter: None,
            map: Some(Box::new(Expr::function(constructor, vec![Expr::var(item)]))),
        };
    }
    Expr::function(constructor, vec![param])
}

/// MATCH, or MATCH then the nested subqueries and a filtering WITH, as the
/// body of an EXISTS or COUNT.
fn pattern_body(pattern: Pattern, predicate: Option<Expr>, subqueries: Vec<Clause>) -> Vec<Clause> {
    if subqueries.is_empty() {
        return vec![Clause::Match {
            optional: false,
            pattern,
            where_: predicate,
        }];
    }
    let mut body = vec![Clause::Match {
        optional: false,
        pattern,
        where_: None,
    }];
    body.extend(subqueries);
    body.push(Clause::With(Projection::star().with_where(predicate)));
    body
}

fn relationship_predicate(env: &mut CypherEnv<'_>, scope: Scope<'_>, filter: &RelationshipFilter) -> Result<Expr> {
    let relationship = env.relationship(&filter.relationship)?;
    let mut per_target = Vec::with_capacity(filter.targets.len());
    for target in &filter.targets {
        let edge = env.next_this();
        let node = env.next_this();
        let pattern = env.hop(
            scope.node,
            relationship,
            Some(&edge),
            NodePattern::new(&node, &env.labels(target.entity)),
        );
        let mut inner_subqueries = Vec::new();
        let inner = filters_predicate(env, Scope::with_edge(&node, &edge), &target.filters, &mut inner_subqueries)?;

        let quantified = match filter.quantifier {
            Quantifier::Some => Expr::Exists(pattern_body(pattern, inner, inner_subqueries)),
            Quantifier::None => Expr::not(Expr::Exists(pattern_body(pattern, inner, inner_subqueries))),
            Quantifier::Single => Expr::Count(pattern_body(pattern, inner, inner_subqueries)),
            Quantifier::All => match inner {
                Some(inner) => Expr::And(vec![
                    Expr::Exists(pattern_body(pattern.clone(), Some(inner.clone()), inner_subqueries.clone())),
                    Expr::not(Expr::Exists(pattern_body(
                        pattern,
                        Some(Expr::not(inner)),
                        inner_subqueries,
                    ))),
                ]),
                None => Expr::Exists(pattern_body(pattern, None, inner_subqueries)),
            },
        };
        per_target.push(quantified);
    }

    let combined = match filter.quantifier {
        Quantifier::Some => Expr::or_all(per_target),
        Quantifier::None | Quantifier::All => Expr::and_all(per_target),
        Quantifier::Single => per_target
            .into_iter()
            .reduce(|sum, count| Expr::binary(sum, BinaryOperator::Add, count))
            .map(|total| Expr::eq(total, Expr::Literal(json!(1)))),
    };
    Ok(combined.unwrap_or_else(|| Expr::boolean(false)))
}

fn aggregation_predicate(
    env: &mut CypherEnv<'_>,
    scope: Scope<'_>,
    filter: &AggregationFilter,
    subqueries: &mut Vec<Clause>,
) -> Result<Expr> {
    let relationship = env.relationship(&filter.relationship)?;
    let edge = env.next_this();
    let node = env.next_this();
    let pattern = env.hop(
        scope.node,
        relationship,
        Some(&edge),
        NodePattern::new(&node, &env.labels(filter.target)),
    );
    let mut parts = Vec::with_capacity(filter.predicates.len());
    for predicate in &filter.predicates {
        parts.push(aggregation_expr(env, &node, &edge, predicate));
    }
    let result = env.next_var();
    subqueries.push(Clause::Call(vec![
        Clause::With(Projection::variables(&[scope.node])),
        Clause::Match {
            optional: false,
            pattern,
            where_: None,
        },
        Clause::Return(Projection::item(
            Expr::and_all(parts).unwrap_or_else(|| Expr::boolean(true)),
            &result,
        )),
    ]));
    Ok(Expr::eq(Expr::var(result), Expr::boolean(true)))
}

fn aggregation_expr(env: &mut CypherEnv<'_>, node: &str, edge: &str, predicate: &AggregationPredicate) -> Expr {
    match predicate {
        AggregationPredicate::Count { comparator, value } => compare_aggregate(
            env,
            Expr::function("count", vec![Expr::var(node)]),
            *comparator,
            value,
        ),
        AggregationPredicate::Property {
            owner,
            property,
            function,
            comparator,
            value,
        } => {
            let variable = match owner {
                PropertyOwner::Node => node,
                PropertyOwner::Edge => edge,
            };
            let property = Expr::property(variable, property);
            let aggregated = match function {
                AggregationFunction::Min => Expr::function("min", vec![property]),
                AggregationFunction::Max => Expr::function("max", vec![property]),
                AggregationFunction::Average => Expr::function("avg", vec![property]),
                AggregationFunction::Sum => Expr::function("sum", vec![property]),
                AggregationFunction::ShortestLength => {
                    Expr::function("min", vec![Expr::function("size", vec![property])])
                }
                AggregationFunction::LongestLength => {
                    Expr::function("max", vec![Expr::function("size", vec![property])])
                }
                AggregationFunction::AverageLength => {
                    Expr::function("avg", vec![Expr::function("size", vec![property])])
                }
            };
            compare_aggregate(env, aggregated, *comparator, value)
        }
        AggregationPredicate::Logical { operator, children } => {
            let parts: Vec<Expr> = children
                .iter()
                .map(|child| aggregation_expr(env, node, edge, child))
                .collect();
            match operator {
                LogicalOperator::And => Expr::and_all(parts).unwrap_or_else(|| Expr::boolean(true)),
                LogicalOperator::Or => Expr::or_all(parts).unwrap_or_else(|| Expr::boolean(false)),
                LogicalOperator::Not => Expr::not(Expr::and_all(parts).unwrap_or_else(|| Expr::boolean(true))),
            }
        }
    }
}

fn compare_aggregate(
    env: &mut CypherEnv<'_>,
    aggregated: Expr,
    comparator: AggregationComparator,
    value: &FilterValue,
) -> Expr {
    let operator = match comparator {
        AggregationComparator::Eq => FilterOperator::Eq,
        AggregationComparator::Gt => FilterOperator::Gt,
        AggregationComparator::Gte => FilterOperator::Gte,
        AggregationComparator::Lt => FilterOperator::Lt,
        AggregationComparator::Lte => FilterOperator::Lte,
    };
    compare(env, aggregated, None, operator, value)
}

/// `CALL { WITH node CALL { WITH node WITH node AS this <statement> } WITH column AS var ...`
/// shared by filters, sorts and projections of `@cypher` fields.
pub fn cypher_statement_call(node: &str, statement: &str, column: &str, alias: &str) -> Vec<Clause> {
    vec![
        Clause::With(Projection::variables(&[node])),
        Clause::Call(vec![
            Clause::With(Projection::variables(&[node])),
            Clause::With(Projection::item(Expr::var(node), "this")),
            Clause::Statement(statement.to_string()),
        ]),
        Clause::With(Projection::item(Expr::var(super::ast::escape_name(column)), alias)),
    ]
}

fn cypher_field_predicate(
    env: &mut CypherEnv<'_>,
    scope: Scope<'_>,
    filter: &CypherFieldFilter,
    subqueries: &mut Vec<Clause>,
) -> Result<Expr> {
    let column = env.next_this();
    let result = env.next_var();
    let mut body = cypher_statement_call(scope.node, &filter.statement, &filter.column_name, &column);

    match &filter.comparison {
        CypherFieldComparison::Scalar { scalar, operator, value } => {
            let collected = Expr::function("collect", vec![Expr::var(column.as_str())]);
            let returned = if filter.is_list {
                collected
            } else {
                Expr::function("head", vec![collected])
            };
            body.push(Clause::Return(Projection::item(returned, &result)));
            subqueries.push(Clause::Call(body));
            let scalar = if filter.is_list { None } else { *scalar };
            Ok(compare(env, Expr::var(result), scalar, *operator, value))
        }
        CypherFieldComparison::Entity { filters, .. } => {
            let mut inner_subqueries = Vec::new();
            let inner = filters_predicate(env, Scope::node(&column), filters, &mut inner_subqueries)?;
            body.extend(inner_subqueries);
            if inner.is_some() {
                body.push(Clause::With(Projection::star().with_where(inner)));
            }
            body.push(Clause::Return(Projection::item(
                Expr::binary(
                    Expr::function("count", vec![Expr::var(column.as_str())]),
                    BinaryOperator::Gt,
                    Expr::Literal(json!(0)),
                ),
                &result,
            )));
            subqueries.push(Clause::Call(body));
            Ok(Expr::eq(Expr::var(result), Expr::boolean(true)))
        }
    }
}
