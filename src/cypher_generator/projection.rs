//! Map projection of selected fields.

use serde_json::json;

use super::aggregate::nested_aggregate;
use super::ast::{Clause, Expr, ProjectionItem};
use super::connection::nested_connection;
use super::environment::CypherEnv;
use super::errors::CypherGeneratorError;
use super::read::{nested_composite_read, nested_cypher_field, nested_read};
use crate::query_ast::{AttributeField, Field};
use crate::schema_model::ScalarType;

pub(crate) fn has_key(items: &[ProjectionItem], key: &str) -> bool {
    items.iter().any(|item| match item {
        ProjectionItem::Shorthand(k) | ProjectionItem::Entry(k, _) => k == key,
    })
}

/// DateTime values are returned as ISO strings with an offset.
fn format_datetime(value: Expr) -> Expr {
    Expr::function(
        "apoc.date.convertFormat",
        vec![
            Expr::function("toString", vec![value]),
            Expr::Literal(json!("iso_zoned_date_time")),
            Expr::Literal(json!("iso_offset_date_time")),
        ],
    )
}

pub(crate) fn attribute_item(node: &str, field: &AttributeField) -> ProjectionItem {
    let is_datetime = field.scalar == Some(ScalarType::DateTime);
    if field.alias == field.property && field.coalesce.is_none() && !is_datetime {
        return ProjectionItem::Shorthand(field.alias.clone());
    }
    let mut value = Expr::property(node, &field.property);
    if let Some(coalesce) = &field.coalesce {
        value = Expr::function("coalesce", vec![value, Expr::Literal(coalesce.clone())]);
    }
    if is_datetime {
        value = if field.is_list {
            Expr::ListComprehension {
                variable: "item".to_string(),
                list: Box::new(value),
                filter: None,
                map: Some(Box::new(format_datetime(Expr::var("item")))),
            }
        } else {
            format_datetime(value)
        };
    }
    ProjectionItem::Entry(field.alias.clone(), value)
}

/// Projection items of `fields` on `node`, and the subqueries computing
/// the nested ones, in selection order.
pub(crate) fn projection(
    env: &mut CypherEnv<'_>,
    node: &str,
    fields: &[Field],
) -> Result<(Vec<Clause>, Vec<ProjectionItem>), CypherGeneratorError> {
    let mut subqueries = Vec::new();
    let mut items = Vec::with_capacity(fields.len());
    for field in fields {
        env.enter(field.alias());
        let item = match field {
            Field::Attribute(attribute) => attribute_item(node, attribute),
            Field::Typename { alias, type_name } => {
                ProjectionItem::Entry(alias.clone(), Expr::Literal(json!(type_name)))
            }
            Field::Read(read) => {
                let (call, variable) = nested_read(env, node, read)?;
                subqueries.push(call);
                ProjectionItem::Entry(read.alias.clone(), Expr::var(variable))
            }
            Field::CompositeRead(read) => {
                let (call, variable) = nested_composite_read(env, node, read)?;
                subqueries.push(call);
                ProjectionItem::Entry(read.alias.clone(), Expr::var(variable))
            }
            Field::Connection(connection) => {
                let (call, variable) = nested_connection(env, node, connection)?;
                subqueries.push(call);
                ProjectionItem::Entry(connection.alias.clone(), Expr::var(variable))
            }
            Field::Aggregate(aggregate) => {
                let (calls, value) = nested_aggregate(env, node, aggregate)?;
                subqueries.extend(calls);
                ProjectionItem::Entry(aggregate.alias.clone(), value)
            }
            Field::Cypher(cypher) => {
                let (call, variable) = nested_cypher_field(env, node, cypher)?;
                subqueries.push(call);
                ProjectionItem::Entry(cypher.alias.clone(), Expr::var(variable))
            }
        };
        env.leave();
        items.push(item);
    }
    Ok((subqueries, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher_generator::ast::ToCypher;

    fn field(alias: &str, property: &str) -> AttributeField {
        AttributeField {
            alias: alias.to_string(),
            field: property.to_string(),
            property: property.to_string(),
            scalar: Some(ScalarType::String),
            is_list: false,
            coalesce: None,
        }
    }

    #[test]
    fn test_aliases_use_entries() {
        let items = vec![
            attribute_item("this", &field("title", "title")),
            attribute_item("this", &field("name", "title")),
        ];
        assert!(has_key(&items, "name"));
        assert_eq!(
            Expr::MapProjection("this".to_string(), items).to_cypher(),
            "this { .title, name: this.title }"
        );
    }

    #[test]
    fn test_datetime_lists_are_formatted_per_item() {
        let mut dates = field("dates", "dates");
        dates.scalar = Some(ScalarType::DateTime);
        dates.is_list = true;
        match attribute_item("this", &dates) {
            ProjectionItem::Entry(key, value) => {
                assert_eq!(key, "dates");
                assert!(value.to_cypher().starts_with("[item IN this.dates | apoc.date.convertFormat("));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
