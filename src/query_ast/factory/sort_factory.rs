use serde_json::{Map, Value};

use crate::query_ast::errors::TranslationError;
use crate::query_ast::filters::PropertyOwner;
use crate::query_ast::resolve_tree::ResolveTree;
use crate::query_ast::sort::{CypherSortSource, Pagination, SortDirection, SortField};
use crate::schema_model::adapters::AttributeAdapter;
use crate::utils::cursor::cursor_to_offset;

fn direction(key: &str, value: &Value) -> Result<SortDirection, TranslationError> {
    match value.as_str() {
        Some("ASC") => Ok(SortDirection::Asc),
        Some("DESC") => Ok(SortDirection::Desc),
        _ => Err(TranslationError::invalid_argument_with_context(
            key,
            "sort direction must be ASC or DESC",
        )),
    }
}

fn non_negative(argument: &str, value: &Value) -> Result<usize, TranslationError> {
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| TranslationError::invalid_argument_with_context(argument, "expected a non-negative integer"))
}

/// `sort: [{ title: DESC }, { released: ASC }]` on one owner.
///
/// `lookup` resolves a field name to its attribute; unknown or unsortable
/// fields are rejected.
pub fn sort_fields<'a, F>(
    owner: PropertyOwner,
    type_name: &str,
    sort: &Value,
    lookup: F,
) -> Result<Vec<SortField>, TranslationError>
where
    F: Fn(&str) -> Option<AttributeAdapter<'a>>,
{
    let items: Vec<&Map<String, Value>> = match sort {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(map) => vec![map],
        Value::Null => Vec::new(),
        _ => {
            return Err(TranslationError::invalid_argument_with_context(
                "sort",
                "expected a list of sort inputs",
            ))
        }
    };

    let mut fields = Vec::new();
    for item in items {
        for (key, value) in item {
            let attribute = lookup(key)
                .ok_or_else(|| TranslationError::unknown_field_with_context(type_name, key.as_str()))?;
            if !attribute.is_sortable() {
                return Err(TranslationError::invalid_argument_with_context(
                    key.as_str(),
                    "field cannot be sorted on",
                ));
            }
            let cypher = attribute
                .attribute
                .annotations
                .cypher
                .as_ref()
                .map(|c| CypherSortSource {
                    statement: c.statement.clone(),
                    column_name: c.column_name.clone(),
                });
            fields.push(SortField {
                owner,
                field: attribute.name().to_string(),
                property: attribute.database_name().to_string(),
                direction: direction(key, value)?,
                cypher,
            });
        }
    }
    Ok(fields)
}

/// The `sort` value of a field, also accepted inside `options`.
pub fn sort_argument(tree: &ResolveTree) -> Option<&Value> {
    tree.arg("sort")
        .or_else(|| tree.arg("options").and_then(|o| o.get("sort")))
        .filter(|v| !v.is_null())
}

/// `limit`/`offset`, directly or inside `options`.
pub fn pagination(tree: &ResolveTree) -> Result<Pagination, TranslationError> {
    let options = tree.arg("options").and_then(Value::as_object);
    let pick = |name: &str| {
        tree.arg(name)
            .or_else(|| options.and_then(|o| o.get(name)).filter(|v| !v.is_null()))
    };
    Ok(Pagination {
        offset: pick("offset").map(|v| non_negative("offset", v)).transpose()?,
        limit: pick("limit").map(|v| non_negative("limit", v)).transpose()?,
    })
}

/// `first`/`after` of a connection. Cursors encode the ordinal of the last
/// returned edge, so the window starts one past it; a stable order is
/// required for that ordinal to mean anything.
pub fn connection_pagination(tree: &ResolveTree, has_sort: bool) -> Result<Pagination, TranslationError> {
    let offset = match tree.arg("after") {
        None => None,
        Some(after) => {
            if !has_sort {
                return Err(TranslationError::invalid_argument_with_context(
                    "after",
                    "cursor pagination requires `sort`",
                ));
            }
            let cursor = after
                .as_str()
                .and_then(cursor_to_offset)
                .and_then(|offset| offset.checked_add(1))
                .ok_or_else(|| TranslationError::invalid_argument_with_context("after", "invalid cursor"))?;
            Some(cursor)
        }
    };
    Ok(Pagination {
        offset,
        limit: tree.arg("first").map(|v| non_negative("first", v)).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_model::testing::movies_model;
    use crate::schema_model::ConcreteEntityAdapter;
    use crate::utils::cursor::offset_to_cursor;
    use serde_json::json;

    fn tree(args: Value) -> ResolveTree {
        ResolveTree {
            args: args.as_object().unwrap().clone(),
            ..ResolveTree::new("movies")
        }
    }

    #[test]
    fn test_sort_resolves_alias_and_direction() {
        let model = movies_model();
        let movie = ConcreteEntityAdapter::new(&model, model.concrete_entity_by_name("Movie").unwrap().id);
        let fields = sort_fields(
            PropertyOwner::Node,
            "Movie",
            &json!([{ "tagline": "DESC" }, { "released": "ASC" }]),
            |name| movie.attribute(name),
        )
        .unwrap();
        assert_eq!(fields[0].property, "tag_line");
        assert_eq!(fields[0].direction, SortDirection::Desc);
        assert_eq!(fields[1].field, "released");
    }

    #[test]
    fn test_sort_rejects_unknown_field() {
        let model = movies_model();
        let movie = ConcreteEntityAdapter::new(&model, model.concrete_entity_by_name("Movie").unwrap().id);
        let err = sort_fields(PropertyOwner::Node, "Movie", &json!([{ "budget": "ASC" }]), |name| {
            movie.attribute(name)
        })
        .unwrap_err();
        assert_eq!(err, TranslationError::unknown_field_with_context("Movie", "budget"));
    }

    #[test]
    fn test_pagination_from_options() {
        let paging = pagination(&tree(json!({ "options": { "limit": 5, "offset": 10 } }))).unwrap();
        assert_eq!(paging, Pagination { offset: Some(10), limit: Some(5) });
        assert!(pagination(&tree(json!({ "limit": -1 }))).is_err());
    }

    #[test]
    fn test_after_requires_sort() {
        let request = tree(json!({ "first": 2, "after": offset_to_cursor(3) }));
        assert!(matches!(
            connection_pagination(&request, false),
            Err(TranslationError::InvalidArgument { .. })
        ));
        assert_eq!(
            connection_pagination(&request, true).unwrap(),
            Pagination { offset: Some(4), limit: Some(2) }
        );
    }

    #[test]
    fn test_after_at_the_last_offset_is_rejected() {
        let request = tree(json!({ "first": 1, "after": offset_to_cursor(usize::MAX) }));
        assert_eq!(
            connection_pagination(&request, true).unwrap_err(),
            TranslationError::invalid_argument_with_context("after", "invalid cursor")
        );
        let garbage = tree(json!({ "after": "not a cursor" }));
        assert!(matches!(
            connection_pagination(&garbage, true),
            Err(TranslationError::InvalidArgument { .. })
        ));
    }
}
