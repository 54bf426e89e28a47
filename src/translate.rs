//! Entry points: request in, statement out, plus the pieces of a response
//! that can only be filled in once the rows are back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::authorization;
use crate::cypher_generator::environment::TOTAL_COUNT_KEY;
use crate::cypher_generator::{generate_cypher, ConnectionWindow, CypherQuery};
use crate::query_ast::{QueryAstFactory, ResolveTree, TranslationContext, TranslationError};
use crate::schema_model::Neo4jGraphQLSchemaModel;
use crate::utils::cursor::offset_to_cursor;

/// Translate one root field of a GraphQL request.
///
/// Builds the operation tree, weaves in the authorization rules and emits
/// the statement. Nothing is shared between calls, so concurrent requests
/// may translate against the same model.
pub fn translate(
    model: &Neo4jGraphQLSchemaModel,
    tree: &ResolveTree,
    context: &TranslationContext,
) -> Result<CypherQuery, TranslationError> {
    let mut operation = QueryAstFactory::new(model, context).create_query_ast(tree)?;
    authorization::weave(model, context, &mut operation)?;
    let query = generate_cypher(model, context, &operation)?;
    log::debug!(
        "translated `{}` into {} bytes of Cypher with {} parameter(s)",
        tree.name,
        query.cypher.len(),
        query.params.len()
    );
    Ok(query)
}

/// Add cursors and `pageInfo` to the connections inside one returned value
/// (the `this` or `data` column). Window paths are relative to that value;
/// lists met on the way are walked element by element.
pub fn finalize_connection(value: &mut Value, windows: &[ConnectionWindow]) {
    for window in windows {
        visit(value, &window.path, &mut |connection| finish(connection, window));
    }
}

fn visit(value: &mut Value, path: &[String], apply: &mut dyn FnMut(&mut Map<String, Value>)) {
    match value {
        Value::Array(items) => {
            for item in items {
                visit(item, path, apply);
            }
        }
        Value::Object(map) => match path.split_first() {
            None => apply(map),
            Some((key, rest)) => {
                if let Some(child) = map.get_mut(key) {
                    visit(child, rest, apply);
                }
            }
        },
        _ => {}
    }
}

fn finish(connection: &mut Map<String, Value>, window: &ConnectionWindow) {
    let total_key = window.total_count.as_deref().unwrap_or(TOTAL_COUNT_KEY);
    let total = connection.get(total_key).and_then(Value::as_u64).unwrap_or(0) as usize;
    let remaining = total.saturating_sub(window.offset);

    let mut returned = window.first.map_or(remaining, |first| first.min(remaining));
    if let Some(edges_key) = &window.edges {
        if let Some(Value::Array(edges)) = connection.get_mut(edges_key) {
            returned = edges.len();
            if let Some(cursor_key) = &window.cursor {
                for (index, edge) in edges.iter_mut().enumerate() {
                    if let Value::Object(edge) = edge {
                        edge.insert(
                            cursor_key.clone(),
                            Value::String(offset_to_cursor(window.offset.saturating_add(index))),
                        );
                    }
                }
            }
        }
    }

    if let Some(page_info_key) = &window.page_info {
        let (start, end) = if returned == 0 {
            (Value::Null, Value::Null)
        } else {
            (
                Value::String(offset_to_cursor(window.offset)),
                Value::String(offset_to_cursor(window.offset.saturating_add(returned - 1))),
            )
        };
        let page_info = PageInfo {
            has_next_page: window.offset.saturating_add(returned) < total,
            has_previous_page: window.offset > 0,
            start_cursor: start,
            end_cursor: end,
        };
        connection.insert(
            page_info_key.clone(),
            serde_json::to_value(page_info).unwrap_or(Value::Null),
        );
    }

    if window.total_count.is_none() {
        connection.remove(TOTAL_COUNT_KEY);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    has_previous_page: bool,
    start_cursor: Value,
    end_cursor: Value,
}

/// The `info` of a mutation response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationCounters {
    pub nodes_created: u64,
    pub nodes_deleted: u64,
    pub relationships_created: u64,
    pub relationships_deleted: u64,
}

impl MutationCounters {
    /// Read the driver's update statistics; both `nodesCreated` and
    /// `nodes_created` spellings are accepted.
    pub fn from_statistics(statistics: &Map<String, Value>) -> Self {
        let counter = |camel: &str, snake: &str| {
            statistics
                .get(camel)
                .or_else(|| statistics.get(snake))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        };
        MutationCounters {
            nodes_created: counter("nodesCreated", "nodes_created"),
            nodes_deleted: counter("nodesDeleted", "nodes_deleted"),
            relationships_created: counter("relationshipsCreated", "relationships_created"),
            relationships_deleted: counter("relationshipsDeleted", "relationships_deleted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::schema_model::testing::movies_model;
    use serde_json::json;

    fn window(path: &[&str]) -> ConnectionWindow {
        ConnectionWindow {
            path: path.iter().map(|p| p.to_string()).collect(),
            offset: 2,
            first: Some(2),
            edges: Some("edges".to_string()),
            cursor: Some("cursor".to_string()),
            total_count: None,
            page_info: Some("pageInfo".to_string()),
        }
    }

    #[test]
    fn test_translate_root_read() {
        let model = movies_model();
        let context = TranslationContext::new(TranslatorConfig::default());
        let tree: ResolveTree = serde_json::from_value(json!({
            "name": "movies",
            "fields": [{ "name": "title" }]
        }))
        .unwrap();
        let query = translate(&model, &tree, &context).unwrap();
        assert_eq!(query.cypher, "MATCH (this:Movie)\nRETURN this { .title } AS this");
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let model = movies_model();
        let context = TranslationContext::new(TranslatorConfig::default());
        let tree: ResolveTree = serde_json::from_value(json!({
            "name": "movies",
            "fields": [{ "name": "budget" }]
        }))
        .unwrap();
        assert_eq!(
            translate(&model, &tree, &context).unwrap_err(),
            TranslationError::unknown_field_with_context("Movie", "budget")
        );
    }

    #[test]
    fn test_finalize_root_connection() {
        let mut value = json!({
            "edges": [{ "node": { "title": "A" } }, { "node": { "title": "B" } }],
            "totalCount": 5
        });
        finalize_connection(&mut value, &[window(&[])]);
        assert_eq!(
            value,
            json!({
                "edges": [
                    { "node": { "title": "A" }, "cursor": offset_to_cursor(2) },
                    { "node": { "title": "B" }, "cursor": offset_to_cursor(3) }
                ],
                "pageInfo": {
                    "hasNextPage": true,
                    "hasPreviousPage": true,
                    "startCursor": offset_to_cursor(2),
                    "endCursor": offset_to_cursor(3)
                }
            })
        );
    }

    #[test]
    fn test_finalize_walks_lists() {
        let mut value = json!([
            { "actorsConnection": { "edges": [], "totalCount": 0 } },
            { "actorsConnection": { "edges": [{ "node": {} }], "totalCount": 3 } }
        ]);
        finalize_connection(&mut value, &[window(&["actorsConnection"])]);
        assert_eq!(value[0]["actorsConnection"]["pageInfo"]["startCursor"], Value::Null);
        assert_eq!(value[0]["actorsConnection"]["pageInfo"]["hasNextPage"], json!(false));
        assert_eq!(value[1]["actorsConnection"]["edges"][0]["cursor"], json!(offset_to_cursor(2)));
        assert_eq!(value[1]["actorsConnection"]["pageInfo"]["hasNextPage"], json!(false));
    }

    #[test]
    fn test_page_info_without_edges_uses_the_window() {
        let mut value = json!({ "totalCount": 10 });
        let mut window = window(&[]);
        window.edges = None;
        window.total_count = Some("totalCount".to_string());
        finalize_connection(&mut value, &[window]);
        assert_eq!(value["pageInfo"]["hasNextPage"], json!(true));
        assert_eq!(value["pageInfo"]["endCursor"], json!(offset_to_cursor(3)));
        assert_eq!(value["totalCount"], json!(10));
    }

    #[test]
    fn test_finalize_near_the_end_of_the_offset_range() {
        let mut value = json!({ "edges": [{ "node": {} }, { "node": {} }], "totalCount": 1 });
        let mut window = window(&[]);
        window.offset = usize::MAX - 1;
        finalize_connection(&mut value, &[window]);
        assert_eq!(value["edges"][1]["cursor"], json!(offset_to_cursor(usize::MAX)));
        assert_eq!(value["pageInfo"]["endCursor"], json!(offset_to_cursor(usize::MAX)));
        assert_eq!(value["pageInfo"]["hasNextPage"], json!(false));
    }

    #[test]
    fn test_mutation_counters() {
        let statistics = json!({ "nodesCreated": 3, "relationships_created": 2 });
        let counters = MutationCounters::from_statistics(statistics.as_object().unwrap());
        assert_eq!(counters.nodes_created, 3);
        assert_eq!(counters.relationships_created, 2);
        assert_eq!(counters.nodes_deleted, 0);
        assert_eq!(
            serde_json::to_value(&counters).unwrap(),
            json!({ "nodesCreated": 3, "nodesDeleted": 0, "relationshipsCreated": 2, "relationshipsDeleted": 0 })
        );
    }
}
