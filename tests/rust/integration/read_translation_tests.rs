//! Reads, connections and aggregates against the movies fixture.

#[cfg(test)]
mod read_tests {
    use neographql::finalize_connection;
    use neographql::query_ast::TranslationError;
    use serde_json::json;
    use test_case::test_case;

    use super::super::{translate, translate_with, MOVIES_SCHEMA};
    use neographql::config::TranslatorConfig;
    use neographql::query_ast::TranslationContext;

    #[test]
    fn test_filtered_sorted_read() {
        let query = translate(
            MOVIES_SCHEMA,
            json!({
                "name": "movies",
                "args": { "where": { "title": "Heat" }, "sort": [{ "title": "DESC" }], "limit": 10 },
                "fields": [{ "name": "title" }, { "name": "tagline" }]
            }),
        );
        assert_eq!(
            query.cypher,
            "MATCH (this:Movie)\nWHERE this.title = $param0\nWITH *\nORDER BY this.title DESC\nLIMIT $param1\nRETURN this { .title, tagline: this.tag_line } AS this"
        );
        assert_eq!(query.params.get("param0"), Some(&json!("Heat")));
        assert_eq!(query.params.get("param1"), Some(&json!(10)));
    }

    #[test_case("title_CONTAINS", json!("ea"), "this.title CONTAINS $param0" ; "contains")]
    #[test_case("title_STARTS_WITH", json!("He"), "this.title STARTS WITH $param0" ; "starts with")]
    #[test_case("title_ENDS_WITH", json!("at"), "this.title ENDS WITH $param0" ; "ends with")]
    #[test_case("title_IN", json!(["Heat", "Ronin"]), "this.title IN $param0" ; "in list")]
    #[test_case("released_GTE", json!(1995), "this.released >= $param0" ; "greater or equal")]
    #[test_case("released_LT", json!(2000), "this.released < $param0" ; "less than")]
    fn test_where_operators(key: &str, value: serde_json::Value, predicate: &str) {
        let query = translate(
            MOVIES_SCHEMA,
            json!({ "name": "movies", "args": { "where": { key: value.clone() } }, "fields": [{ "name": "title" }] }),
        );
        assert!(query.cypher.contains(&format!("WHERE {}", predicate)), "{}", query.cypher);
        assert_eq!(query.params.get("param0"), Some(&value));
    }

    #[test]
    fn test_null_equality_is_null_check() {
        let query = translate(
            MOVIES_SCHEMA,
            json!({ "name": "movies", "args": { "where": { "released_EQ": null } }, "fields": [{ "name": "title" }] }),
        );
        assert!(query.cypher.contains("WHERE this.released IS NULL"));
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_aggregate_where_runs_in_a_subquery() {
        let query = translate(
            MOVIES_SCHEMA,
            json!({
                "name": "movies",
                "args": { "where": { "actorsAggregate": { "count_GT": 1 } } },
                "fields": [{ "name": "title" }]
            }),
        );
        assert!(query.cypher.starts_with("MATCH (this:Movie)\nCALL {\n    WITH this\n    MATCH (this)<-[this"));
        assert!(query.cypher.contains("count(this"));
        assert!(query.cypher.contains("= true"));
        assert_eq!(query.params.values().next(), Some(&json!(1)));
    }

    #[test_case(json!({ "node": { "born_AVERAGE_GT": 1960 } }), "avg(this1.born) > $param2" ; "average greater")]
    #[test_case(json!({ "node": { "born_AVERAGE_GTE": 1960 } }), "avg(this1.born) >= $param2" ; "average greater or equal")]
    #[test_case(json!({ "node": { "born_AVERAGE_LT": 1960 } }), "avg(this1.born) < $param2" ; "average less")]
    #[test_case(json!({ "node": { "born_AVERAGE_LTE": 1960 } }), "avg(this1.born) <= $param2" ; "average less or equal")]
    #[test_case(json!({ "node": { "born_AVERAGE_EQ": 1960 } }), "avg(this1.born) = $param2" ; "average equal")]
    #[test_case(json!({ "count_GTE": 1960 }), "count(this1) >= $param2" ; "count greater or equal")]
    fn test_aggregate_comparators_at_the_boundary(aggregate: serde_json::Value, comparison: &str) {
        let query = translate(
            MOVIES_SCHEMA,
            json!({
                "name": "movies",
                "args": { "where": { "actorsAggregate": aggregate } },
                "fields": [{ "name": "title" }]
            }),
        );
        assert!(query.cypher.contains(comparison), "{}", query.cypher);
        assert_eq!(query.params.get("param2"), Some(&json!(1960)));
    }

    #[test]
    fn test_interface_read_unions_implementations() {
        let query = translate(
            MOVIES_SCHEMA,
            json!({ "name": "productions", "fields": [{ "name": "title" }, { "name": "__typename" }] }),
        );
        assert!(query.cypher.starts_with("CALL {\n"));
        assert!(query.cypher.contains("MATCH (this0:Movie)"));
        assert!(query.cypher.contains("\n    UNION\n"));
        assert!(query.cypher.contains(":Series)"));
    }

    #[test]
    fn test_connection_window_and_finalize() {
        let query = translate(
            MOVIES_SCHEMA,
            json!({
                "name": "moviesConnection",
                "args": { "first": 1, "sort": [{ "title": "ASC" }] },
                "fields": [
                    { "name": "edges", "fields": [{ "name": "cursor" }, { "name": "node", "fields": [{ "name": "title" }] }] },
                    { "name": "pageInfo", "fields": [{ "name": "hasNextPage" }, { "name": "endCursor" }] }
                ]
            }),
        );
        assert_eq!(query.connection_windows.len(), 1);
        let mut row = json!({ "edges": [{ "node": { "title": "Heat" } }], "totalCount": 2 });
        finalize_connection(&mut row, &query.connection_windows);
        assert_eq!(row["edges"][0]["cursor"], json!("YXJyYXljb25uZWN0aW9uOjA="));
        assert_eq!(row["pageInfo"]["hasNextPage"], json!(true));
        assert_eq!(row["pageInfo"]["hasPreviousPage"], json!(false));
        assert!(row.get("totalCount").is_none());
    }

    #[test]
    fn test_after_needs_sort() {
        let err = translate_with(
            MOVIES_SCHEMA,
            json!({
                "name": "moviesConnection",
                "args": { "first": 1, "after": "YXJyYXljb25uZWN0aW9uOjA=" },
                "fields": [{ "name": "totalCount" }]
            }),
            &TranslationContext::new(TranslatorConfig::default()),
        )
        .unwrap_err();
        assert!(matches!(err, TranslationError::InvalidArgument { ref argument, .. } if argument == "after"));
    }

    #[test]
    fn test_unknown_root_field() {
        let err = translate_with(
            MOVIES_SCHEMA,
            json!({ "name": "films", "fields": [] }),
            &TranslationContext::new(TranslatorConfig::default()),
        )
        .unwrap_err();
        assert_eq!(err, TranslationError::UnknownRootField("films".to_string()));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let request = json!({
            "name": "movies",
            "args": { "where": { "OR": [{ "title": "Heat" }, { "actors_SOME": { "name": "Al" } }] } },
            "fields": [
                { "name": "title" },
                { "name": "actors", "args": { "limit": 2 }, "fields": [{ "name": "name" }] },
                { "name": "actorsAggregate", "fields": [{ "name": "count" }] }
            ]
        });
        let first = translate(MOVIES_SCHEMA, request.clone());
        let second = translate(MOVIES_SCHEMA, request);
        assert_eq!(first, second);
    }
}
