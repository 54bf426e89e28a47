//! Creates, updates and deletes, including the batch create path.

#[cfg(test)]
mod mutation_tests {
    use neographql::config::TranslatorConfig;
    use neographql::query_ast::TranslationContext;
    use neographql::MutationCounters;
    use serde_json::{json, Value};

    use super::super::{translate, translate_with, MOVIES_SCHEMA};

    fn three_movies() -> Value {
        json!({
            "name": "createMovies",
            "args": { "input": [
                { "title": "Heat", "released": 1995 },
                { "title": "Ronin", "actors": { "create": [{ "node": { "name": "Robert" }, "edge": { "screenTime": 40 } }] } },
                { "title": "Collateral" }
            ] },
            "fields": [
                { "name": "info", "fields": [{ "name": "nodesCreated" }] },
                { "name": "movies", "fields": [{ "name": "title" }, { "name": "id" }] }
            ]
        })
    }

    #[test]
    fn test_batch_create_emits_one_unwind() {
        let query = translate(MOVIES_SCHEMA, three_movies());
        assert!(query.cypher.starts_with("UNWIND $param0 AS var1\nCALL {\n"));
        assert_eq!(query.cypher.matches("CREATE (this2:Movie)").count(), 1);
        assert!(query.cypher.contains("this2.id = randomUUID()"));
        assert!(query.cypher.contains("this2.createdAt = datetime()"));
        assert!(query.cypher.contains("UNWIND var1.actors.create AS var3"));
        assert!(query.cypher.contains("screenTime = var3.edge.screenTime"));
        assert!(query.cypher.ends_with("RETURN collect(this2 { .title, .id }) AS data"));

        let rows = query.params["param0"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1]["actors"]["create"][0]["node"]["name"], json!("Robert"));
        // generated values never travel as input
        assert!(rows.iter().all(|row| row.get("id").is_none()));
    }

    #[test]
    fn test_per_row_create_when_batching_is_off() {
        let context = TranslationContext::new(TranslatorConfig {
            unwind_create_enabled: false,
            ..TranslatorConfig::default()
        });
        let query = translate_with(MOVIES_SCHEMA, three_movies(), &context).unwrap();
        assert!(!query.cypher.contains("UNWIND $"));
        // three movies, one actor and its relationship
        assert_eq!(query.cypher.matches("CREATE (this").count(), 5);
        assert!(query.cypher.contains("RETURN count(*) AS var"));
        assert!(query.cypher.ends_with("}] AS data"));
        assert!(query.cypher.contains("\nRETURN [this0 { .title, .id }, "));
    }

    #[test]
    fn test_connect_forces_per_row_create() {
        let query = translate(
            MOVIES_SCHEMA,
            json!({
                "name": "createMovies",
                "args": { "input": [
                    { "title": "Heat", "genres": { "connect": [{ "where": { "node": { "name": "Crime" } } }] } },
                    { "title": "Ronin" }
                ] },
                "fields": [{ "name": "movies", "fields": [{ "name": "title" }] }]
            }),
        );
        assert!(query.cypher.starts_with("CALL {\n    CREATE (this0:Movie)"));
        assert!(query.cypher.contains("MATCH (this"));
        assert!(query.cypher.contains(":Genre)\n        WHERE this"));
        assert!(query.cypher.contains("-[this"));
        assert!(query.cypher.contains(":IN_GENRE]->("));
    }

    #[test]
    fn test_update_with_list_operators() {
        let query = translate(
            MOVIES_SCHEMA,
            json!({
                "name": "updateMovies",
                "args": {
                    "where": { "id": "m1" },
                    "update": { "views_INCREMENT": 1, "rating_SUBTRACT": 0.5 }
                },
                "fields": [{ "name": "movies", "fields": [{ "name": "views" }] }]
            }),
        );
        assert_eq!(
            query.cypher,
            "MATCH (this:Movie)\n\
             WHERE this.id = $param0\n\
             SET\n    this.views = this.views + $param1,\n    this.rating = this.rating - $param2\n\
             WITH *\n\
             RETURN collect(DISTINCT this { views: coalesce(this.views, 0) }) AS data"
        );
    }

    #[test]
    fn test_update_checks_touched_singular_relationship() {
        let query = translate(
            MOVIES_SCHEMA,
            json!({
                "name": "updateMovies",
                "args": { "update": { "director": { "connect": { "where": { "node": { "name": "Mann" } } } } } },
                "fields": []
            }),
        );
        assert!(query.cypher.contains("MATCH (this"));
        assert!(query.cypher.contains(":Person:Director)"));
        assert!(query.cypher.contains("Movie.director must be less than or equal to one"));
    }

    #[test]
    fn test_delete_detaches_root() {
        let query = translate(
            MOVIES_SCHEMA,
            json!({ "name": "deleteMovies", "args": { "where": { "title": "Heat" } }, "fields": [] }),
        );
        assert_eq!(query.cypher, "MATCH (this:Movie)\nWHERE this.title = $param0\nDETACH DELETE this");
    }

    #[test]
    fn test_counters_from_driver_statistics() {
        let statistics = json!({ "nodesCreated": 4, "relationshipsCreated": 1, "propertiesSet": 9 });
        let counters = MutationCounters::from_statistics(statistics.as_object().unwrap());
        assert_eq!(
            counters,
            MutationCounters {
                nodes_created: 4,
                nodes_deleted: 0,
                relationships_created: 1,
                relationships_deleted: 0,
            }
        );
    }
}
