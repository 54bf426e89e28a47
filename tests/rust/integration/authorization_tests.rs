//! `@authorization` rules end to end against the auth fixture.

#[cfg(test)]
mod authorization_tests {
    use neographql::authorization::AuthorizationError;
    use neographql::config::TranslatorConfig;
    use neographql::query_ast::TranslationContext;
    use serde_json::{json, Map, Value};

    use super::super::{translate_with, AUTH_SCHEMA};

    fn claims(sub: &str) -> Map<String, Value> {
        match json!({ "sub": sub, "roles": ["user"] }) {
            Value::Object(claims) => claims,
            _ => unreachable!(),
        }
    }

    fn signed_in() -> TranslationContext {
        TranslationContext::new(TranslatorConfig::default()).with_jwt(claims("u1"))
    }

    #[test]
    fn test_read_validation_runs_per_row() {
        let query = translate_with(
            AUTH_SCHEMA,
            json!({ "name": "users", "fields": [{ "name": "name" }] }),
            &signed_in(),
        )
        .unwrap();
        assert!(query
            .cypher
            .starts_with("MATCH (this:User)\nWITH *\nWHERE apoc.util.validatePredicate(NOT ("));
        assert!(query.cypher.contains("$isAuthenticated = true"));
        assert!(query.cypher.contains("$jwt.sub IS NOT NULL"));
        assert!(query.cypher.contains("\"@neo4j/graphql/FORBIDDEN\", [0])"));
        assert_eq!(query.params.get("jwt"), Some(&Value::Object(claims("u1"))));
        assert_eq!(query.params.get("isAuthenticated"), Some(&json!(true)));
    }

    #[test]
    fn test_read_by_id_validates_only_matching_rows() {
        let query = translate_with(
            AUTH_SCHEMA,
            json!({
                "name": "users",
                "args": { "where": { "id": "nobody" } },
                "fields": [{ "name": "name" }]
            }),
            &TranslationContext::new(TranslatorConfig::default()).with_jwt(claims("nobody")),
        )
        .unwrap();
        assert!(
            query.cypher.starts_with(
                "MATCH (this:User)\nWHERE this.id = $param0\nWITH *\nWHERE apoc.util.validatePredicate(NOT ("
            ),
            "{}",
            query.cypher
        );
        assert_eq!(query.params.get("param0"), Some(&json!("nobody")));
    }

    #[test]
    fn test_update_by_id_validates_after_the_id_filter() {
        let query = translate_with(
            AUTH_SCHEMA,
            json!({
                "name": "updateUsers",
                "args": { "where": { "id": "u2" }, "update": { "name": "Eve" } },
                "fields": [{ "name": "users", "fields": [{ "name": "name" }] }]
            }),
            &signed_in(),
        )
        .unwrap();
        assert!(
            query
                .cypher
                .starts_with("MATCH (this:User)\nWHERE this.id = $param0\nWITH *\nCALL apoc.util.validate(NOT ("),
            "{}",
            query.cypher
        );
        let validate = query.cypher.find("CALL apoc.util.validate(").unwrap();
        let set = query.cypher.find("\nSET\n").unwrap();
        assert!(validate < set);
    }

    #[test]
    fn test_filter_rule_narrows_nested_read() {
        let query = translate_with(
            AUTH_SCHEMA,
            json!({ "name": "users", "fields": [{ "name": "posts", "fields": [{ "name": "content" }] }] }),
            &signed_in(),
        )
        .unwrap();
        assert!(query.cypher.contains("CALL {\n    WITH this\n    MATCH (this)-[this"));
        assert!(query.cypher.contains(":HAS_POST]->(this"));
        assert!(query.cypher.contains("EXISTS {"));
    }

    #[test]
    fn test_unauthenticated_request_still_binds_parameters() {
        let query = translate_with(
            AUTH_SCHEMA,
            json!({ "name": "users", "fields": [{ "name": "name" }] }),
            &TranslationContext::new(TranslatorConfig::default()),
        )
        .unwrap();
        assert_eq!(query.params.get("jwt"), Some(&json!({})));
        assert_eq!(query.params.get("isAuthenticated"), Some(&json!(false)));
    }

    #[test]
    fn test_create_validates_after_writing() {
        for unwind_create_enabled in [true, false] {
            let context = TranslationContext::new(TranslatorConfig {
                unwind_create_enabled,
                ..TranslatorConfig::default()
            })
            .with_jwt(claims("u1"));
            let query = translate_with(
                AUTH_SCHEMA,
                json!({
                    "name": "createPosts",
                    "args": { "input": [{ "content": "hello" }] },
                    "fields": [{ "name": "posts", "fields": [{ "name": "content" }] }]
                }),
                &context,
            )
            .unwrap();
            let create = query.cypher.find("CREATE (this").unwrap();
            let validate = query.cypher.find("CALL apoc.util.validate(NOT (").unwrap();
            assert!(create < validate, "{}", query.cypher);
        }
    }

    #[test]
    fn test_nested_create_connects_before_validating() {
        let line_of = |cypher: &str, needle: &dyn Fn(&str) -> bool| {
            cypher.lines().position(|line| needle(line.trim_start())).unwrap()
        };
        for unwind_create_enabled in [true, false] {
            let context = TranslationContext::new(TranslatorConfig {
                unwind_create_enabled,
                ..TranslatorConfig::default()
            })
            .with_jwt(claims("u1"));
            let query = translate_with(
                AUTH_SCHEMA,
                json!({
                    "name": "createUsers",
                    "args": { "input": [{ "id": "u1", "posts": { "create": [{ "node": { "content": "x" } }] } }] },
                    "fields": []
                }),
                &context,
            )
            .unwrap();
            assert_eq!(query.cypher.contains("UNWIND $param0"), unwind_create_enabled);
            let edge = line_of(&query.cypher, &|line| line.starts_with("CREATE (") && line.contains(":HAS_POST]->("));
            let validate = line_of(&query.cypher, &|line| line.starts_with("CALL apoc.util.validate("));
            assert!(edge < validate, "{}", query.cypher);
        }
    }

    #[test]
    fn test_disabled_authorization_emits_no_rules() {
        let context = TranslationContext::new(TranslatorConfig {
            authorization_enabled: false,
            ..TranslatorConfig::default()
        })
        .with_jwt(claims("u1"));
        let query = translate_with(
            AUTH_SCHEMA,
            json!({ "name": "users", "fields": [{ "name": "name" }] }),
            &context,
        )
        .unwrap();
        assert_eq!(query.cypher, "MATCH (this:User)\nRETURN this { .name } AS this");
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_translation_with_rules_is_stable() {
        let request = json!({
            "name": "users",
            "fields": [{ "name": "password" }, { "name": "posts", "fields": [{ "name": "content" }] }]
        });
        let first = translate_with(AUTH_SCHEMA, request.clone(), &signed_in()).unwrap();
        let second = translate_with(AUTH_SCHEMA, request, &signed_in()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.cypher.matches("validatePredicate").count(), 1);
    }

    #[test]
    fn test_database_failure_maps_to_forbidden() {
        let message = "Failed to invoke procedure `apoc.util.validate`: @neo4j/graphql/FORBIDDEN";
        assert_eq!(
            AuthorizationError::from_database_message(message),
            Some(AuthorizationError::Forbidden)
        );
    }
}
