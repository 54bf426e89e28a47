//! Loading type definitions from YAML and JSON and the naming derived
//! from them.

#[cfg(test)]
mod schema_loading_tests {
    use std::io::Write;

    use neographql::schema_model::errors::SchemaValidationError;
    use neographql::schema_model::{
        build_schema_model, ConcreteEntityAdapter, SchemaBuildOptions, TypeDefinitionDocument,
    };

    const YAML: &str = r#"
types:
  - kind: object
    name: Movie
    directives:
      - name: node
    fields:
      - name: title
        type: "String!"
"#;

    #[test]
    fn test_yaml_and_json_build_the_same_model() {
        let from_yaml = TypeDefinitionDocument::from_yaml_str(YAML).unwrap();
        let json = serde_json::to_string(&serde_yaml::from_str::<serde_json::Value>(YAML).unwrap()).unwrap();
        let from_json = TypeDefinitionDocument::from_json_str(&json).unwrap();
        let options = SchemaBuildOptions::default();
        let yaml_model = build_schema_model(from_yaml, &options).unwrap();
        let json_model = build_schema_model(from_json, &options).unwrap();
        let movie = yaml_model.concrete_entity_by_name("Movie").unwrap();
        assert_eq!(movie.labels, vec!["Movie".to_string()]);
        assert_eq!(
            json_model.concrete_entity_by_name("Movie").map(|m| m.attributes.len()),
            Some(movie.attributes.len())
        );
    }

    #[test]
    fn test_root_field_names() {
        let model = build_schema_model(
            TypeDefinitionDocument::from_yaml_str(YAML).unwrap(),
            &SchemaBuildOptions::default(),
        )
        .unwrap();
        let movie = model.concrete_entity_by_name("Movie").unwrap();
        let naming = ConcreteEntityAdapter::new(&model, movie.id).naming();
        assert_eq!(naming.plural, "movies");
        assert_eq!(naming.connection_field, "moviesConnection");
        assert_eq!(naming.aggregate_field, "moviesAggregate");
        assert_eq!(naming.create_field, "createMovies");
        assert_eq!(naming.update_field, "updateMovies");
        assert_eq!(naming.delete_field, "deleteMovies");
    }

    #[test]
    fn test_from_file_picks_format_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let document = TypeDefinitionDocument::from_file(file.path()).unwrap();
        assert!(build_schema_model(document, &SchemaBuildOptions::default()).is_ok());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let yaml = r#"
types:
  - kind: object
    name: Movie
    fields:
      - name: studio
        type: Studio
"#;
        let err = build_schema_model(
            TypeDefinitionDocument::from_yaml_str(yaml).unwrap(),
            &SchemaBuildOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaValidationError::UnresolvedType { .. }), "{:?}", err);
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = TypeDefinitionDocument::from_file("/nonexistent/schema.yaml").unwrap_err();
        assert!(matches!(err, SchemaValidationError::DocumentReadError { .. }));
    }
}
