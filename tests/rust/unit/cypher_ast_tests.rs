//! Rendering of the Cypher clause tree.

#[cfg(test)]
mod cypher_ast_tests {
    use neographql::cypher_generator::ast::{
        escape_name, render_clauses, Clause, Expr, NodePattern, Pattern, Projection, SetItem,
    };
    use neographql::cypher_generator::ToCypher;
    use serde_json::json;

    #[test]
    fn test_identifiers_are_escaped_only_when_needed() {
        assert_eq!(escape_name("Movie"), "Movie");
        assert_eq!(escape_name("Movie Night"), "`Movie Night`");
        assert_eq!(escape_name("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_labels_with_spaces_render_escaped() {
        let pattern = Pattern::node(NodePattern::new("this", &["Film Noir".to_string()]));
        assert_eq!(pattern.to_cypher(), "(this:`Film Noir`)");
    }

    #[test]
    fn test_nested_call_indentation() {
        let clauses = vec![
            Clause::Match {
                optional: false,
                pattern: Pattern::node(NodePattern::new("this", &["Movie".to_string()])),
                where_: None,
            },
            Clause::Call(vec![
                Clause::With(Projection::variables(&["this"])),
                Clause::Set(vec![SetItem::Property {
                    variable: "this".to_string(),
                    property: "views".to_string(),
                    value: Expr::Literal(json!(1)),
                }]),
                Clause::Return(Projection::item(Expr::function("count", vec![Expr::Star]), "var0")),
            ]),
        ];
        assert_eq!(
            render_clauses(&clauses),
            "MATCH (this:Movie)\nCALL {\n    WITH this\n    SET\n        this.views = 1\n    RETURN count(*) AS var0\n}"
        );
    }

    #[test]
    fn test_string_literals_are_quoted() {
        assert_eq!(Expr::Literal(json!("say \"hi\"")).to_cypher(), "\"say \\\"hi\\\"\"");
    }
}
