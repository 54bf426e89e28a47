//! Per-statement emission state: variable names, parameters and the
//! connection windows the response needs to be finished with.

use serde::Serialize;
use serde_json::{Map, Value};

use super::ast::{Expr, NodePattern, Pattern, PathDirection, RelationshipPattern};
use super::errors::CypherGeneratorError;
use crate::query_ast::TranslationContext;
use crate::schema_model::relationship::RelationshipRef;
use crate::schema_model::{ConcreteEntityId, Neo4jGraphQLSchemaModel, Relationship, RelationshipDirection};

/// Key a connection's total is returned under when the request did not
/// select `totalCount` itself.
pub const TOTAL_COUNT_KEY: &str = "totalCount";

/// Where in the result a connection object sits and which row window it
/// was cut to; cursors and `pageInfo` are derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionWindow {
    /// Response keys from the returned row down to the connection object;
    /// lists along the way are walked element by element
    pub path: Vec<String>,
    pub offset: usize,
    pub first: Option<usize>,
    pub edges: Option<String>,
    pub cursor: Option<String>,
    pub total_count: Option<String>,
    pub page_info: Option<String>,
}

/// Name allocator and parameter table shared by every clause of one
/// statement.
///
/// `thisN`, `varN` and `paramN` draw from a single counter so that no two
/// names collide anywhere in the statement.
pub struct CypherEnv<'a> {
    pub model: &'a Neo4jGraphQLSchemaModel,
    pub context: &'a TranslationContext,
    counter: usize,
    params: Map<String, Value>,
    path: Vec<String>,
    windows: Vec<ConnectionWindow>,
}

impl<'a> CypherEnv<'a> {
    pub fn new(model: &'a Neo4jGraphQLSchemaModel, context: &'a TranslationContext) -> Self {
        CypherEnv {
            model,
            context,
            counter: 0,
            params: Map::new(),
            path: Vec::new(),
            windows: Vec::new(),
        }
    }

    fn bump(&mut self) -> usize {
        let next = self.counter;
        self.counter += 1;
        next
    }

    pub fn next_this(&mut self) -> String {
        format!("this{}", self.bump())
    }

    pub fn next_var(&mut self) -> String {
        format!("var{}", self.bump())
    }

    /// Bind a request value to a fresh parameter.
    pub fn param(&mut self, value: Value) -> Expr {
        let name = format!("param{}", self.bump());
        self.params.insert(name.clone(), value);
        Expr::Param(name)
    }

    /// Bind a value under a fixed name; the first binding wins.
    pub fn named_param(&mut self, name: &str, value: Value) -> Expr {
        if !self.params.contains_key(name) {
            self.params.insert(name.to_string(), value);
        }
        Expr::Param(name.to_string())
    }

    /// The JWT claims parameter. Binding it also binds the authenticated
    /// flag, since rules read both.
    pub fn jwt(&mut self) -> Expr {
        let context = self.context;
        self.named_param(
            &context.config.authenticated_param_name,
            Value::Bool(context.is_authenticated()),
        );
        self.named_param(&context.config.jwt_param_name, context.jwt_param())
    }

    /// `$jwt.a.b`
    pub fn jwt_claim(&mut self, path: &str) -> Expr {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .fold(self.jwt(), |target, segment| Expr::Property(Box::new(target), segment.to_string()))
    }

    pub fn is_authenticated(&mut self) -> Expr {
        self.jwt();
        Expr::Param(self.context.config.authenticated_param_name.clone())
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn into_parts(self) -> (Map<String, Value>, Vec<ConnectionWindow>) {
        (self.params, self.windows)
    }

    pub fn enter(&mut self, key: &str) {
        self.path.push(key.to_string());
    }

    pub fn leave(&mut self) {
        self.path.pop();
    }

    pub fn current_path(&self) -> Vec<String> {
        self.path.clone()
    }

    pub fn add_window(&mut self, window: ConnectionWindow) {
        self.windows.push(window);
    }

    pub fn labels(&self, entity: ConcreteEntityId) -> Vec<String> {
        self.model.concrete_entity(entity).labels.clone()
    }

    pub fn type_name(&self, entity: ConcreteEntityId) -> &'a str {
        &self.model.concrete_entity(entity).name
    }

    pub fn relationship(&self, reference: &RelationshipRef) -> Result<&'a Relationship, CypherGeneratorError> {
        let model = self.model;
        model.relationship(reference).ok_or_else(|| {
            CypherGeneratorError::missing_relationship_with_context(
                model.concrete_entity(reference.entity).name.clone(),
                reference.name.clone(),
            )
        })
    }

    /// `(from)-[edge:TYPE]->(to)` following the declared direction.
    pub fn hop(&self, from: &str, relationship: &Relationship, edge: Option<&str>, to: NodePattern) -> Pattern {
        Pattern::hop(
            NodePattern::bound(from),
            RelationshipPattern {
                variable: edge.map(str::to_string),
                rel_type: relationship.rel_type.clone(),
                direction: match relationship.direction {
                    RelationshipDirection::Out => PathDirection::Outgoing,
                    RelationshipDirection::In => PathDirection::Incoming,
                },
                properties: Vec::new(),
            },
            to,
        )
    }
}
