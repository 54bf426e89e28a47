//! Directive decoding.
//!
//! Every supported directive is decoded exactly once, while the model is
//! built, into a closed [`Annotation`] variant. Nothing downstream looks at
//! directive names or raw arguments again.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::authorization_annotation::AuthorizationAnnotation;
use super::definitions::DirectiveNode;
use super::errors::SchemaValidationError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeAnnotation {
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NestedOperation {
    Create,
    Connect,
    Disconnect,
    Update,
    Delete,
    ConnectOrCreate,
}

impl NestedOperation {
    pub const ALL: [NestedOperation; 6] = [
        NestedOperation::Create,
        NestedOperation::Connect,
        NestedOperation::Disconnect,
        NestedOperation::Update,
        NestedOperation::Delete,
        NestedOperation::ConnectOrCreate,
    ];

    pub fn input_key(&self) -> &'static str {
        match self {
            NestedOperation::Create => "create",
            NestedOperation::Connect => "connect",
            NestedOperation::Disconnect => "disconnect",
            NestedOperation::Update => "update",
            NestedOperation::Delete => "delete",
            NestedOperation::ConnectOrCreate => "connectOrCreate",
        }
    }
}

fn all_nested_operations() -> Vec<NestedOperation> {
    NestedOperation::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipAnnotation {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub direction: RelationshipDirection,
    #[serde(default)]
    pub properties: Option<String>,
    #[serde(default = "all_nested_operations")]
    pub nested_operations: Vec<NestedOperation>,
    #[serde(default = "default_true")]
    pub aggregate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CypherAnnotation {
    pub statement: String,
    pub column_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoalesceAnnotation {
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasAnnotation {
    pub property: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdAnnotation {
    #[serde(default = "default_true")]
    pub autogenerate: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueAnnotation {
    #[serde(default)]
    pub constraint_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimestampOperation {
    Create,
    Update,
}

fn default_timestamp_operations() -> Vec<TimestampOperation> {
    vec![TimestampOperation::Create, TimestampOperation::Update]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampAnnotation {
    #[serde(default = "default_timestamp_operations")]
    pub operations: Vec<TimestampOperation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluralAnnotation {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomResolverAnnotation {
    #[serde(default)]
    pub requires: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Node(NodeAnnotation),
    Relationship(RelationshipAnnotation),
    DeclareRelationship,
    RelationshipProperties,
    Authorization(AuthorizationAnnotation),
    Cypher(CypherAnnotation),
    Coalesce(CoalesceAnnotation),
    Alias(AliasAnnotation),
    Id(IdAnnotation),
    Unique(UniqueAnnotation),
    Timestamp(TimestampAnnotation),
    Plural(PluralAnnotation),
    CustomResolver(CustomResolverAnnotation),
}

fn decode_arguments<T: DeserializeOwned>(
    directive: &DirectiveNode,
    location: &str,
) -> Result<T, SchemaValidationError> {
    serde_json::from_value(Value::Object(directive.arguments.clone())).map_err(|e| {
        SchemaValidationError::directive_error_with_context(
            directive.name.clone(),
            location,
            e.to_string(),
        )
    })
}

impl Annotation {
    /// Decode one directive. Directives this crate does not know about
    /// yield `Ok(None)`.
    pub fn decode(
        directive: &DirectiveNode,
        location: &str,
    ) -> Result<Option<Annotation>, SchemaValidationError> {
        let annotation = match directive.name.as_str() {
            "node" => Annotation::Node(decode_arguments(directive, location)?),
            "relationship" => Annotation::Relationship(decode_arguments(directive, location)?),
            "declareRelationship" => Annotation::DeclareRelationship,
            "relationshipProperties" => Annotation::RelationshipProperties,
            "authorization" => Annotation::Authorization(decode_arguments(directive, location)?),
            "cypher" => Annotation::Cypher(decode_arguments(directive, location)?),
            "coalesce" => {
                let coalesce: CoalesceAnnotation = decode_arguments(directive, location)?;
                if coalesce.value.is_object() || coalesce.value.is_array() || coalesce.value.is_null()
                {
                    return Err(SchemaValidationError::directive_error_with_context(
                        "coalesce",
                        location,
                        "value must be a scalar",
                    ));
                }
                Annotation::Coalesce(coalesce)
            }
            "alias" => Annotation::Alias(decode_arguments(directive, location)?),
            "id" => Annotation::Id(decode_arguments(directive, location)?),
            "unique" => Annotation::Unique(decode_arguments(directive, location)?),
            "timestamp" => Annotation::Timestamp(decode_arguments(directive, location)?),
            "plural" => Annotation::Plural(decode_arguments(directive, location)?),
            "customResolver" => Annotation::CustomResolver(decode_arguments(directive, location)?),
            other => {
                log::trace!("Ignoring unsupported directive @{} on {}", other, location);
                return Ok(None);
            }
        };
        Ok(Some(annotation))
    }
}

/// The decoded annotations of one declaration, one typed slot per kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub node: Option<NodeAnnotation>,
    pub relationship: Option<RelationshipAnnotation>,
    pub declare_relationship: bool,
    pub relationship_properties: bool,
    pub authorization: Option<AuthorizationAnnotation>,
    pub cypher: Option<CypherAnnotation>,
    pub coalesce: Option<CoalesceAnnotation>,
    pub alias: Option<AliasAnnotation>,
    pub id: Option<IdAnnotation>,
    pub unique: Option<UniqueAnnotation>,
    pub timestamp: Option<TimestampAnnotation>,
    pub plural: Option<PluralAnnotation>,
    pub custom_resolver: Option<CustomResolverAnnotation>,
}

impl Annotations {
    pub fn from_directives(
        directives: &[DirectiveNode],
        location: &str,
    ) -> Result<Self, SchemaValidationError> {
        let mut annotations = Annotations::default();
        for directive in directives {
            if let Some(annotation) = Annotation::decode(directive, location)? {
                annotations.insert(annotation, location)?;
            }
        }
        Ok(annotations)
    }

    fn insert(&mut self, annotation: Annotation, location: &str) -> Result<(), SchemaValidationError> {
        fn set_once<T>(
            slot: &mut Option<T>,
            value: T,
            name: &str,
            location: &str,
        ) -> Result<(), SchemaValidationError> {
            if slot.is_some() {
                return Err(SchemaValidationError::directive_error_with_context(
                    name,
                    location,
                    "directive may only be used once",
                ));
            }
            *slot = Some(value);
            Ok(())
        }

        match annotation {
            Annotation::Node(a) => set_once(&mut self.node, a, "node", location),
            Annotation::Relationship(a) => {
                set_once(&mut self.relationship, a, "relationship", location)
            }
            Annotation::DeclareRelationship => {
                self.declare_relationship = true;
                Ok(())
            }
            Annotation::RelationshipProperties => {
                self.relationship_properties = true;
                Ok(())
            }
            Annotation::Authorization(a) => {
                match self.authorization.as_mut() {
                    Some(existing) => existing.merge(a),
                    None => self.authorization = Some(a),
                }
                Ok(())
            }
            Annotation::Cypher(a) => set_once(&mut self.cypher, a, "cypher", location),
            Annotation::Coalesce(a) => set_once(&mut self.coalesce, a, "coalesce", location),
            Annotation::Alias(a) => set_once(&mut self.alias, a, "alias", location),
            Annotation::Id(a) => set_once(&mut self.id, a, "id", location),
            Annotation::Unique(a) => set_once(&mut self.unique, a, "unique", location),
            Annotation::Timestamp(a) => set_once(&mut self.timestamp, a, "timestamp", location),
            Annotation::Plural(a) => set_once(&mut self.plural, a, "plural", location),
            Annotation::CustomResolver(a) => {
                set_once(&mut self.custom_resolver, a, "customResolver", location)
            }
        }
    }
}
