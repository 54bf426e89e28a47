//! Parsed type-definition documents.
//!
//! The schema model is built from an already-parsed document of type
//! declarations. Documents are plain serde values, so they load from YAML
//! or JSON:
//!
//! ```yaml
//! types:
//!   - kind: object
//!     name: Movie
//!     directives:
//!       - name: node
//!     fields:
//!       - name: title
//!         type: String
//!       - name: actors
//!         type: "[Actor!]!"
//!         directives:
//!           - name: relationship
//!             arguments: { type: ACTED_IN, direction: IN }
//! extensions:
//!   - name: Movie
//!     directives:
//!       - name: authorization
//!         arguments: { filter: [{ where: { node: { owner_EQ: "$jwt.sub" } } }] }
//! ```

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::{map, opt},
    error::ParseError,
    sequence::delimited,
    IResult, Parser,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

use super::errors::SchemaValidationError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDefinitionDocument {
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
    /// `extend type X @directive { ... }` blocks, merged into `X` before building
    #[serde(default)]
    pub extensions: Vec<TypeExtension>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDefinition {
    Object(ObjectTypeDefinition),
    Interface(ObjectTypeDefinition),
    Union(UnionTypeDefinition),
    Enum(EnumTypeDefinition),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Object(def) | TypeDefinition::Interface(def) => &def.name,
            TypeDefinition::Union(def) => &def.name,
            TypeDefinition::Enum(def) => &def.name,
        }
    }
}

/// Shared shape of object and interface declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectTypeDefinition {
    pub name: String,
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub directives: Vec<DirectiveNode>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl ObjectTypeDefinition {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.iter().any(|d| d.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnionTypeDefinition {
    pub name: String,
    pub members: Vec<String>,
    #[serde(default)]
    pub directives: Vec<DirectiveNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumTypeDefinition {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: String,
    #[serde(default)]
    pub directives: Vec<DirectiveNode>,
}

impl FieldDefinition {
    pub fn directive(&self, name: &str) -> Option<&DirectiveNode> {
        self.directives.iter().find(|d| d.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveNode {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeExtension {
    pub name: String,
    #[serde(default)]
    pub directives: Vec<DirectiveNode>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl TypeDefinitionDocument {
    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaValidationError> {
        serde_yaml::from_str(content).map_err(|e| SchemaValidationError::DocumentParseError {
            error: e.to_string(),
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self, SchemaValidationError> {
        serde_json::from_str(content).map_err(|e| SchemaValidationError::DocumentParseError {
            error: e.to_string(),
        })
    }

    /// Load a document from disk; `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaValidationError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| SchemaValidationError::DocumentReadError {
                error: format!("{}: {}", path.display(), e),
            })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Fold every `extensions` entry into the type it extends.
    pub fn merge_extensions(mut self) -> Result<Self, SchemaValidationError> {
        let extensions = std::mem::take(&mut self.extensions);
        for extension in extensions {
            let target = self
                .types
                .iter_mut()
                .find(|t| t.name() == extension.name)
                .ok_or_else(|| {
                    SchemaValidationError::unresolved_with_context(
                        extension.name.clone(),
                        "type extension",
                    )
                })?;
            match target {
                TypeDefinition::Object(def) | TypeDefinition::Interface(def) => {
                    def.directives.extend(extension.directives);
                    def.fields.extend(extension.fields);
                }
                TypeDefinition::Union(def) => {
                    def.directives.extend(extension.directives);
                }
                TypeDefinition::Enum(_) => {
                    return Err(SchemaValidationError::directive_error_with_context(
                        "extend",
                        extension.name,
                        "enum types cannot be extended",
                    ))
                }
            }
        }
        Ok(self)
    }
}

/// A GraphQL type reference: `Movie`, `[Movie!]!`, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Innermost named type, looking through list and non-null wrappers.
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::List(_) => true,
            TypeRef::NonNull(inner) => inner.is_list(),
            TypeRef::Named(_) => false,
        }
    }

    /// For list types, whether the list items are non-null.
    pub fn list_items_required(&self) -> bool {
        match self {
            TypeRef::List(inner) => inner.is_required(),
            TypeRef::NonNull(inner) => inner.list_items_required(),
            TypeRef::Named(_) => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

fn ws<'a, O, E: ParseError<&'a str>, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
{
    delimited(multispace0, inner, multispace0)
}

fn named_type(input: &str) -> IResult<&str, TypeRef> {
    map(
        ws(take_while1(|c: char| c.is_alphanumeric() || c == '_')),
        |name: &str| TypeRef::Named(name.to_string()),
    )
    .parse(input)
}

fn list_type(input: &str) -> IResult<&str, TypeRef> {
    map(delimited(ws(char('[')), type_ref, ws(char(']'))), |inner| {
        TypeRef::List(Box::new(inner))
    })
    .parse(input)
}

fn type_ref(input: &str) -> IResult<&str, TypeRef> {
    let (input, base) = alt((list_type, named_type)).parse(input)?;
    let (input, bang) = opt(ws(char('!'))).parse(input)?;
    match bang {
        Some(_) => Ok((input, TypeRef::NonNull(Box::new(base)))),
        None => Ok((input, base)),
    }
}

pub fn parse_type_ref(input: &str) -> Result<TypeRef, SchemaValidationError> {
    match type_ref(input) {
        Ok(("", parsed)) => Ok(parsed),
        _ => Err(SchemaValidationError::InvalidTypeReference {
            type_ref: input.to_string(),
        }),
    }
}
