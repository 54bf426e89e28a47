use super::annotations::{Annotations, NestedOperation, RelationshipDirection};
use super::attribute::Attribute;
use super::model::{CompositeEntityId, ConcreteEntityId, EntityRef, RelationshipPropertiesId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    pub is_list: bool,
    pub is_required: bool,
}

/// Stable address of a concrete relationship: owning entity plus field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationshipRef {
    pub entity: ConcreteEntityId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Relationship {
    pub name: String,
    pub source: ConcreteEntityId,
    pub target: EntityRef,
    pub rel_type: String,
    pub direction: RelationshipDirection,
    pub cardinality: Cardinality,
    pub nested_operations: Vec<NestedOperation>,
    pub aggregate: bool,
    pub properties: Option<RelationshipPropertiesId>,
    /// Topmost interface that declares this field, if any
    pub first_declared_in: Option<String>,
    /// Target type named at that declaration
    pub original_target: Option<String>,
    /// Other implementations of the same interface declaration that share
    /// this relationship's properties type
    pub siblings: Vec<RelationshipRef>,
    pub annotations: Annotations,
}

impl Relationship {
    pub fn allows(&self, operation: NestedOperation) -> bool {
        self.nested_operations.contains(&operation)
    }
}

/// A relationship field declared on an interface, realised by a concrete
/// relationship on every implementing entity.
#[derive(Debug, Clone)]
pub struct RelationshipDeclaration {
    pub name: String,
    pub source: CompositeEntityId,
    pub target: EntityRef,
    pub cardinality: Cardinality,
    pub implementations: Vec<RelationshipRef>,
    pub annotations: Annotations,
}

/// A `@relationshipProperties` type.
#[derive(Debug, Clone)]
pub struct RelationshipProperties {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl RelationshipProperties {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}
