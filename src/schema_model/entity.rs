use once_cell::sync::OnceCell;

use super::adapters::EntityNaming;
use super::annotations::Annotations;
use super::attribute::Attribute;
use super::model::{CompositeEntityId, ConcreteEntityId};
use super::relationship::{Relationship, RelationshipDeclaration};

#[derive(Debug, Clone)]
pub struct ConcreteEntity {
    pub id: ConcreteEntityId,
    pub name: String,
    pub labels: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub relationships: Vec<Relationship>,
    /// Interfaces and unions this entity belongs to
    pub composite_entities: Vec<CompositeEntityId>,
    pub annotations: Annotations,
    pub(crate) naming: OnceCell<EntityNaming>,
}

impl ConcreteEntity {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceEntity {
    pub id: CompositeEntityId,
    pub name: String,
    pub concrete_entities: Vec<ConcreteEntityId>,
    pub attributes: Vec<Attribute>,
    pub relationship_declarations: Vec<RelationshipDeclaration>,
    pub annotations: Annotations,
    pub(crate) naming: OnceCell<EntityNaming>,
}

#[derive(Debug, Clone)]
pub struct UnionEntity {
    pub id: CompositeEntityId,
    pub name: String,
    pub concrete_entities: Vec<ConcreteEntityId>,
    pub annotations: Annotations,
    pub(crate) naming: OnceCell<EntityNaming>,
}

#[derive(Debug, Clone)]
pub enum CompositeEntity {
    Interface(InterfaceEntity),
    Union(UnionEntity),
}

impl CompositeEntity {
    pub fn id(&self) -> CompositeEntityId {
        match self {
            CompositeEntity::Interface(i) => i.id,
            CompositeEntity::Union(u) => u.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CompositeEntity::Interface(i) => &i.name,
            CompositeEntity::Union(u) => &u.name,
        }
    }

    pub fn concrete_entities(&self) -> &[ConcreteEntityId] {
        match self {
            CompositeEntity::Interface(i) => &i.concrete_entities,
            CompositeEntity::Union(u) => &u.concrete_entities,
        }
    }

    pub fn annotations(&self) -> &Annotations {
        match self {
            CompositeEntity::Interface(i) => &i.annotations,
            CompositeEntity::Union(u) => &u.annotations,
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        match self {
            CompositeEntity::Interface(i) => &i.attributes,
            CompositeEntity::Union(_) => &[],
        }
    }

    pub fn relationship_declaration(&self, name: &str) -> Option<&RelationshipDeclaration> {
        match self {
            CompositeEntity::Interface(i) => {
                i.relationship_declarations.iter().find(|d| d.name == name)
            }
            CompositeEntity::Union(_) => None,
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, CompositeEntity::Union(_))
    }

    pub(crate) fn naming_cell(&self) -> &OnceCell<EntityNaming> {
        match self {
            CompositeEntity::Interface(i) => &i.naming,
            CompositeEntity::Union(u) => &u.naming,
        }
    }
}
