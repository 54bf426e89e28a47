use std::collections::HashMap;

use super::entity::{CompositeEntity, ConcreteEntity};
use super::operation::{Operation, OperationType};
use super::relationship::{Relationship, RelationshipProperties, RelationshipRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConcreteEntityId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeEntityId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationshipPropertiesId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Concrete(ConcreteEntityId),
    Composite(CompositeEntityId),
}

/// The compiled schema: an arena of entities addressed by index.
///
/// Built once by [`super::builder::SchemaModelBuilder`] and never mutated
/// afterwards, so it can be shared across threads (e.g. behind an `Arc`)
/// for any number of concurrent translations.
#[derive(Debug, Clone)]
pub struct Neo4jGraphQLSchemaModel {
    pub(crate) concrete_entities: Vec<ConcreteEntity>,
    pub(crate) composite_entities: Vec<CompositeEntity>,
    pub(crate) relationship_properties: Vec<RelationshipProperties>,
    pub(crate) entity_index: HashMap<String, EntityRef>,
    pub(crate) operations: Vec<Operation>,
}

impl Neo4jGraphQLSchemaModel {
    pub fn concrete_entity(&self, id: ConcreteEntityId) -> &ConcreteEntity {
        &self.concrete_entities[id.0]
    }

    pub fn composite_entity(&self, id: CompositeEntityId) -> &CompositeEntity {
        &self.composite_entities[id.0]
    }

    pub fn relationship_properties(&self, id: RelationshipPropertiesId) -> &RelationshipProperties {
        &self.relationship_properties[id.0]
    }

    pub fn concrete_entities(&self) -> impl Iterator<Item = &ConcreteEntity> {
        self.concrete_entities.iter()
    }

    pub fn composite_entities(&self) -> impl Iterator<Item = &CompositeEntity> {
        self.composite_entities.iter()
    }

    pub fn entity_ref(&self, name: &str) -> Option<EntityRef> {
        self.entity_index.get(name).copied()
    }

    pub fn concrete_entity_by_name(&self, name: &str) -> Option<&ConcreteEntity> {
        match self.entity_ref(name)? {
            EntityRef::Concrete(id) => Some(self.concrete_entity(id)),
            EntityRef::Composite(_) => None,
        }
    }

    pub fn composite_entity_by_name(&self, name: &str) -> Option<&CompositeEntity> {
        match self.entity_ref(name)? {
            EntityRef::Composite(id) => Some(self.composite_entity(id)),
            EntityRef::Concrete(_) => None,
        }
    }

    pub fn entity_name(&self, entity: EntityRef) -> &str {
        match entity {
            EntityRef::Concrete(id) => &self.concrete_entity(id).name,
            EntityRef::Composite(id) => self.composite_entity(id).name(),
        }
    }

    /// Concrete entities an entity reference can stand for.
    pub fn concrete_entities_of(&self, entity: EntityRef) -> Vec<ConcreteEntityId> {
        match entity {
            EntityRef::Concrete(id) => vec![id],
            EntityRef::Composite(id) => self.composite_entity(id).concrete_entities().to_vec(),
        }
    }

    pub fn relationship(&self, reference: &RelationshipRef) -> Option<&Relationship> {
        self.concrete_entity(reference.entity)
            .relationship(&reference.name)
    }

    pub fn operation(&self, operation_type: OperationType) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|o| o.operation_type == operation_type)
    }
}
