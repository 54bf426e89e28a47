use super::{AttributeAdapter, EntityNaming, RelationshipAdapter};
use crate::schema_model::annotations::TimestampOperation;
use crate::schema_model::authorization_annotation::AuthorizationAnnotation;
use crate::schema_model::entity::{CompositeEntity, ConcreteEntity};
use crate::schema_model::model::{
    CompositeEntityId, ConcreteEntityId, EntityRef, Neo4jGraphQLSchemaModel,
};
use crate::schema_model::relationship::RelationshipDeclaration;

#[derive(Debug, Clone, Copy)]
pub struct ConcreteEntityAdapter<'a> {
    pub model: &'a Neo4jGraphQLSchemaModel,
    pub entity: &'a ConcreteEntity,
}

impl<'a> ConcreteEntityAdapter<'a> {
    pub fn new(model: &'a Neo4jGraphQLSchemaModel, id: ConcreteEntityId) -> Self {
        ConcreteEntityAdapter {
            model,
            entity: model.concrete_entity(id),
        }
    }

    pub fn id(&self) -> ConcreteEntityId {
        self.entity.id
    }

    pub fn name(&self) -> &'a str {
        &self.entity.name
    }

    pub fn labels(&self) -> &'a [String] {
        &self.entity.labels
    }

    pub fn naming(&self) -> &'a EntityNaming {
        let entity = self.entity;
        entity.naming.get_or_init(|| {
            EntityNaming::new(
                &entity.name,
                entity.annotations.plural.as_ref().map(|p| p.value.as_str()),
            )
        })
    }

    pub fn attribute(&self, name: &str) -> Option<AttributeAdapter<'a>> {
        self.entity.attribute(name).map(AttributeAdapter::new)
    }

    pub fn attributes(&self) -> impl Iterator<Item = AttributeAdapter<'a>> + 'a {
        self.entity.attributes.iter().map(AttributeAdapter::new)
    }

    pub fn relationship(&self, name: &str) -> Option<RelationshipAdapter<'a>> {
        self.entity
            .relationship(name)
            .map(|r| RelationshipAdapter::new(self.model, r))
    }

    pub fn relationships(&self) -> impl Iterator<Item = RelationshipAdapter<'a>> + 'a {
        let model = self.model;
        self.entity
            .relationships
            .iter()
            .map(move |r| RelationshipAdapter::new(model, r))
    }

    /// Attributes that can address a single node (`@id` / `@unique`).
    pub fn identifying_attributes(&self) -> Vec<AttributeAdapter<'a>> {
        self.attributes()
            .filter(|a| a.attribute.flags.identifying)
            .collect()
    }

    pub fn autogenerated_attributes(&self, event: TimestampOperation) -> Vec<AttributeAdapter<'a>> {
        self.attributes()
            .filter(|a| a.attribute.is_autogenerated_on(event))
            .collect()
    }

    pub fn authorization(&self) -> Option<&'a AuthorizationAnnotation> {
        self.entity.annotations.authorization.as_ref()
    }

    pub fn is_member_of(&self, composite: CompositeEntityId) -> bool {
        self.entity.composite_entities.contains(&composite)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompositeEntityAdapter<'a> {
    pub model: &'a Neo4jGraphQLSchemaModel,
    pub entity: &'a CompositeEntity,
}

impl<'a> CompositeEntityAdapter<'a> {
    pub fn new(model: &'a Neo4jGraphQLSchemaModel, id: CompositeEntityId) -> Self {
        CompositeEntityAdapter {
            model,
            entity: model.composite_entity(id),
        }
    }

    pub fn id(&self) -> CompositeEntityId {
        self.entity.id()
    }

    pub fn name(&self) -> &'a str {
        self.entity.name()
    }

    pub fn naming(&self) -> &'a EntityNaming {
        let entity = self.entity;
        entity.naming_cell().get_or_init(|| {
            EntityNaming::new(
                entity.name(),
                entity
                    .annotations()
                    .plural
                    .as_ref()
                    .map(|p| p.value.as_str()),
            )
        })
    }

    pub fn concrete_entities(&self) -> Vec<ConcreteEntityAdapter<'a>> {
        self.entity
            .concrete_entities()
            .iter()
            .map(|id| ConcreteEntityAdapter::new(self.model, *id))
            .collect()
    }

    pub fn concrete_entity(&self, name: &str) -> Option<ConcreteEntityAdapter<'a>> {
        self.concrete_entities()
            .into_iter()
            .find(|e| e.name() == name)
    }

    pub fn attribute(&self, name: &str) -> Option<AttributeAdapter<'a>> {
        self.entity
            .attributes()
            .iter()
            .find(|a| a.name == name)
            .map(AttributeAdapter::new)
    }

    pub fn relationship_declaration(&self, name: &str) -> Option<&'a RelationshipDeclaration> {
        self.entity.relationship_declaration(name)
    }

    pub fn is_union(&self) -> bool {
        self.entity.is_union()
    }

    pub fn authorization(&self) -> Option<&'a AuthorizationAnnotation> {
        self.entity.annotations().authorization.as_ref()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum EntityAdapter<'a> {
    Concrete(ConcreteEntityAdapter<'a>),
    Composite(CompositeEntityAdapter<'a>),
}

impl<'a> EntityAdapter<'a> {
    pub fn new(model: &'a Neo4jGraphQLSchemaModel, entity: EntityRef) -> Self {
        match entity {
            EntityRef::Concrete(id) => EntityAdapter::Concrete(ConcreteEntityAdapter::new(model, id)),
            EntityRef::Composite(id) => {
                EntityAdapter::Composite(CompositeEntityAdapter::new(model, id))
            }
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            EntityAdapter::Concrete(e) => e.name(),
            EntityAdapter::Composite(e) => e.name(),
        }
    }

    pub fn naming(&self) -> &'a EntityNaming {
        match self {
            EntityAdapter::Concrete(e) => e.naming(),
            EntityAdapter::Composite(e) => e.naming(),
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        match self {
            EntityAdapter::Concrete(e) => EntityRef::Concrete(e.id()),
            EntityAdapter::Composite(e) => EntityRef::Composite(e.id()),
        }
    }

    pub fn concrete_entities(&self) -> Vec<ConcreteEntityAdapter<'a>> {
        match self {
            EntityAdapter::Concrete(e) => vec![*e],
            EntityAdapter::Composite(e) => e.concrete_entities(),
        }
    }
}
