use super::{AttributeAdapter, ConcreteEntityAdapter, EntityAdapter};
use crate::schema_model::annotations::{NestedOperation, RelationshipDirection};
use crate::schema_model::model::{EntityRef, Neo4jGraphQLSchemaModel};
use crate::schema_model::relationship::{Relationship, RelationshipProperties, RelationshipRef};

#[derive(Debug, Clone, Copy)]
pub struct RelationshipAdapter<'a> {
    pub model: &'a Neo4jGraphQLSchemaModel,
    pub relationship: &'a Relationship,
}

impl<'a> RelationshipAdapter<'a> {
    pub fn new(model: &'a Neo4jGraphQLSchemaModel, relationship: &'a Relationship) -> Self {
        RelationshipAdapter {
            model,
            relationship,
        }
    }

    pub fn name(&self) -> &'a str {
        &self.relationship.name
    }

    pub fn reference(&self) -> RelationshipRef {
        RelationshipRef {
            entity: self.relationship.source,
            name: self.relationship.name.clone(),
        }
    }

    pub fn rel_type(&self) -> &'a str {
        &self.relationship.rel_type
    }

    pub fn direction(&self) -> RelationshipDirection {
        self.relationship.direction
    }

    pub fn is_list(&self) -> bool {
        self.relationship.cardinality.is_list
    }

    pub fn is_required(&self) -> bool {
        self.relationship.cardinality.is_required
    }

    pub fn source(&self) -> ConcreteEntityAdapter<'a> {
        ConcreteEntityAdapter::new(self.model, self.relationship.source)
    }

    pub fn target(&self) -> EntityAdapter<'a> {
        EntityAdapter::new(self.model, self.relationship.target)
    }

    pub fn target_ref(&self) -> EntityRef {
        self.relationship.target
    }

    pub fn is_target_composite(&self) -> bool {
        matches!(self.relationship.target, EntityRef::Composite(_))
    }

    pub fn target_concrete_entities(&self) -> Vec<ConcreteEntityAdapter<'a>> {
        self.target().concrete_entities()
    }

    pub fn properties(&self) -> Option<&'a RelationshipProperties> {
        self.relationship
            .properties
            .map(|id| self.model.relationship_properties(id))
    }

    pub fn edge_attribute(&self, name: &str) -> Option<AttributeAdapter<'a>> {
        self.properties()?.attribute(name).map(AttributeAdapter::new)
    }

    pub fn connection_field(&self) -> String {
        format!("{}Connection", self.relationship.name)
    }

    pub fn aggregate_field(&self) -> String {
        format!("{}Aggregate", self.relationship.name)
    }

    pub fn allows(&self, operation: NestedOperation) -> bool {
        self.relationship.allows(operation)
    }

    pub fn is_aggregable(&self) -> bool {
        self.relationship.aggregate
    }
}
