//! Schema model: the typed, immutable entity/relationship graph compiled
//! from a type-definition document.

pub mod adapters;
pub mod annotations;
pub mod attribute;
pub mod authorization_annotation;
pub mod builder;
pub mod declaration_origin;
pub mod definitions;
pub mod entity;
pub mod errors;
pub mod model;
pub mod operation;
pub mod relationship;
pub mod validation;

#[cfg(test)]
pub mod testing;

pub use adapters::{
    AttributeAdapter, CompositeEntityAdapter, ConcreteEntityAdapter, EntityAdapter, EntityNaming,
    FilterOperator, RelationshipAdapter,
};
pub use annotations::{Annotation, Annotations, NestedOperation, RelationshipDirection};
pub use attribute::{Attribute, AttributeKind, AttributeType, ScalarType};
pub use authorization_annotation::{
    AuthorizationAnnotation, AuthorizationOperation, AuthorizationWhen, AuthorizationWhere,
};
pub use builder::{build_schema_model, SchemaBuildOptions};
pub use declaration_origin::InterfaceConflictPolicy;
pub use definitions::{TypeDefinitionDocument, TypeRef};
pub use entity::{CompositeEntity, ConcreteEntity};
pub use errors::SchemaValidationError;
pub use model::{
    CompositeEntityId, ConcreteEntityId, EntityRef, Neo4jGraphQLSchemaModel,
    RelationshipPropertiesId,
};
pub use operation::{Operation, OperationType};
pub use relationship::{Relationship, RelationshipDeclaration, RelationshipProperties};
