//! Schema model construction.
//!
//! Turns a [`TypeDefinitionDocument`] into an immutable
//! [`Neo4jGraphQLSchemaModel`]:
//!
//! 1. merge `extend type` blocks and index every declaration by name
//! 2. assign arena ids to node types, interfaces, unions and
//!    relationship-properties types
//! 3. build attributes and relationships (targets resolved, never dangling)
//! 4. build interfaces/unions and back-link their member entities
//! 5. link interface relationship declarations to their implementations
//! 6. run the whole-model validation pass
//!
//! Any failure aborts the build; no partial model escapes.

use once_cell::sync::OnceCell;
use std::collections::HashMap;

use super::annotations::Annotations;
use super::attribute::{Attribute, AttributeFlags, AttributeKind, AttributeType, ScalarType};
use super::declaration_origin::{DeclarationOriginResolver, InterfaceConflictPolicy};
use super::definitions::{
    parse_type_ref, FieldDefinition, ObjectTypeDefinition, TypeDefinition, TypeDefinitionDocument,
    TypeRef,
};
use super::entity::{CompositeEntity, ConcreteEntity, InterfaceEntity, UnionEntity};
use super::errors::SchemaValidationError;
use super::model::{
    CompositeEntityId, ConcreteEntityId, EntityRef, Neo4jGraphQLSchemaModel,
    RelationshipPropertiesId,
};
use super::operation::{Operation, OperationType};
use super::relationship::{
    Cardinality, Relationship, RelationshipDeclaration, RelationshipProperties, RelationshipRef,
};
use super::validation::validate_model;

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaBuildOptions {
    pub interface_conflict_policy: InterfaceConflictPolicy,
}

/// Build a schema model from a type-definition document.
pub fn build_schema_model(
    document: TypeDefinitionDocument,
    options: &SchemaBuildOptions,
) -> Result<Neo4jGraphQLSchemaModel, SchemaValidationError> {
    let document = document.merge_extensions()?;
    let model = SchemaModelBuilder::new(&document, *options)?.build()?;
    log::info!(
        "Built schema model: {} node types, {} interfaces/unions",
        model.concrete_entities.len(),
        model.composite_entities.len()
    );
    Ok(model)
}

/// What a named type in a field position resolves to.
#[derive(Debug, Clone, Copy)]
enum NamedType {
    Scalar(ScalarType),
    Enum,
    Concrete(ConcreteEntityId),
    Composite(CompositeEntityId),
    RelationshipProperties,
    PlainObject,
}

pub struct SchemaModelBuilder<'d> {
    options: SchemaBuildOptions,
    definitions: HashMap<&'d str, &'d TypeDefinition>,
    ordered: Vec<&'d TypeDefinition>,
    concrete_ids: HashMap<&'d str, ConcreteEntityId>,
    composite_ids: HashMap<&'d str, CompositeEntityId>,
    properties_ids: HashMap<&'d str, RelationshipPropertiesId>,
}

impl<'d> SchemaModelBuilder<'d> {
    pub fn new(
        document: &'d TypeDefinitionDocument,
        options: SchemaBuildOptions,
    ) -> Result<Self, SchemaValidationError> {
        let mut definitions = HashMap::new();
        let mut ordered = Vec::new();
        let mut concrete_ids = HashMap::new();
        let mut composite_ids = HashMap::new();
        let mut properties_ids = HashMap::new();

        for definition in &document.types {
            let name = definition.name();
            if definitions.insert(name, definition).is_some() {
                return Err(SchemaValidationError::DuplicateType {
                    type_name: name.to_string(),
                });
            }
            ordered.push(definition);
            match definition {
                TypeDefinition::Object(def) if def.has_directive("node") => {
                    concrete_ids.insert(name, ConcreteEntityId(concrete_ids.len()));
                }
                TypeDefinition::Object(def) if def.has_directive("relationshipProperties") => {
                    properties_ids.insert(name, RelationshipPropertiesId(properties_ids.len()));
                }
                TypeDefinition::Interface(_) | TypeDefinition::Union(_) => {
                    composite_ids.insert(name, CompositeEntityId(composite_ids.len()));
                }
                _ => {}
            }
        }

        Ok(SchemaModelBuilder {
            options,
            definitions,
            ordered,
            concrete_ids,
            composite_ids,
            properties_ids,
        })
    }

    pub fn build(self) -> Result<Neo4jGraphQLSchemaModel, SchemaValidationError> {
        let relationship_properties = self.build_relationship_properties()?;
        let mut concrete_entities = self.build_concrete_entities()?;
        let mut composite_entities = self.build_composite_entities()?;

        link_composites(&mut concrete_entities, &composite_entities);
        link_declarations(&mut concrete_entities, &mut composite_entities)?;

        let operations = self.build_operations()?;

        let mut entity_index = HashMap::new();
        for (name, id) in &self.concrete_ids {
            entity_index.insert(name.to_string(), EntityRef::Concrete(*id));
        }
        for (name, id) in &self.composite_ids {
            entity_index.insert(name.to_string(), EntityRef::Composite(*id));
        }

        let model = Neo4jGraphQLSchemaModel {
            concrete_entities,
            composite_entities,
            relationship_properties,
            entity_index,
            operations,
        };
        validate_model(&model)?;
        Ok(model)
    }

    fn resolve_named(&self, name: &str) -> Option<NamedType> {
        if let Some(scalar) = ScalarType::from_name(name) {
            return Some(NamedType::Scalar(scalar));
        }
        if let Some(id) = self.concrete_ids.get(name) {
            return Some(NamedType::Concrete(*id));
        }
        if let Some(id) = self.composite_ids.get(name) {
            return Some(NamedType::Composite(*id));
        }
        if self.properties_ids.contains_key(name) {
            return Some(NamedType::RelationshipProperties);
        }
        match self.definitions.get(name) {
            Some(TypeDefinition::Enum(_)) => Some(NamedType::Enum),
            Some(TypeDefinition::Object(_)) => Some(NamedType::PlainObject),
            _ => None,
        }
    }

    fn object_definitions(&self) -> impl Iterator<Item = &'d ObjectTypeDefinition> + '_ {
        self.ordered.iter().copied().filter_map(|d| match d {
            TypeDefinition::Object(def) => Some(def),
            _ => None,
        })
    }

    fn check_duplicate_fields(def: &ObjectTypeDefinition) -> Result<(), SchemaValidationError> {
        for (i, field) in def.fields.iter().enumerate() {
            if def.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaValidationError::DuplicateField {
                    type_name: def.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn build_relationship_properties(
        &self,
    ) -> Result<Vec<RelationshipProperties>, SchemaValidationError> {
        let mut built = Vec::with_capacity(self.properties_ids.len());
        for def in self.object_definitions() {
            if !self.properties_ids.contains_key(def.name.as_str()) {
                continue;
            }
            Self::check_duplicate_fields(def)?;
            let mut attributes = Vec::new();
            for field in &def.fields {
                let location = format!("{}.{}", def.name, field.name);
                let annotations = Annotations::from_directives(&field.directives, &location)?;
                let type_ref = parse_type_ref(&field.type_ref)?;
                attributes.push(self.build_attribute(&def.name, field, &type_ref, annotations, false)?);
            }
            built.push(RelationshipProperties {
                name: def.name.clone(),
                attributes,
            });
        }
        Ok(built)
    }

    fn build_concrete_entities(&self) -> Result<Vec<ConcreteEntity>, SchemaValidationError> {
        let resolver = DeclarationOriginResolver::new(
            &self.definitions,
            self.options.interface_conflict_policy,
        );
        let mut built = Vec::with_capacity(self.concrete_ids.len());

        for def in self.object_definitions() {
            let id = match self.concrete_ids.get(def.name.as_str()) {
                Some(id) => *id,
                None => continue,
            };
            Self::check_duplicate_fields(def)?;
            for interface in &def.implements {
                match self.definitions.get(interface.as_str()) {
                    Some(TypeDefinition::Interface(_)) => {}
                    _ => {
                        return Err(SchemaValidationError::unresolved_with_context(
                            interface.clone(),
                            format!("implements-list of `{}`", def.name),
                        ))
                    }
                }
            }

            let annotations = Annotations::from_directives(&def.directives, &def.name)?;
            let labels = annotations
                .node
                .as_ref()
                .and_then(|n| n.labels.clone())
                .filter(|labels| !labels.is_empty())
                .unwrap_or_else(|| vec![def.name.clone()]);

            let mut attributes = Vec::new();
            let mut relationships = Vec::new();
            for field in &def.fields {
                let location = format!("{}.{}", def.name, field.name);
                let field_annotations = Annotations::from_directives(&field.directives, &location)?;
                let type_ref = parse_type_ref(&field.type_ref)?;
                if field_annotations.relationship.is_some() {
                    let mut relationship =
                        self.build_relationship(id, &def.name, field, &type_ref, field_annotations)?;
                    if let Some(origin) = resolver.resolve(&def.name, &field.name, &def.implements)? {
                        relationship.first_declared_in = Some(origin.interface);
                        relationship.original_target = Some(origin.target);
                    }
                    relationships.push(relationship);
                } else {
                    attributes.push(self.build_attribute(
                        &def.name,
                        field,
                        &type_ref,
                        field_annotations,
                        false,
                    )?);
                }
            }

            built.push(ConcreteEntity {
                id,
                name: def.name.clone(),
                labels,
                attributes,
                relationships,
                composite_entities: Vec::new(),
                annotations,
                naming: OnceCell::new(),
            });
        }
        Ok(built)
    }

    fn build_attribute(
        &self,
        owner: &str,
        field: &FieldDefinition,
        type_ref: &TypeRef,
        annotations: Annotations,
        root_field: bool,
    ) -> Result<Attribute, SchemaValidationError> {
        let named = type_ref.named_type();
        let resolved = self.resolve_named(named).ok_or_else(|| {
            SchemaValidationError::unresolved_with_context(
                named,
                format!("field `{}.{}`", owner, field.name),
            )
        })?;
        let computed = annotations.cypher.is_some() || annotations.custom_resolver.is_some();

        let mut cypher_target = None;
        let kind = match resolved {
            NamedType::Scalar(scalar) => AttributeKind::Scalar(scalar),
            NamedType::Enum => AttributeKind::Enum(named.to_string()),
            NamedType::Concrete(id) => {
                if !computed && !root_field {
                    return Err(SchemaValidationError::MissingRelationshipDirective {
                        type_name: owner.to_string(),
                        field: field.name.clone(),
                        target: named.to_string(),
                    });
                }
                if annotations.cypher.is_some() {
                    cypher_target = Some(id);
                }
                AttributeKind::Object(named.to_string())
            }
            NamedType::Composite(_) => {
                if annotations.cypher.is_some() {
                    return Err(SchemaValidationError::InvalidCypherTarget {
                        type_name: owner.to_string(),
                        field: field.name.clone(),
                        target: named.to_string(),
                    });
                }
                if !computed && !root_field {
                    return Err(SchemaValidationError::MissingRelationshipDirective {
                        type_name: owner.to_string(),
                        field: field.name.clone(),
                        target: named.to_string(),
                    });
                }
                AttributeKind::Object(named.to_string())
            }
            NamedType::RelationshipProperties | NamedType::PlainObject => {
                if !computed && !root_field {
                    return Err(SchemaValidationError::directive_error_with_context(
                        "cypher",
                        format!("{}.{}", owner, field.name),
                        "object-typed fields need @cypher or @customResolver",
                    ));
                }
                AttributeKind::Object(named.to_string())
            }
        };

        let database_name = annotations
            .alias
            .as_ref()
            .map(|a| a.property.clone())
            .unwrap_or_else(|| field.name.clone());
        let unique = annotations.id.is_some() || annotations.unique.is_some();
        let flags = AttributeFlags {
            autogenerated: annotations.id.as_ref().map(|id| id.autogenerate).unwrap_or(false)
                || annotations.timestamp.is_some(),
            unique,
            identifying: unique,
        };

        Ok(Attribute {
            name: field.name.clone(),
            attribute_type: AttributeType {
                kind,
                is_list: type_ref.is_list(),
                is_required: type_ref.is_required(),
                list_items_required: type_ref.list_items_required(),
            },
            database_name,
            flags,
            annotations,
            cypher_target,
        })
    }

    fn resolve_entity_target(
        &self,
        owner: &str,
        field: &FieldDefinition,
        type_ref: &TypeRef,
    ) -> Result<EntityRef, SchemaValidationError> {
        let named = type_ref.named_type();
        match self.resolve_named(named) {
            Some(NamedType::Concrete(id)) => Ok(EntityRef::Concrete(id)),
            Some(NamedType::Composite(id)) => Ok(EntityRef::Composite(id)),
            _ => Err(SchemaValidationError::unresolved_with_context(
                named,
                format!("relationship `{}.{}`", owner, field.name),
            )),
        }
    }

    fn build_relationship(
        &self,
        source: ConcreteEntityId,
        owner: &str,
        field: &FieldDefinition,
        type_ref: &TypeRef,
        mut annotations: Annotations,
    ) -> Result<Relationship, SchemaValidationError> {
        let target = self.resolve_entity_target(owner, field, type_ref)?;
        let directive = annotations.relationship.take().ok_or_else(|| {
            SchemaValidationError::directive_error_with_context(
                "relationship",
                format!("{}.{}", owner, field.name),
                "missing",
            )
        })?;

        let properties = match &directive.properties {
            Some(name) => match self.properties_ids.get(name.as_str()) {
                Some(id) => Some(*id),
                None if self.definitions.contains_key(name.as_str()) => {
                    return Err(SchemaValidationError::InvalidRelationshipProperties {
                        type_name: owner.to_string(),
                        field: field.name.clone(),
                        properties: name.clone(),
                    })
                }
                None => {
                    return Err(SchemaValidationError::unresolved_with_context(
                        name.clone(),
                        format!("properties of `{}.{}`", owner, field.name),
                    ))
                }
            },
            None => None,
        };

        Ok(Relationship {
            name: field.name.clone(),
            source,
            target,
            rel_type: directive.rel_type,
            direction: directive.direction,
            cardinality: Cardinality {
                is_list: type_ref.is_list(),
                is_required: type_ref.is_required(),
            },
            nested_operations: directive.nested_operations,
            aggregate: directive.aggregate,
            properties,
            first_declared_in: None,
            original_target: None,
            siblings: Vec::new(),
            annotations,
        })
    }

    /// Whether `type_name` implements `interface`, directly or through
    /// another interface.
    fn implements_transitively(&self, type_name: &str, interface: &str, depth: usize) -> bool {
        if depth > self.definitions.len() {
            return false;
        }
        let implements = match self.definitions.get(type_name) {
            Some(TypeDefinition::Object(def)) | Some(TypeDefinition::Interface(def)) => {
                &def.implements
            }
            _ => return false,
        };
        implements.iter().any(|i| {
            i == interface || self.implements_transitively(i, interface, depth + 1)
        })
    }

    fn build_composite_entities(&self) -> Result<Vec<CompositeEntity>, SchemaValidationError> {
        let mut built = Vec::with_capacity(self.composite_ids.len());
        let mut concrete_by_id: Vec<(&str, ConcreteEntityId)> =
            self.concrete_ids.iter().map(|(n, id)| (*n, *id)).collect();
        concrete_by_id.sort_by_key(|(_, id)| *id);

        for definition in &self.ordered {
            match definition {
                TypeDefinition::Interface(def) => {
                    let id = self.composite_ids[def.name.as_str()];
                    built.push(CompositeEntity::Interface(self.build_interface(
                        id,
                        def,
                        &concrete_by_id,
                    )?));
                }
                TypeDefinition::Union(def) => {
                    let id = self.composite_ids[def.name.as_str()];
                    let mut members = Vec::new();
                    for member in &def.members {
                        match self.concrete_ids.get(member.as_str()) {
                            Some(member_id) => members.push(*member_id),
                            None => {
                                return Err(SchemaValidationError::unresolved_with_context(
                                    member.clone(),
                                    format!("union `{}`", def.name),
                                ))
                            }
                        }
                    }
                    built.push(CompositeEntity::Union(UnionEntity {
                        id,
                        name: def.name.clone(),
                        concrete_entities: members,
                        annotations: Annotations::from_directives(&def.directives, &def.name)?,
                        naming: OnceCell::new(),
                    }));
                }
                _ => {}
            }
        }
        Ok(built)
    }

    fn build_interface(
        &self,
        id: CompositeEntityId,
        def: &ObjectTypeDefinition,
        concrete_by_id: &[(&str, ConcreteEntityId)],
    ) -> Result<InterfaceEntity, SchemaValidationError> {
        Self::check_duplicate_fields(def)?;
        let concrete_entities: Vec<ConcreteEntityId> = concrete_by_id
            .iter()
            .filter(|(name, _)| self.implements_transitively(name, &def.name, 0))
            .map(|(_, id)| *id)
            .collect();

        let mut attributes = Vec::new();
        let mut relationship_declarations = Vec::new();
        for field in &def.fields {
            let location = format!("{}.{}", def.name, field.name);
            let annotations = Annotations::from_directives(&field.directives, &location)?;
            let type_ref = parse_type_ref(&field.type_ref)?;
            let is_entity_typed = matches!(
                self.resolve_named(type_ref.named_type()),
                Some(NamedType::Concrete(_)) | Some(NamedType::Composite(_))
            );
            let is_declaration = annotations.declare_relationship
                || annotations.relationship.is_some()
                || (is_entity_typed
                    && annotations.cypher.is_none()
                    && annotations.custom_resolver.is_none());
            if is_declaration {
                let target = self.resolve_entity_target(&def.name, field, &type_ref)?;
                relationship_declarations.push(RelationshipDeclaration {
                    name: field.name.clone(),
                    source: id,
                    target,
                    cardinality: Cardinality {
                        is_list: type_ref.is_list(),
                        is_required: type_ref.is_required(),
                    },
                    implementations: Vec::new(),
                    annotations,
                });
            } else {
                attributes.push(self.build_attribute(&def.name, field, &type_ref, annotations, false)?);
            }
        }

        Ok(InterfaceEntity {
            id,
            name: def.name.clone(),
            concrete_entities,
            attributes,
            relationship_declarations,
            annotations: Annotations::from_directives(&def.directives, &def.name)?,
            naming: OnceCell::new(),
        })
    }

    fn build_operations(&self) -> Result<Vec<Operation>, SchemaValidationError> {
        let mut operations = Vec::new();
        for operation_type in [OperationType::Query, OperationType::Mutation] {
            let def = match self.definitions.get(operation_type.type_name()) {
                Some(TypeDefinition::Object(def)) => def,
                _ => continue,
            };
            Self::check_duplicate_fields(def)?;
            let mut user_resolved_attributes = Vec::new();
            let mut custom_resolved_attributes = Vec::new();
            for field in &def.fields {
                let location = format!("{}.{}", def.name, field.name);
                let annotations = Annotations::from_directives(&field.directives, &location)?;
                let type_ref = parse_type_ref(&field.type_ref)?;
                let attribute = self.build_attribute(&def.name, field, &type_ref, annotations, true)?;
                if attribute.is_cypher() {
                    user_resolved_attributes.push(attribute);
                } else {
                    custom_resolved_attributes.push(attribute);
                }
            }
            operations.push(Operation {
                name: def.name.clone(),
                operation_type,
                user_resolved_attributes,
                custom_resolved_attributes,
            });
        }
        Ok(operations)
    }
}

/// Every concrete entity learns which composites it belongs to.
fn link_composites(concrete_entities: &mut [ConcreteEntity], composites: &[CompositeEntity]) {
    for composite in composites {
        for member in composite.concrete_entities() {
            let entity = &mut concrete_entities[member.0];
            if !entity.composite_entities.contains(&composite.id()) {
                entity.composite_entities.push(composite.id());
            }
        }
    }
}

/// Attach each interface relationship declaration to the matching
/// relationship of every implementing entity, and record siblings that share
/// a properties type.
fn link_declarations(
    concrete_entities: &mut [ConcreteEntity],
    composites: &mut [CompositeEntity],
) -> Result<(), SchemaValidationError> {
    for composite in composites.iter_mut() {
        let interface = match composite {
            CompositeEntity::Interface(interface) => interface,
            CompositeEntity::Union(_) => continue,
        };
        for declaration in interface.relationship_declarations.iter_mut() {
            let mut implementations = Vec::new();
            for member in &interface.concrete_entities {
                let entity = &concrete_entities[member.0];
                if entity.relationship(&declaration.name).is_none() {
                    return Err(SchemaValidationError::MissingRelationshipImplementation {
                        interface: interface.name.clone(),
                        entity: entity.name.clone(),
                        field: declaration.name.clone(),
                    });
                }
                implementations.push(RelationshipRef {
                    entity: *member,
                    name: declaration.name.clone(),
                });
            }

            let properties: Vec<_> = implementations
                .iter()
                .map(|r| {
                    concrete_entities[r.entity.0]
                        .relationship(&r.name)
                        .and_then(|rel| rel.properties)
                })
                .collect();
            for (index, reference) in implementations.iter().enumerate() {
                let siblings: Vec<RelationshipRef> = implementations
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| {
                        *other != index && properties[*other].is_some() && properties[*other] == properties[index]
                    })
                    .map(|(_, r)| r.clone())
                    .collect();
                if let Some(relationship) = concrete_entities[reference.entity.0]
                    .relationships
                    .iter_mut()
                    .find(|r| r.name == reference.name)
                {
                    for sibling in siblings {
                        if !relationship.siblings.contains(&sibling) {
                            relationship.siblings.push(sibling);
                        }
                    }
                }
            }
            declaration.implementations = implementations;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_model::adapters::ConcreteEntityAdapter;
    use crate::schema_model::testing::{auth_model, model_from_yaml, movies_model};

    fn build(yaml: &str) -> Result<Neo4jGraphQLSchemaModel, SchemaValidationError> {
        let document = TypeDefinitionDocument::from_yaml_str(yaml)?;
        build_schema_model(document, &SchemaBuildOptions::default())
    }

    #[test]
    fn test_every_relationship_target_resolves() {
        let model = movies_model();
        for entity in model.concrete_entities() {
            for relationship in &entity.relationships {
                for id in model.concrete_entities_of(relationship.target) {
                    assert!(model.concrete_entities().any(|e| e.id == id));
                }
            }
        }
        let movie = model.concrete_entity_by_name("Movie").unwrap();
        let actors = movie.relationship("actors").unwrap();
        assert_eq!(model.entity_name(actors.target), "Actor");
        assert_eq!(actors.rel_type, "ACTED_IN");
        assert!(actors.properties.is_some());
        assert!(!movie.relationship("director").unwrap().cardinality.is_list);
    }

    #[test]
    fn test_dangling_relationship_target_fails() {
        let err = build(
            r#"
types:
  - kind: object
    name: Movie
    directives: [{ name: node }]
    fields:
      - name: actors
        type: "[Actr!]!"
        directives: [{ name: relationship, arguments: { type: ACTED_IN, direction: IN } }]
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaValidationError::UnresolvedType { ref type_name, .. } if type_name == "Actr"
        ));
    }

    #[test]
    fn test_composites_are_back_linked() {
        let model = movies_model();
        let production = model.composite_entity_by_name("Production").unwrap();
        let search = model.composite_entity_by_name("SearchResult").unwrap();
        let movie = model.concrete_entity_by_name("Movie").unwrap();
        let genre = model.concrete_entity_by_name("Genre").unwrap();

        assert_eq!(production.concrete_entities().len(), 2);
        assert!(movie.composite_entities.contains(&production.id()));
        assert!(movie.composite_entities.contains(&search.id()));
        assert_eq!(genre.composite_entities, vec![search.id()]);
    }

    #[test]
    fn test_declaration_implementations_and_siblings() {
        let model = movies_model();
        let production = model.composite_entity_by_name("Production").unwrap();
        let declaration = production.relationship_declaration("actors").unwrap();
        assert_eq!(declaration.implementations.len(), 2);
        for implementation in &declaration.implementations {
            let relationship = model.relationship(implementation).unwrap();
            assert_eq!(relationship.first_declared_in.as_deref(), Some("Production"));
            assert_eq!(relationship.original_target.as_deref(), Some("Actor"));
            assert_eq!(relationship.siblings.len(), 1);
        }
    }

    #[test]
    fn test_missing_declaration_implementation_fails() {
        let err = build(
            r#"
types:
  - kind: interface
    name: Production
    fields:
      - name: actors
        type: "[Actor!]!"
        directives: [{ name: declareRelationship }]
  - kind: object
    name: Movie
    implements: [Production]
    directives: [{ name: node }]
    fields:
      - { name: title, type: String }
  - kind: object
    name: Actor
    directives: [{ name: node }]
    fields:
      - { name: name, type: String }
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaValidationError::MissingRelationshipImplementation { .. }
        ));
    }

    #[test]
    fn test_plural_collision_fails() {
        let err = build(
            r#"
types:
  - kind: object
    name: Movie
    directives: [{ name: node }]
    fields: [{ name: title, type: String }]
  - kind: object
    name: Film
    directives: [{ name: node }, { name: plural, arguments: { value: movies } }]
    fields: [{ name: title, type: String }]
"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaValidationError::PluralCollision {
                first: "Movie".to_string(),
                second: "Film".to_string(),
                plural: "movies".to_string(),
            }
        );
    }

    #[test]
    fn test_alias_colliding_with_canonical_field_fails() {
        let err = build(
            r#"
types:
  - kind: object
    name: Movie
    directives: [{ name: node }]
    fields:
      - { name: title, type: String }
      - name: name
        type: String
        directives: [{ name: alias, arguments: { property: title } }]
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaValidationError::AmbiguousAlias { ref field, ref other, .. }
                if field == "name" && other == "title"
        ));
    }

    #[test]
    fn test_alias_naming_another_field_fails() {
        let err = build(
            r#"
types:
  - kind: object
    name: Movie
    directives: [{ name: node }]
    fields:
      - name: title
        type: String
        directives: [{ name: alias, arguments: { property: name } }]
      - name: name
        type: String
        directives: [{ name: alias, arguments: { property: label } }]
"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaValidationError::AmbiguousAlias {
                type_name: "Movie".to_string(),
                field: "title".to_string(),
                alias: "name".to_string(),
                other: "name".to_string(),
            }
        );
    }

    #[test]
    fn test_cypher_field_targeting_interface_fails() {
        let err = build(
            r#"
types:
  - kind: interface
    name: Production
    fields: [{ name: title, type: String }]
  - kind: object
    name: Movie
    implements: [Production]
    directives: [{ name: node }]
    fields:
      - { name: title, type: String }
      - name: related
        type: "[Production!]!"
        directives:
          - name: cypher
            arguments: { statement: "MATCH (this)--(p) RETURN p", columnName: p }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaValidationError::InvalidCypherTarget { .. }));
    }

    #[test]
    fn test_cypher_field_targeting_node_is_resolved() {
        let model = movies_model();
        let movie = model.concrete_entity_by_name("Movie").unwrap();
        let actor = model.concrete_entity_by_name("Actor").unwrap();
        assert_eq!(movie.attribute("topActor").unwrap().cypher_target, Some(actor.id));
        assert!(movie.attribute("actorCount").unwrap().cypher_target.is_none());
    }

    #[test]
    fn test_properties_type_must_be_annotated() {
        let err = build(
            r#"
types:
  - kind: object
    name: Movie
    directives: [{ name: node }]
    fields:
      - name: actors
        type: "[Actor!]!"
        directives:
          - name: relationship
            arguments: { type: ACTED_IN, direction: IN, properties: Actor }
  - kind: object
    name: Actor
    directives: [{ name: node }]
    fields: [{ name: name, type: String }]
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaValidationError::InvalidRelationshipProperties { .. }
        ));
    }

    #[test]
    fn test_entity_field_without_relationship_directive_fails() {
        let err = build(
            r#"
types:
  - kind: object
    name: Movie
    directives: [{ name: node }]
    fields: [{ name: director, type: Person }]
  - kind: object
    name: Person
    directives: [{ name: node }]
    fields: [{ name: name, type: String }]
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaValidationError::MissingRelationshipDirective { .. }
        ));
    }

    #[test]
    fn test_labels_alias_and_flags() {
        let model = movies_model();
        let person = model.concrete_entity_by_name("Person").unwrap();
        assert_eq!(person.labels, vec!["Person", "Director"]);

        let movie_id = model.concrete_entity_by_name("Movie").unwrap().id;
        let movie = ConcreteEntityAdapter::new(&model, movie_id);
        assert_eq!(movie.attribute("tagline").unwrap().database_name(), "tag_line");
        assert!(movie.attribute("id").unwrap().attribute.flags.identifying);
        assert_eq!(movie.naming().create_field, "createMovies");
    }

    #[test]
    fn test_extension_authorization_is_merged() {
        let model = auth_model();
        let user = model.concrete_entity_by_name("User").unwrap();
        let authorization = user.annotations.authorization.as_ref().unwrap();
        assert_eq!(authorization.validate.len(), 1);
        let password = user.attribute("password").unwrap();
        assert!(password.annotations.authorization.is_some());
    }

    #[test]
    fn test_root_operations() {
        let model = movies_model();
        let query = model.operation(OperationType::Query).unwrap();
        assert!(query.user_resolved_attribute("topMovies").is_some());
        assert!(model.operation(OperationType::Mutation).is_none());
    }

    #[test]
    fn test_reject_policy_surfaces_diamond() {
        let yaml = r#"
types:
  - kind: interface
    name: Left
    fields: [{ name: owner, type: Person, directives: [{ name: declareRelationship }] }]
  - kind: interface
    name: Right
    fields: [{ name: owner, type: Person, directives: [{ name: declareRelationship }] }]
  - kind: object
    name: Thing
    implements: [Left, Right]
    directives: [{ name: node }]
    fields:
      - name: owner
        type: Person
        directives: [{ name: relationship, arguments: { type: OWNS, direction: IN } }]
  - kind: object
    name: Person
    directives: [{ name: node }]
    fields: [{ name: name, type: String }]
"#;
        let lenient = model_from_yaml(yaml);
        let thing = lenient.concrete_entity_by_name("Thing").unwrap();
        assert_eq!(
            thing.relationship("owner").unwrap().first_declared_in.as_deref(),
            Some("Right")
        );

        let document = TypeDefinitionDocument::from_yaml_str(yaml).unwrap();
        let options = SchemaBuildOptions {
            interface_conflict_policy: InterfaceConflictPolicy::Reject,
        };
        assert!(matches!(
            build_schema_model(document, &options),
            Err(SchemaValidationError::AmbiguousRelationshipDeclaration { .. })
        ));
    }
}
