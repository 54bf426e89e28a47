//! Whole-model checks that need every entity built first.

use std::collections::HashMap;

use super::adapters::{CompositeEntityAdapter, ConcreteEntityAdapter};
use super::attribute::Attribute;
use super::errors::SchemaValidationError;
use super::model::Neo4jGraphQLSchemaModel;

pub fn validate_model(model: &Neo4jGraphQLSchemaModel) -> Result<(), SchemaValidationError> {
    check_plural_collisions(model)?;
    for entity in model.concrete_entities() {
        check_aliases(&entity.name, &entity.attributes)?;
    }
    for composite in model.composite_entities() {
        check_aliases(composite.name(), composite.attributes())?;
    }
    for properties in &model.relationship_properties {
        check_aliases(&properties.name, &properties.attributes)?;
    }
    Ok(())
}

/// Two entities whose generated root fields would coincide.
fn check_plural_collisions(model: &Neo4jGraphQLSchemaModel) -> Result<(), SchemaValidationError> {
    let mut seen: HashMap<String, String> = HashMap::new();
    let concrete = model
        .concrete_entities()
        .map(|e| ConcreteEntityAdapter::new(model, e.id))
        .map(|a| (a.name().to_string(), a.naming().plural.clone()));
    let composite = model
        .composite_entities()
        .map(|c| CompositeEntityAdapter::new(model, c.id()))
        .map(|a| (a.name().to_string(), a.naming().plural.clone()));

    for (name, plural) in concrete.chain(composite) {
        if let Some(first) = seen.get(&plural) {
            return Err(SchemaValidationError::PluralCollision {
                first: first.clone(),
                second: name,
                plural,
            });
        }
        seen.insert(plural, name);
    }
    Ok(())
}

/// Two persisted attributes writing the same database property, or an
/// `@alias` naming another field of the type.
fn check_aliases(type_name: &str, attributes: &[Attribute]) -> Result<(), SchemaValidationError> {
    let mut by_property: HashMap<&str, &Attribute> = HashMap::new();
    for attribute in attributes.iter().filter(|a| a.is_persisted()) {
        if let Some(other) = by_property.insert(&attribute.database_name, attribute) {
            let (aliased, plain) = if attribute.annotations.alias.is_some() {
                (attribute, other)
            } else {
                (other, attribute)
            };
            return Err(ambiguous_alias(type_name, aliased, plain));
        }
    }

    let by_name: HashMap<&str, &Attribute> = attributes.iter().map(|a| (a.name.as_str(), a)).collect();
    for aliased in attributes.iter().filter(|a| a.annotations.alias.is_some()) {
        match by_name.get(aliased.database_name.as_str()) {
            Some(other) if other.name != aliased.name => {
                return Err(ambiguous_alias(type_name, aliased, other));
            }
            _ => {}
        }
    }
    Ok(())
}

fn ambiguous_alias(type_name: &str, aliased: &Attribute, other: &Attribute) -> SchemaValidationError {
    SchemaValidationError::AmbiguousAlias {
        type_name: type_name.to_string(),
        field: aliased.name.clone(),
        alias: aliased.database_name.clone(),
        other: other.name.clone(),
    }
}
