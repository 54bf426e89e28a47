//! Read-only views over the schema model.
//!
//! Adapters borrow the model and derive what translation needs from it:
//! generated names, labels, filterable and aggregable shapes. Derived
//! naming is memoised on the entity in a write-once cell, so the model
//! stays shareable while every name is computed at most once.

mod attribute_adapter;
mod entity_adapter;
mod relationship_adapter;

pub use attribute_adapter::{AttributeAdapter, FilterOperator};
pub use entity_adapter::{CompositeEntityAdapter, ConcreteEntityAdapter, EntityAdapter};
pub use relationship_adapter::RelationshipAdapter;

use crate::utils::naming::{plural_field_name, upper_first};

/// Root field names generated for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityNaming {
    pub plural: String,
    pub connection_field: String,
    pub aggregate_field: String,
    pub create_field: String,
    pub update_field: String,
    pub delete_field: String,
}

impl EntityNaming {
    pub fn new(type_name: &str, plural_override: Option<&str>) -> Self {
        let plural = plural_field_name(type_name, plural_override);
        let upper = upper_first(&plural);
        EntityNaming {
            connection_field: format!("{}Connection", plural),
            aggregate_field: format!("{}Aggregate", plural),
            create_field: format!("create{}", upper),
            update_field: format!("update{}", upper),
            delete_field: format!("delete{}", upper),
            plural,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_naming() {
        let naming = EntityNaming::new("Movie", None);
        assert_eq!(naming.plural, "movies");
        assert_eq!(naming.connection_field, "moviesConnection");
        assert_eq!(naming.aggregate_field, "moviesAggregate");
        assert_eq!(naming.create_field, "createMovies");
        assert_eq!(naming.update_field, "updateMovies");
        assert_eq!(naming.delete_field, "deleteMovies");
    }
}
