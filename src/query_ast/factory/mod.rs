//! Request → operation tree.
//!
//! The factory matches the root field against the names the schema
//! generates (`movies`, `createMovies`, ...), then recurses through the
//! selection. Predicates are built by [`filter_factory::FilterFactory`];
//! authorization is woven in afterwards by `authorization::weave`.

pub mod filter_factory;
mod mutation_factory;
mod read_factory;
pub mod sort_factory;

use filter_factory::FilterFactory;

use super::context::TranslationContext;
use super::errors::TranslationError;
use super::operations::QueryOperation;
use super::resolve_tree::ResolveTree;
use crate::schema_model::adapters::{CompositeEntityAdapter, ConcreteEntityAdapter, EntityAdapter};
use crate::schema_model::attribute::Attribute;
use crate::schema_model::{Neo4jGraphQLSchemaModel, OperationType};

/// What a root field name refers to.
enum RootField<'a> {
    Read(ConcreteEntityAdapter<'a>),
    CompositeRead(CompositeEntityAdapter<'a>),
    Connection(EntityAdapter<'a>),
    Aggregate(EntityAdapter<'a>),
    Create(ConcreteEntityAdapter<'a>),
    Update(ConcreteEntityAdapter<'a>),
    Delete(ConcreteEntityAdapter<'a>),
    Cypher(&'a Attribute),
}

pub struct QueryAstFactory<'a> {
    model: &'a Neo4jGraphQLSchemaModel,
    context: &'a TranslationContext,
    filters: FilterFactory<'a>,
}

impl<'a> QueryAstFactory<'a> {
    pub fn new(model: &'a Neo4jGraphQLSchemaModel, context: &'a TranslationContext) -> Self {
        QueryAstFactory {
            model,
            context,
            filters: FilterFactory::new(model),
        }
    }

    pub fn create_query_ast(&self, tree: &ResolveTree) -> Result<QueryOperation, TranslationError> {
        let max_depth = self.context.config.max_selection_depth;
        if tree.depth() > max_depth {
            return Err(TranslationError::invalid_argument_with_context(
                tree.name.as_str(),
                format!("selection is nested deeper than {} levels", max_depth),
            ));
        }

        let root = self
            .resolve_root(&tree.name)?
            .ok_or_else(|| TranslationError::UnknownRootField(tree.name.clone()))?;
        let operation = match root {
            RootField::Read(entity) => QueryOperation::Read(self.read(entity, None, tree)?),
            RootField::CompositeRead(composite) => {
                QueryOperation::CompositeRead(self.composite_read(composite, None, tree)?)
            }
            RootField::Connection(entity) => QueryOperation::Connection(self.connection(entity, None, tree)?),
            RootField::Aggregate(entity) => QueryOperation::Aggregate(self.aggregate(entity, None, tree)?),
            RootField::Create(entity) => self.create(entity, tree)?,
            RootField::Update(entity) => QueryOperation::Update(self.update(entity, tree)?),
            RootField::Delete(entity) => QueryOperation::Delete(self.delete(entity, tree)?),
            RootField::Cypher(attribute) => QueryOperation::CustomCypher(self.custom_cypher(attribute, tree)?),
        };
        log::debug!("`{}` built as {} operation", tree.name, operation.kind());
        Ok(operation)
    }

    fn resolve_root(&self, name: &str) -> Result<Option<RootField<'a>>, TranslationError> {
        for entity in self.model.concrete_entities() {
            let entity = ConcreteEntityAdapter::new(self.model, entity.id);
            let naming = entity.naming();
            let root = if name == naming.plural {
                RootField::Read(entity)
            } else if name == naming.connection_field {
                RootField::Connection(EntityAdapter::Concrete(entity))
            } else if name == naming.aggregate_field {
                RootField::Aggregate(EntityAdapter::Concrete(entity))
            } else if name == naming.create_field {
                RootField::Create(entity)
            } else if name == naming.update_field {
                RootField::Update(entity)
            } else if name == naming.delete_field {
                RootField::Delete(entity)
            } else {
                continue;
            };
            return Ok(Some(root));
        }

        for composite in self.model.composite_entities() {
            let composite = CompositeEntityAdapter::new(self.model, composite.id());
            let naming = composite.naming();
            if name == naming.plural {
                return Ok(Some(RootField::CompositeRead(composite)));
            }
            if name == naming.connection_field && !composite.is_union() {
                return Ok(Some(RootField::Connection(EntityAdapter::Composite(composite))));
            }
            if name == naming.aggregate_field && !composite.is_union() {
                return Ok(Some(RootField::Aggregate(EntityAdapter::Composite(composite))));
            }
        }

        for operation_type in [OperationType::Query, OperationType::Mutation] {
            let operation = match self.model.operation(operation_type) {
                Some(operation) => operation,
                None => continue,
            };
            if let Some(attribute) = operation.user_resolved_attribute(name) {
                return Ok(Some(RootField::Cypher(attribute)));
            }
            if operation.is_custom_resolved(name) {
                return Err(TranslationError::UnsupportedOperation(format!(
                    "`{}.{}` is resolved outside the database",
                    operation.name, name
                )));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::schema_model::testing::movies_model;
    use serde_json::json;
    use test_case::test_case;

    fn tree(name: &str) -> ResolveTree {
        ResolveTree {
            fields: vec![ResolveTree::new("title")],
            ..ResolveTree::new(name)
        }
    }

    #[test_case("movies", "read"; "plural")]
    #[test_case("moviesConnection", "connection"; "connection")]
    #[test_case("moviesAggregate", "aggregate"; "aggregate")]
    #[test_case("productions", "composite read"; "interface plural")]
    #[test_case("topMovies", "custom cypher"; "query cypher field")]
    #[test_case("deleteMovies", "delete"; "delete")]
    fn test_root_field_dispatch(name: &str, kind: &str) {
        let model = movies_model();
        let context = TranslationContext::default();
        let mut request = tree(name);
        if name.ends_with("Connection") {
            request.fields = vec![ResolveTree::new("totalCount")];
        }
        if name.starts_with("delete") {
            request.fields.clear();
        }
        let operation = QueryAstFactory::new(&model, &context)
            .create_query_ast(&request)
            .unwrap();
        assert_eq!(operation.kind(), kind);
    }

    #[test]
    fn test_unknown_root_field() {
        let model = movies_model();
        let context = TranslationContext::default();
        let err = QueryAstFactory::new(&model, &context)
            .create_query_ast(&tree("films"))
            .unwrap_err();
        assert_eq!(err, TranslationError::UnknownRootField("films".to_string()));
    }

    #[test]
    fn test_aggregate_over_interface_is_unsupported() {
        let model = movies_model();
        let context = TranslationContext::default();
        let request = ResolveTree {
            fields: vec![ResolveTree::new("count")],
            ..ResolveTree::new("productionsAggregate")
        };
        let err = QueryAstFactory::new(&model, &context)
            .create_query_ast(&request)
            .unwrap_err();
        assert!(matches!(err, TranslationError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_selection_depth_is_bounded() {
        let model = movies_model();
        let context = TranslationContext::new(TranslatorConfig {
            max_selection_depth: 2,
            ..TranslatorConfig::default()
        });
        let request: ResolveTree = serde_json::from_value(json!({
            "name": "movies",
            "fields": [{ "name": "actors", "fields": [{ "name": "movies", "fields": [{ "name": "title" }] }] }]
        }))
        .unwrap();
        let err = QueryAstFactory::new(&model, &context)
            .create_query_ast(&request)
            .unwrap_err();
        assert!(matches!(err, TranslationError::InvalidArgument { .. }));
    }
}
