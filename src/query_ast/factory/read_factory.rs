//! Reads: entity lists, interface/union lists, connections, aggregates and
//! `@cypher` fields, together with their projections.

use serde_json::{Map, Value};

use super::sort_factory::{connection_pagination, pagination, sort_argument, sort_fields};
use super::QueryAstFactory;
use crate::query_ast::errors::TranslationError;
use crate::query_ast::fields::{
    AggregationField, AggregationSelection, AttributeField, CypherAttributeField, Field,
};
use crate::query_ast::filters::{Filter, PropertyOwner};
use crate::query_ast::operations::{
    AggregateOperation, AuthorizationFilters, CompositeReadOperation, ConnectionBranch,
    ConnectionReadOperation, ConnectionSelection, CustomCypherOperation, ReadOperation,
};
use crate::query_ast::resolve_tree::ResolveTree;
use crate::query_ast::sort::SortField;
use crate::schema_model::adapters::{
    AttributeAdapter, CompositeEntityAdapter, ConcreteEntityAdapter, EntityAdapter,
    RelationshipAdapter,
};
use crate::schema_model::attribute::Attribute;

/// Arguments that shape the returned nodes of an entity-typed `@cypher`
/// field rather than being passed to its statement.
const SELECTION_ARGUMENTS: &[&str] = &["where", "sort", "options", "limit", "offset"];

fn where_argument<'t>(tree: &'t ResolveTree) -> Result<Option<&'t Map<String, Value>>, TranslationError> {
    match tree.arg("where") {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(TranslationError::invalid_argument_with_context(
            "where",
            "expected an input object",
        )),
    }
}

fn attribute_field(alias: &str, attribute: AttributeAdapter<'_>) -> Field {
    Field::Attribute(AttributeField {
        alias: alias.to_string(),
        field: attribute.name().to_string(),
        property: attribute.database_name().to_string(),
        scalar: attribute.scalar(),
        is_list: attribute.is_list(),
        coalesce: attribute.coalesce_value().cloned(),
    })
}

impl<'a> QueryAstFactory<'a> {
    /// Read of one concrete entity, at the root (`relationship` = `None`)
    /// or across a relationship from the enclosing node.
    pub(crate) fn read(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        relationship: Option<&RelationshipAdapter<'a>>,
        tree: &ResolveTree,
    ) -> Result<ReadOperation, TranslationError> {
        let filters = match where_argument(tree)? {
            Some(where_) => self.filters.node_filters(entity, where_)?,
            None => Vec::new(),
        };
        self.read_with_filters(entity, relationship, tree, filters)
    }

    fn read_with_filters(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        relationship: Option<&RelationshipAdapter<'a>>,
        tree: &ResolveTree,
        filters: Vec<Filter>,
    ) -> Result<ReadOperation, TranslationError> {
        let sort = match sort_argument(tree) {
            Some(sort) => sort_fields(PropertyOwner::Node, entity.name(), sort, |name| entity.attribute(name))?,
            None => Vec::new(),
        };
        log::trace!("read {} as `{}`", entity.name(), tree.response_key());
        Ok(ReadOperation {
            alias: tree.response_key().to_string(),
            entity: entity.id(),
            relationship: relationship.map(RelationshipAdapter::reference),
            filters,
            fields: self.node_fields(entity, tree)?,
            sort,
            pagination: pagination(tree)?,
            authorization: AuthorizationFilters::default(),
        })
    }

    /// Read of an interface or union: one branch per implementing type.
    /// A union `where` is keyed by member type and only the keyed members
    /// are read.
    pub(crate) fn composite_read(
        &self,
        composite: CompositeEntityAdapter<'a>,
        relationship: Option<&RelationshipAdapter<'a>>,
        tree: &ResolveTree,
    ) -> Result<CompositeReadOperation, TranslationError> {
        let where_ = where_argument(tree)?;
        let mut branches = Vec::new();
        for entity in composite.concrete_entities() {
            let filters = match where_ {
                None => Vec::new(),
                Some(where_) if composite.is_union() => match where_.get(entity.name()) {
                    Some(Value::Object(member)) => self.filters.node_filters(entity, member)?,
                    Some(_) => {
                        return Err(TranslationError::invalid_argument_with_context(
                            entity.name(),
                            "expected an input object",
                        ))
                    }
                    None if where_.is_empty() => Vec::new(),
                    None => continue,
                },
                Some(where_) => self.filters.node_filters(entity, where_)?,
            };
            let mut branch = self.read_with_filters(entity, relationship, &Self::unpaged(tree), filters)?;
            branch.alias = tree.response_key().to_string();
            branches.push(branch);
        }

        let sort = match sort_argument(tree) {
            Some(sort) => sort_fields(PropertyOwner::Node, composite.name(), sort, |name| composite.attribute(name))?,
            None => Vec::new(),
        };
        Ok(CompositeReadOperation {
            alias: tree.response_key().to_string(),
            composite: composite.id(),
            relationship: relationship.map(RelationshipAdapter::reference),
            branches,
            sort,
            pagination: pagination(tree)?,
        })
    }

    /// The same selection without sort and paging, which the composite
    /// applies once across all branches.
    fn unpaged(tree: &ResolveTree) -> ResolveTree {
        let mut tree = tree.clone();
        for key in ["sort", "options", "limit", "offset"] {
            tree.args.remove(key);
        }
        tree
    }

    pub(crate) fn relationship_read(
        &self,
        relationship: &RelationshipAdapter<'a>,
        tree: &ResolveTree,
    ) -> Result<Field, TranslationError> {
        match relationship.target() {
            EntityAdapter::Concrete(target) => {
                Ok(Field::Read(Box::new(self.read(target, Some(relationship), tree)?)))
            }
            EntityAdapter::Composite(target) => Ok(Field::CompositeRead(Box::new(
                self.composite_read(target, Some(relationship), tree)?,
            ))),
        }
    }

    pub(crate) fn node_fields(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        tree: &ResolveTree,
    ) -> Result<Vec<Field>, TranslationError> {
        let composites: Vec<&str> = entity
            .entity
            .composite_entities
            .iter()
            .map(|id| self.model.composite_entity(*id).name())
            .collect();
        let mut fields = Vec::new();
        for selection in tree.fields_for(entity.name(), &composites) {
            if let Some(field) = self.node_field(entity, selection)? {
                fields.push(field);
            }
        }
        Ok(fields)
    }

    fn node_field(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        selection: &ResolveTree,
    ) -> Result<Option<Field>, TranslationError> {
        let alias = selection.response_key();
        let name = selection.name.as_str();
        if name == "__typename" {
            return Ok(Some(Field::Typename {
                alias: alias.to_string(),
                type_name: entity.name().to_string(),
            }));
        }
        if let Some(attribute) = entity.attribute(name) {
            let declared = attribute.attribute;
            // resolved outside the database
            if declared.is_custom_resolved() {
                return Ok(None);
            }
            if declared.is_cypher() {
                return self.cypher_field(declared, selection).map(Some);
            }
            return Ok(Some(attribute_field(alias, attribute)));
        }
        if let Some(relationship) = entity.relationship(name) {
            return self.relationship_read(&relationship, selection).map(Some);
        }
        if let Some(relationship) = name.strip_suffix("Connection").and_then(|n| entity.relationship(n)) {
            let connection = self.connection(relationship.target(), Some(&relationship), selection)?;
            return Ok(Some(Field::Connection(Box::new(connection))));
        }
        if let Some(relationship) = name.strip_suffix("Aggregate").and_then(|n| entity.relationship(n)) {
            if relationship.is_aggregable() {
                let aggregate = self.aggregate(relationship.target(), Some(&relationship), selection)?;
                return Ok(Some(Field::Aggregate(Box::new(aggregate))));
            }
        }
        Err(TranslationError::unknown_field_with_context(entity.name(), name))
    }

    fn cypher_field(&self, attribute: &'a Attribute, selection: &ResolveTree) -> Result<Field, TranslationError> {
        let cypher = attribute.annotations.cypher.as_ref().ok_or_else(|| {
            TranslationError::UnsupportedOperation(format!("`{}` is not a @cypher field", attribute.name))
        })?;
        let (args, target) = self.cypher_arguments(attribute, selection)?;
        Ok(Field::Cypher(Box::new(CypherAttributeField {
            alias: selection.response_key().to_string(),
            field: attribute.name.clone(),
            statement: cypher.statement.clone(),
            column_name: cypher.column_name.clone(),
            is_list: attribute.attribute_type.is_list,
            args,
            target,
        })))
    }

    /// Statement parameters and, for entity-typed fields, the read that
    /// filters and projects the returned nodes.
    fn cypher_arguments(
        &self,
        attribute: &'a Attribute,
        selection: &ResolveTree,
    ) -> Result<(Map<String, Value>, Option<Box<ReadOperation>>), TranslationError> {
        match attribute.cypher_target {
            None => Ok((selection.args.clone(), None)),
            Some(target) => {
                let target = ConcreteEntityAdapter::new(self.model, target);
                let args = selection
                    .args
                    .iter()
                    .filter(|(key, _)| !SELECTION_ARGUMENTS.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Ok((args, Some(Box::new(self.read(target, None, selection)?))))
            }
        }
    }

    /// A `Query`/`Mutation` root field backed by `@cypher`.
    pub(crate) fn custom_cypher(
        &self,
        attribute: &'a Attribute,
        tree: &ResolveTree,
    ) -> Result<CustomCypherOperation, TranslationError> {
        let cypher = attribute.annotations.cypher.as_ref().ok_or_else(|| {
            TranslationError::UnsupportedOperation(format!("`{}` is not a @cypher field", attribute.name))
        })?;
        let (args, target) = self.cypher_arguments(attribute, tree)?;
        Ok(CustomCypherOperation {
            alias: tree.response_key().to_string(),
            field: attribute.name.clone(),
            statement: cypher.statement.clone(),
            column_name: cypher.column_name.clone(),
            is_list: attribute.attribute_type.is_list,
            args,
            target,
        })
    }

    /// `<plural>Connection` at the root or `<rel>Connection` on a node.
    pub(crate) fn connection(
        &self,
        target: EntityAdapter<'a>,
        relationship: Option<&RelationshipAdapter<'a>>,
        tree: &ResolveTree,
    ) -> Result<ConnectionReadOperation, TranslationError> {
        let where_ = where_argument(tree)?;
        let mut selection = ConnectionSelection::default();
        let mut node_tree = ResolveTree::new("node");
        let mut properties_tree = ResolveTree::new("properties");
        for field in &tree.fields {
            match field.name.as_str() {
                "totalCount" => selection.total_count = Some(field.response_key().to_string()),
                "pageInfo" => selection.page_info = Some(field.response_key().to_string()),
                "edges" => {
                    selection.edges = Some(field.response_key().to_string());
                    for edge_field in &field.fields {
                        match edge_field.name.as_str() {
                            "cursor" => selection.cursor = Some(edge_field.response_key().to_string()),
                            "node" => {
                                selection.node = Some(edge_field.response_key().to_string());
                                node_tree = edge_field.clone();
                            }
                            "properties" if relationship.is_some() => {
                                selection.properties = Some(edge_field.response_key().to_string());
                                properties_tree = edge_field.clone();
                            }
                            "__typename" => {}
                            other => {
                                return Err(TranslationError::unknown_field_with_context(
                                    format!("{}Edge", target.name()),
                                    other,
                                ))
                            }
                        }
                    }
                }
                "__typename" => {}
                other => {
                    return Err(TranslationError::unknown_field_with_context(
                        format!("{}Connection", target.name()),
                        other,
                    ))
                }
            }
        }

        let mut branches = Vec::new();
        for entity in target.concrete_entities() {
            let filters = match (where_, relationship) {
                (None, _) => Vec::new(),
                (Some(where_), Some(relationship)) => {
                    self.filters.connection_where(relationship, entity, where_)?
                }
                (Some(where_), None) => self.filters.node_filters(entity, where_)?,
            };
            branches.push(ConnectionBranch {
                entity: entity.id(),
                filters,
                node_fields: self.node_fields(entity, &node_tree)?,
                authorization: AuthorizationFilters::default(),
            });
        }

        let mut edge_fields = Vec::new();
        if let Some(relationship) = relationship {
            for field in &properties_tree.fields {
                if field.name == "__typename" {
                    continue;
                }
                let attribute = relationship.edge_attribute(&field.name).ok_or_else(|| {
                    TranslationError::unknown_field_with_context(relationship.name(), field.name.as_str())
                })?;
                edge_fields.push(attribute_field(field.response_key(), attribute));
            }
        }

        let sort = self.connection_sort(target, relationship, tree)?;
        let pagination = connection_pagination(tree, !sort.is_empty())?;
        Ok(ConnectionReadOperation {
            alias: tree.response_key().to_string(),
            relationship: relationship.map(RelationshipAdapter::reference),
            branches,
            selection,
            edge_fields,
            sort,
            pagination,
        })
    }

    /// Root connections sort by node fields directly; relationship
    /// connections take `[{ node: {...}, edge: {...} }]`.
    fn connection_sort(
        &self,
        target: EntityAdapter<'a>,
        relationship: Option<&RelationshipAdapter<'a>>,
        tree: &ResolveTree,
    ) -> Result<Vec<SortField>, TranslationError> {
        let sort = match tree.arg("sort") {
            Some(sort) => sort,
            None => return Ok(Vec::new()),
        };
        let node_lookup = |name: &str| match target {
            EntityAdapter::Concrete(entity) => entity.attribute(name),
            EntityAdapter::Composite(composite) => composite.attribute(name),
        };
        let relationship = match relationship {
            None => return sort_fields(PropertyOwner::Node, target.name(), sort, node_lookup),
            Some(relationship) => relationship,
        };
        let items = sort.as_array().cloned().unwrap_or_else(|| vec![sort.clone()]);
        let mut fields = Vec::new();
        for item in &items {
            let item = item.as_object().ok_or_else(|| {
                TranslationError::invalid_argument_with_context("sort", "expected a list of sort inputs")
            })?;
            for (key, value) in item {
                match key.as_str() {
                    "node" => fields.extend(sort_fields(PropertyOwner::Node, target.name(), value, node_lookup)?),
                    "edge" => fields.extend(sort_fields(PropertyOwner::Edge, relationship.name(), value, |name| {
                        relationship.edge_attribute(name)
                    })?),
                    other => {
                        return Err(TranslationError::unknown_field_with_context(
                            relationship.connection_field(),
                            other,
                        ))
                    }
                }
            }
        }
        Ok(fields)
    }

    /// `<plural>Aggregate` at the root or `<rel>Aggregate` on a node.
    pub(crate) fn aggregate(
        &self,
        target: EntityAdapter<'a>,
        relationship: Option<&RelationshipAdapter<'a>>,
        tree: &ResolveTree,
    ) -> Result<AggregateOperation, TranslationError> {
        let entity = match target {
            EntityAdapter::Concrete(entity) => entity,
            EntityAdapter::Composite(composite) => {
                return Err(TranslationError::UnsupportedOperation(format!(
                    "aggregation over interface or union `{}`",
                    composite.name()
                )))
            }
        };
        let filters = match where_argument(tree)? {
            Some(where_) => self.filters.node_filters(entity, where_)?,
            None => Vec::new(),
        };

        let mut operation = AggregateOperation {
            alias: tree.response_key().to_string(),
            entity: entity.id(),
            relationship: relationship.map(RelationshipAdapter::reference),
            filters,
            count: None,
            node_key: None,
            node_fields: Vec::new(),
            edge_key: None,
            edge_fields: Vec::new(),
            authorization: AuthorizationFilters::default(),
        };
        for field in &tree.fields {
            match (field.name.as_str(), relationship) {
                ("count", _) => operation.count = Some(field.response_key().to_string()),
                ("__typename", _) => {}
                ("node", Some(_)) => {
                    operation.node_key = Some(field.response_key().to_string());
                    operation.node_fields = Self::aggregation_fields(entity.name(), field, |n| entity.attribute(n))?;
                }
                ("edge", Some(relationship)) => {
                    operation.edge_key = Some(field.response_key().to_string());
                    operation.edge_fields = Self::aggregation_fields(relationship.name(), field, |n| {
                        relationship.edge_attribute(n)
                    })?;
                }
                (_, None) => {
                    let single = ResolveTree {
                        fields: vec![field.clone()],
                        ..ResolveTree::default()
                    };
                    operation
                        .node_fields
                        .extend(Self::aggregation_fields(entity.name(), &single, |n| entity.attribute(n))?);
                }
                (other, Some(relationship)) => {
                    return Err(TranslationError::unknown_field_with_context(
                        relationship.aggregate_field(),
                        other,
                    ))
                }
            }
        }
        Ok(operation)
    }

    fn aggregation_fields<F>(
        type_name: &str,
        tree: &ResolveTree,
        lookup: F,
    ) -> Result<Vec<AggregationField>, TranslationError>
    where
        F: Fn(&str) -> Option<AttributeAdapter<'a>>,
    {
        let mut fields = Vec::new();
        for field in tree.fields.iter().filter(|f| f.name != "__typename") {
            let attribute = lookup(&field.name)
                .filter(AttributeAdapter::is_aggregable)
                .ok_or_else(|| TranslationError::unknown_field_with_context(type_name, field.name.as_str()))?;
            let is_string = attribute.scalar().map(|s| s.is_string_like()).unwrap_or(false);
            let is_numeric = attribute.scalar().map(|s| s.is_numeric()).unwrap_or(false);
            let mut selections = Vec::new();
            for selection in field.fields.iter().filter(|f| f.name != "__typename") {
                let kind = AggregationSelection::from_field_name(&selection.name)
                    .filter(|kind| match kind {
                        AggregationSelection::Shortest | AggregationSelection::Longest => is_string,
                        AggregationSelection::Average | AggregationSelection::Sum => is_numeric,
                        AggregationSelection::Min | AggregationSelection::Max => !is_string,
                    })
                    .ok_or_else(|| {
                        TranslationError::unknown_field_with_context(
                            format!("{}.{}", type_name, field.name),
                            selection.name.as_str(),
                        )
                    })?;
                selections.push((selection.response_key().to_string(), kind));
            }
            fields.push(AggregationField {
                alias: field.response_key().to_string(),
                field: attribute.name().to_string(),
                property: attribute.database_name().to_string(),
                scalar: attribute.scalar(),
                selections,
            });
        }
        Ok(fields)
    }
}
