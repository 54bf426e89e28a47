//! Weaves `@authorization` rules into an operation tree.
//!
//! Every rule of one source (a type, an interface, or a field) is ORed
//! into a single predicate; predicates of different sources are ANDed.
//! Each node's [`AuthorizationFilters`] is merged rather than replaced, and
//! merging drops structurally equal predicates, so weaving a tree twice
//! leaves it unchanged.

use crate::query_ast::factory::filter_factory::FilterFactory;
use crate::query_ast::fields::Field;
use crate::query_ast::filters::Filter;
use crate::query_ast::operations::{
    AggregateOperation, AuthorizationFilters, ConnectionReadOperation, CreateInput,
    MutationProjection, NestedMutation, QueryOperation, ReadOperation, RelationshipMutation,
    UnwindCreateNode,
};
use crate::query_ast::{TranslationContext, TranslationError};
use crate::schema_model::adapters::{CompositeEntityAdapter, ConcreteEntityAdapter};
use crate::schema_model::authorization_annotation::{
    AuthorizationAnnotation, AuthorizationOperation, AuthorizationWhen, AuthorizationWhere,
};
use crate::schema_model::{ConcreteEntityId, Neo4jGraphQLSchemaModel};

/// Which kinds of check an operation is subject to.
#[derive(Debug, Clone, Copy)]
struct Phases {
    filter: bool,
    before: bool,
    after: bool,
}

impl Phases {
    fn of(operation: AuthorizationOperation) -> Self {
        use AuthorizationOperation::*;
        let (filter, before, after) = match operation {
            Read | Aggregate => (true, true, false),
            // the node does not exist before it is created
            Create => (false, false, true),
            Update | CreateRelationship => (true, true, true),
            Delete | DeleteRelationship => (true, true, false),
        };
        Phases { filter, before, after }
    }
}

pub struct AuthorizationWeaver<'a> {
    model: &'a Neo4jGraphQLSchemaModel,
    context: &'a TranslationContext,
    filters: FilterFactory<'a>,
}

impl<'a> AuthorizationWeaver<'a> {
    pub fn new(model: &'a Neo4jGraphQLSchemaModel, context: &'a TranslationContext) -> Self {
        AuthorizationWeaver {
            model,
            context,
            filters: FilterFactory::for_authorization(model),
        }
    }

    pub fn weave(&self, operation: &mut QueryOperation) -> Result<(), TranslationError> {
        if !self.context.config.authorization_enabled {
            log::trace!("authorization disabled, {} left unwoven", operation.kind());
            return Ok(());
        }
        match operation {
            QueryOperation::Read(read) => self.weave_read(read, &[]),
            QueryOperation::CompositeRead(read) => {
                let composite = CompositeEntityAdapter::new(self.model, read.composite);
                let extra: Vec<&AuthorizationAnnotation> = composite.authorization().into_iter().collect();
                read.branches
                    .iter_mut()
                    .try_for_each(|branch| self.weave_read(branch, &extra))
            }
            QueryOperation::Connection(connection) => self.weave_connection(connection),
            QueryOperation::Aggregate(aggregate) => self.weave_aggregate(aggregate),
            QueryOperation::Create(create) => {
                for row in &mut create.rows {
                    self.weave_create_input(row)?;
                }
                self.weave_projection(create.entity, create.projection.as_mut())
            }
            QueryOperation::UnwindCreate(create) => {
                self.weave_unwind_node(&mut create.tree)?;
                self.weave_projection(create.entity, create.projection.as_mut())
            }
            QueryOperation::Update(update) => {
                let written: Vec<&str> = update.writes.iter().map(|w| w.field.as_str()).collect();
                let computed = self.authorization_for(update.entity, AuthorizationOperation::Update, &written, &[])?;
                update.authorization.merge(computed);
                self.weave_relationship_mutations(&mut update.relationships)?;
                self.weave_projection(update.entity, update.projection.as_mut())
            }
            QueryOperation::Delete(delete) => {
                let computed = self.authorization_for(delete.entity, AuthorizationOperation::Delete, &[], &[])?;
                delete.authorization.merge(computed);
                self.weave_relationship_mutations(&mut delete.relationships)
            }
            QueryOperation::CustomCypher(cypher) => match cypher.target.as_mut() {
                Some(target) => self.weave_read(target, &[]),
                None => Ok(()),
            },
        }
    }

    /// Predicates for one entity under one operation. `fields` are the
    /// attributes read or written, whose own rules apply as well; `extra`
    /// are rules inherited from an interface being read.
    fn authorization_for(
        &self,
        entity: ConcreteEntityId,
        operation: AuthorizationOperation,
        fields: &[&str],
        extra: &[&'a AuthorizationAnnotation],
    ) -> Result<AuthorizationFilters, TranslationError> {
        let entity = ConcreteEntityAdapter::new(self.model, entity);
        let phases = Phases::of(operation);

        let mut sources: Vec<&AuthorizationAnnotation> = entity.authorization().into_iter().collect();
        sources.extend(extra.iter().copied());
        for field in fields {
            if let Some(annotation) = entity
                .attribute(field)
                .and_then(|a| a.attribute.annotations.authorization.as_ref())
            {
                sources.push(annotation);
            }
        }

        let mut result = AuthorizationFilters::default();
        for annotation in sources {
            if phases.filter {
                result.filters.extend(self.filter_source(entity, annotation, operation)?);
            }
            if phases.before {
                result
                    .validate_before
                    .extend(self.validate_source(entity, annotation, operation, AuthorizationWhen::Before)?);
            }
            if phases.after {
                result
                    .validate_after
                    .extend(self.validate_source(entity, annotation, operation, AuthorizationWhen::After)?);
            }
        }
        let mut merged = AuthorizationFilters::default();
        merged.merge(result);
        Ok(merged)
    }

    /// ORs the filter rules of one source; `None` when no rule applies or
    /// one of them always holds.
    fn filter_source(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        annotation: &AuthorizationAnnotation,
        operation: AuthorizationOperation,
    ) -> Result<Option<Filter>, TranslationError> {
        let rules: Vec<_> = annotation
            .filter_rules_for(operation)
            .map(|rule| (rule.require_authentication, &rule.where_))
            .collect();
        self.or_rules(entity, &rules)
    }

    fn validate_source(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        annotation: &AuthorizationAnnotation,
        operation: AuthorizationOperation,
        when: AuthorizationWhen,
    ) -> Result<Option<Filter>, TranslationError> {
        let rules: Vec<_> = annotation
            .validate_rules_for(operation, when)
            .map(|rule| (rule.require_authentication, &rule.where_))
            .collect();
        self.or_rules(entity, &rules)
    }

    fn or_rules(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        rules: &[(bool, &AuthorizationWhere)],
    ) -> Result<Option<Filter>, TranslationError> {
        let mut branches = Vec::with_capacity(rules.len());
        for (require_authentication, where_) in rules {
            let mut parts = Vec::new();
            if *require_authentication {
                parts.push(Filter::Authenticated);
            }
            parts.extend(self.rule_where(entity, where_)?);
            match Filter::and(parts) {
                Some(predicate) => branches.push(predicate),
                None => return Ok(None),
            }
        }
        Ok(Filter::or(branches))
    }

    fn rule_where(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        where_: &AuthorizationWhere,
    ) -> Result<Option<Filter>, TranslationError> {
        let invalid = |error: TranslationError| {
            TranslationError::invalid_argument_with_context(
                format!("@authorization on {}", entity.name()),
                error.to_string(),
            )
        };
        let mut parts = Vec::new();
        if let Some(node) = &where_.node {
            parts.extend(self.filters.node_filters(entity, node).map_err(invalid)?);
        }
        if let Some(jwt) = &where_.jwt {
            parts.extend(self.filters.jwt_filters(jwt).map_err(invalid)?);
        }
        for and in &where_.and {
            parts.extend(self.rule_where(entity, and)?);
        }
        if !where_.or.is_empty() {
            let mut branches = Vec::new();
            for or in &where_.or {
                match self.rule_where(entity, or)? {
                    Some(branch) => branches.push(branch),
                    // an empty branch always holds
                    None => {
                        branches.clear();
                        break;
                    }
                }
            }
            parts.extend(Filter::or(branches));
        }
        if let Some(not) = &where_.not {
            parts.extend(self.rule_where(entity, not)?.map(Filter::not));
        }
        Ok(Filter::and(parts))
    }

    fn weave_read(&self, read: &mut ReadOperation, extra: &[&'a AuthorizationAnnotation]) -> Result<(), TranslationError> {
        let selected: Vec<&str> = read.fields.iter().filter_map(Field::attribute_name).collect();
        let computed = self.authorization_for(read.entity, AuthorizationOperation::Read, &selected, extra)?;
        read.authorization.merge(computed);
        self.weave_fields(&mut read.fields)
    }

    fn weave_fields(&self, fields: &mut [Field]) -> Result<(), TranslationError> {
        for field in fields {
            match field {
                Field::Attribute(_) | Field::Typename { .. } => {}
                Field::Read(read) => self.weave_read(read, &[])?,
                Field::CompositeRead(read) => {
                    let composite = CompositeEntityAdapter::new(self.model, read.composite);
                    let extra: Vec<&AuthorizationAnnotation> = composite.authorization().into_iter().collect();
                    for branch in &mut read.branches {
                        self.weave_read(branch, &extra)?;
                    }
                }
                Field::Connection(connection) => self.weave_connection(connection)?,
                Field::Aggregate(aggregate) => self.weave_aggregate(aggregate)?,
                Field::Cypher(cypher) => {
                    if let Some(target) = cypher.target.as_mut() {
                        self.weave_read(target, &[])?;
                    }
                }
            }
        }
        Ok(())
    }

    fn weave_connection(&self, connection: &mut ConnectionReadOperation) -> Result<(), TranslationError> {
        for branch in &mut connection.branches {
            let selected: Vec<&str> = branch.node_fields.iter().filter_map(Field::attribute_name).collect();
            let computed = self.authorization_for(branch.entity, AuthorizationOperation::Read, &selected, &[])?;
            branch.authorization.merge(computed);
            self.weave_fields(&mut branch.node_fields)?;
        }
        Ok(())
    }

    fn weave_aggregate(&self, aggregate: &mut AggregateOperation) -> Result<(), TranslationError> {
        let selected: Vec<&str> = aggregate.node_fields.iter().map(|f| f.field.as_str()).collect();
        let computed = self.authorization_for(aggregate.entity, AuthorizationOperation::Aggregate, &selected, &[])?;
        aggregate.authorization.merge(computed);
        Ok(())
    }

    fn weave_projection(
        &self,
        entity: ConcreteEntityId,
        projection: Option<&mut MutationProjection>,
    ) -> Result<(), TranslationError> {
        let projection = match projection {
            Some(projection) => projection,
            None => return Ok(()),
        };
        let selected: Vec<&str> = projection.fields.iter().filter_map(Field::attribute_name).collect();
        let computed = self.authorization_for(entity, AuthorizationOperation::Read, &selected, &[])?;
        projection.authorization.merge(computed);
        self.weave_fields(&mut projection.fields)
    }

    fn weave_create_input(&self, input: &mut CreateInput) -> Result<(), TranslationError> {
        let written: Vec<&str> = input.writes.iter().map(|w| w.field.as_str()).collect();
        let computed = self.authorization_for(input.entity, AuthorizationOperation::Create, &written, &[])?;
        input.authorization.merge(computed);
        self.weave_relationship_mutations(&mut input.relationships)
    }

    /// Batch creates check AFTER rules per row. Field rules only bind rows
    /// that supply the field, so they are kept apart.
    fn weave_unwind_node(&self, node: &mut UnwindCreateNode) -> Result<(), TranslationError> {
        let entity = ConcreteEntityAdapter::new(self.model, node.entity);
        let mut computed = self.authorization_for(node.entity, AuthorizationOperation::Create, &[], &[])?;
        for property in &node.properties {
            let annotation = match entity
                .attribute(&property.field)
                .and_then(|a| a.attribute.annotations.authorization.as_ref())
            {
                Some(annotation) => annotation,
                None => continue,
            };
            if let Some(predicate) =
                self.validate_source(entity, annotation, AuthorizationOperation::Create, AuthorizationWhen::After)?
            {
                computed.field_validate_after.push((property.field.clone(), predicate));
            }
        }
        node.authorization.merge(computed);
        for relationship in &mut node.relationships {
            self.weave_unwind_node(&mut relationship.node)?;
        }
        Ok(())
    }

    fn weave_relationship_mutations(&self, mutations: &mut [RelationshipMutation]) -> Result<(), TranslationError> {
        for mutation in mutations {
            for operation in &mut mutation.operations {
                self.weave_nested(operation)?;
            }
        }
        Ok(())
    }

    fn weave_nested(&self, operation: &mut NestedMutation) -> Result<(), TranslationError> {
        match operation {
            NestedMutation::Create(create) => self.weave_create_input(&mut create.node),
            NestedMutation::Connect(connect) => {
                let computed =
                    self.authorization_for(connect.entity, AuthorizationOperation::CreateRelationship, &[], &[])?;
                connect.authorization.merge(computed);
                self.weave_relationship_mutations(&mut connect.relationships)
            }
            NestedMutation::Disconnect(disconnect) => {
                let computed =
                    self.authorization_for(disconnect.entity, AuthorizationOperation::DeleteRelationship, &[], &[])?;
                disconnect.authorization.merge(computed);
                self.weave_relationship_mutations(&mut disconnect.relationships)
            }
            NestedMutation::Update(update) => {
                let written: Vec<&str> = update.writes.iter().map(|w| w.field.as_str()).collect();
                let computed = self.authorization_for(update.entity, AuthorizationOperation::Update, &written, &[])?;
                update.authorization.merge(computed);
                self.weave_relationship_mutations(&mut update.relationships)
            }
            NestedMutation::Delete(delete) => {
                let computed = self.authorization_for(delete.entity, AuthorizationOperation::Delete, &[], &[])?;
                delete.authorization.merge(computed);
                self.weave_relationship_mutations(&mut delete.relationships)
            }
            NestedMutation::ConnectOrCreate(merge) => {
                let written: Vec<&str> = merge.on_create.iter().map(|w| w.field.as_str()).collect();
                let mut computed =
                    self.authorization_for(merge.entity, AuthorizationOperation::CreateRelationship, &[], &[])?;
                computed.merge(self.authorization_for(merge.entity, AuthorizationOperation::Create, &written, &[])?);
                merge.authorization.merge(computed);
                Ok(())
            }
        }
    }
}
