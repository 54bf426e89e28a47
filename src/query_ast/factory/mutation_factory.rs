//! `create*`, `update*` and `delete*` root fields and the nested
//! relationship operations they carry.

use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

use super::filter_factory::{expect_object, expect_objects};
use super::QueryAstFactory;
use crate::query_ast::errors::TranslationError;
use crate::query_ast::filters::Filter;
use crate::query_ast::operations::{
    AuthorizationFilters, CreateInput, CreateOperation, DeleteOperation, MutationProjection,
    NestedConnect, NestedConnectOrCreate, NestedCreate, NestedDelete, NestedDisconnect,
    NestedMutation, NestedUpdate, PropertyWrite, QueryOperation, RelationshipMutation,
    UnwindCreateNode, UnwindCreateOperation, UnwindProperty, UnwindRelationship, UpdateOperation,
    WriteOperator,
};
use crate::query_ast::resolve_tree::ResolveTree;
use crate::schema_model::adapters::{
    AttributeAdapter, ConcreteEntityAdapter, EntityAdapter, RelationshipAdapter,
};
use crate::schema_model::annotations::{NestedOperation, TimestampOperation};
use crate::schema_model::ScalarType;

/// `released_INCREMENT`, `tags_PUSH`
static WRITE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<field>.+)_(?P<op>SET|INCREMENT|DECREMENT|ADD|SUBTRACT|PUSH|POP)$").unwrap()
});

/// Nested operations a create input may carry.
const CREATE_OPERATIONS: &[NestedOperation] = &[
    NestedOperation::Create,
    NestedOperation::Connect,
    NestedOperation::ConnectOrCreate,
];

fn items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn check_operator(attribute: &AttributeAdapter<'_>, operator: WriteOperator, value: &Value) -> Result<(), TranslationError> {
    let scalar = attribute.scalar();
    let valid = match operator {
        WriteOperator::Set => true,
        WriteOperator::Increment | WriteOperator::Decrement => {
            !attribute.is_list() && matches!(scalar, Some(ScalarType::Int) | Some(ScalarType::BigInt))
        }
        WriteOperator::Add | WriteOperator::Subtract => {
            !attribute.is_list() && scalar == Some(ScalarType::Float)
        }
        WriteOperator::Push => attribute.is_list(),
        WriteOperator::Pop => attribute.is_list() && value.is_u64(),
    };
    if valid {
        Ok(())
    } else {
        Err(TranslationError::invalid_argument_with_context(
            attribute.name(),
            format!("{:?} cannot be applied to this field", operator),
        ))
    }
}

impl<'a> QueryAstFactory<'a> {
    /// One property write. Fields that are computed (`@cypher`, custom
    /// resolvers) or generated on this event cannot be written.
    fn property_write<F>(
        &self,
        type_name: &str,
        key: &str,
        value: &Value,
        event: TimestampOperation,
        allow_operators: bool,
        lookup: F,
    ) -> Result<PropertyWrite, TranslationError>
    where
        F: Fn(&str) -> Option<AttributeAdapter<'a>>,
    {
        let (attribute, operator) = match lookup(key) {
            Some(attribute) => (attribute, WriteOperator::Set),
            None => {
                let captures = WRITE_KEY
                    .captures(key)
                    .filter(|_| allow_operators)
                    .ok_or_else(|| TranslationError::unknown_field_with_context(type_name, key))?;
                let attribute = lookup(&captures["field"])
                    .ok_or_else(|| TranslationError::unknown_field_with_context(type_name, key))?;
                let operator = WriteOperator::from_suffix(&captures["op"]).unwrap_or(WriteOperator::Set);
                (attribute, operator)
            }
        };
        let declared = attribute.attribute;
        if !declared.is_persisted() {
            return Err(TranslationError::unknown_field_with_context(type_name, key));
        }
        let generated = declared.annotations.id.as_ref().map(|id| id.autogenerate).unwrap_or(false)
            || declared.is_autogenerated_on(event);
        if generated {
            return Err(TranslationError::invalid_argument_with_context(
                key,
                "autogenerated fields cannot be written",
            ));
        }
        check_operator(&attribute, operator, value)?;
        Ok(PropertyWrite {
            field: declared.name.clone(),
            property: declared.database_name.clone(),
            scalar: attribute.scalar(),
            operator,
            value: value.clone(),
        })
    }

    fn edge_writes(
        &self,
        relationship: &RelationshipAdapter<'a>,
        edge: Option<&Value>,
        event: TimestampOperation,
    ) -> Result<Vec<PropertyWrite>, TranslationError> {
        let edge = match edge.filter(|e| !e.is_null()) {
            Some(edge) => expect_object("edge", edge)?,
            None => return Ok(Vec::new()),
        };
        edge.iter()
            .map(|(key, value)| {
                self.property_write(
                    relationship.name(),
                    key,
                    value,
                    event,
                    event == TimestampOperation::Update,
                    |name| relationship.edge_attribute(name),
                )
            })
            .collect()
    }

    pub(crate) fn create_input(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        input: &Map<String, Value>,
    ) -> Result<CreateInput, TranslationError> {
        let mut writes = Vec::new();
        let mut relationships = Vec::new();
        for (key, value) in input {
            match entity.relationship(key) {
                Some(relationship) => {
                    relationships.push(self.relationship_mutation(&relationship, value, CREATE_OPERATIONS)?)
                }
                None => writes.push(self.property_write(
                    entity.name(),
                    key,
                    value,
                    TimestampOperation::Create,
                    false,
                    |name| entity.attribute(name),
                )?),
            }
        }
        Ok(CreateInput {
            entity: entity.id(),
            writes,
            relationships,
            authorization: AuthorizationFilters::default(),
        })
    }

    fn update_input(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        input: &Map<String, Value>,
    ) -> Result<(Vec<PropertyWrite>, Vec<RelationshipMutation>), TranslationError> {
        let mut writes = Vec::new();
        let mut relationships = Vec::new();
        for (key, value) in input {
            match entity.relationship(key) {
                Some(relationship) => {
                    relationships.push(self.relationship_mutation(&relationship, value, &NestedOperation::ALL)?)
                }
                None => writes.push(self.property_write(
                    entity.name(),
                    key,
                    value,
                    TimestampOperation::Update,
                    true,
                    |name| entity.attribute(name),
                )?),
            }
        }
        Ok((writes, relationships))
    }

    /// Nested operations against one relationship field. Union targets key
    /// their operations by member type.
    fn relationship_mutation(
        &self,
        relationship: &RelationshipAdapter<'a>,
        value: &Value,
        allowed: &[NestedOperation],
    ) -> Result<RelationshipMutation, TranslationError> {
        let input = expect_object(relationship.name(), value)?;
        let mut operations = Vec::new();
        match relationship.target() {
            EntityAdapter::Composite(union) if union.is_union() => {
                for (member_name, member_input) in input {
                    let member = union
                        .concrete_entity(member_name)
                        .ok_or_else(|| TranslationError::UnknownEntity(member_name.clone()))?;
                    let member_input = expect_object(member_name, member_input)?;
                    self.nested_operations(relationship, Some(member), member_input, allowed, &mut operations)?;
                }
            }
            _ => self.nested_operations(relationship, None, input, allowed, &mut operations)?,
        }
        Ok(RelationshipMutation {
            relationship: relationship.reference(),
            operations,
        })
    }

    fn nested_operations(
        &self,
        relationship: &RelationshipAdapter<'a>,
        member: Option<ConcreteEntityAdapter<'a>>,
        input: &Map<String, Value>,
        allowed: &[NestedOperation],
        operations: &mut Vec<NestedMutation>,
    ) -> Result<(), TranslationError> {
        let source = relationship.source();
        for (key, value) in input {
            let operation = NestedOperation::ALL
                .iter()
                .copied()
                .find(|op| op.input_key() == key && allowed.contains(op))
                .ok_or_else(|| {
                    TranslationError::unknown_field_with_context(
                        format!("{}.{}", source.name(), relationship.name()),
                        key.as_str(),
                    )
                })?;
            if !relationship.allows(operation) {
                return Err(TranslationError::NestedOperationNotAllowed {
                    type_name: source.name().to_string(),
                    field: relationship.name().to_string(),
                    operation: key.clone(),
                });
            }
            log::trace!("nested {} on {}.{}", key, source.name(), relationship.name());
            for item in items(value) {
                let item = expect_object(key, item)?;
                match operation {
                    NestedOperation::Create => {
                        operations.push(NestedMutation::Create(self.nested_create(relationship, member, item)?))
                    }
                    NestedOperation::Connect => {
                        for connect in self.nested_connect(relationship, member, item)? {
                            operations.push(NestedMutation::Connect(connect));
                        }
                    }
                    NestedOperation::Disconnect => {
                        for disconnect in self.nested_disconnect(relationship, member, item)? {
                            operations.push(NestedMutation::Disconnect(disconnect));
                        }
                    }
                    NestedOperation::Update => {
                        for update in self.nested_update(relationship, member, item)? {
                            operations.push(NestedMutation::Update(update));
                        }
                    }
                    NestedOperation::Delete => {
                        for delete in self.nested_delete(relationship, member, item)? {
                            operations.push(NestedMutation::Delete(delete));
                        }
                    }
                    NestedOperation::ConnectOrCreate => operations.push(NestedMutation::ConnectOrCreate(
                        self.nested_connect_or_create(relationship, member, item)?,
                    )),
                }
            }
        }
        Ok(())
    }

    /// Concrete entities an operation against `relationship` can touch.
    fn targets(
        relationship: &RelationshipAdapter<'a>,
        member: Option<ConcreteEntityAdapter<'a>>,
    ) -> Vec<ConcreteEntityAdapter<'a>> {
        match member {
            Some(member) => vec![member],
            None => relationship.target_concrete_entities(),
        }
    }

    /// `where: { node, edge }` of a nested disconnect/update/delete.
    fn nested_where(
        &self,
        relationship: &RelationshipAdapter<'a>,
        target: ConcreteEntityAdapter<'a>,
        item: &Map<String, Value>,
    ) -> Result<Vec<Filter>, TranslationError> {
        match item.get("where").filter(|w| !w.is_null()) {
            Some(where_) => self
                .filters
                .connection_where(relationship, target, expect_object("where", where_)?),
            None => Ok(Vec::new()),
        }
    }

    /// Operations of one kind nested under a connected, disconnected or
    /// deleted node (`connect: { actors: [...] }`).
    fn sub_mutations(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        operation: NestedOperation,
        input: Option<&Value>,
    ) -> Result<Vec<RelationshipMutation>, TranslationError> {
        let key = operation.input_key();
        let mut mutations = Vec::new();
        let input = match input.filter(|v| !v.is_null()) {
            Some(input) => input,
            None => return Ok(mutations),
        };
        for input in expect_objects(key, input)? {
            for (name, value) in input {
                let relationship = entity
                    .relationship(name)
                    .ok_or_else(|| TranslationError::unknown_field_with_context(entity.name(), name.as_str()))?;
                let wrapped = match relationship.target() {
                    EntityAdapter::Composite(union) if union.is_union() => Value::Object(
                        expect_object(name, value)?
                            .iter()
                            .map(|(member, v)| (member.clone(), json!({ key: v })))
                            .collect(),
                    ),
                    _ => json!({ key: value }),
                };
                mutations.push(self.relationship_mutation(&relationship, &wrapped, &[operation])?);
            }
        }
        Ok(mutations)
    }

    fn nested_create(
        &self,
        relationship: &RelationshipAdapter<'a>,
        member: Option<ConcreteEntityAdapter<'a>>,
        item: &Map<String, Value>,
    ) -> Result<NestedCreate, TranslationError> {
        let node = item
            .get("node")
            .ok_or_else(|| TranslationError::invalid_argument_with_context("create", "`node` is required"))?;
        let node = expect_object("node", node)?;
        let (target, node) = match (member, relationship.target()) {
            (Some(member), _) => (member, node),
            (None, EntityAdapter::Concrete(target)) => (target, node),
            // interface targets name the implementation to create
            (None, EntityAdapter::Composite(interface)) => {
                let mut entries = node.iter();
                match (entries.next(), entries.next()) {
                    (Some((type_name, input)), None) => {
                        let target = interface
                            .concrete_entity(type_name)
                            .ok_or_else(|| TranslationError::UnknownEntity(type_name.clone()))?;
                        (target, expect_object(type_name, input)?)
                    }
                    _ => {
                        return Err(TranslationError::invalid_argument_with_context(
                            "node",
                            format!("exactly one implementation of {} must be given", interface.name()),
                        ))
                    }
                }
            }
        };
        Ok(NestedCreate {
            node: self.create_input(target, node)?,
            edge: self.edge_writes(relationship, item.get("edge"), TimestampOperation::Create)?,
        })
    }

    fn nested_connect(
        &self,
        relationship: &RelationshipAdapter<'a>,
        member: Option<ConcreteEntityAdapter<'a>>,
        item: &Map<String, Value>,
    ) -> Result<Vec<NestedConnect>, TranslationError> {
        let node_where = match item.get("where").filter(|w| !w.is_null()) {
            Some(where_) => expect_object("where", where_)?
                .get("node")
                .map(|node| expect_object("node", node))
                .transpose()?,
            None => None,
        };
        let edge = self.edge_writes(relationship, item.get("edge"), TimestampOperation::Create)?;
        let mut connects = Vec::new();
        for target in Self::targets(relationship, member) {
            let filters = match node_where {
                Some(node_where) => self.filters.node_filters(target, node_where)?,
                None => Vec::new(),
            };
            connects.push(NestedConnect {
                entity: target.id(),
                filters,
                edge: edge.clone(),
                relationships: self.sub_mutations(target, NestedOperation::Connect, item.get("connect"))?,
                authorization: AuthorizationFilters::default(),
            });
        }
        Ok(connects)
    }

    fn nested_disconnect(
        &self,
        relationship: &RelationshipAdapter<'a>,
        member: Option<ConcreteEntityAdapter<'a>>,
        item: &Map<String, Value>,
    ) -> Result<Vec<NestedDisconnect>, TranslationError> {
        Self::targets(relationship, member)
            .into_iter()
            .map(|target| {
                Ok(NestedDisconnect {
                    entity: target.id(),
                    filters: self.nested_where(relationship, target, item)?,
                    relationships: self.sub_mutations(target, NestedOperation::Disconnect, item.get("disconnect"))?,
                    authorization: AuthorizationFilters::default(),
                })
            })
            .collect()
    }

    fn nested_update(
        &self,
        relationship: &RelationshipAdapter<'a>,
        member: Option<ConcreteEntityAdapter<'a>>,
        item: &Map<String, Value>,
    ) -> Result<Vec<NestedUpdate>, TranslationError> {
        let update = match item.get("update").filter(|u| !u.is_null()) {
            Some(update) => Some(expect_object("update", update)?),
            None => None,
        };
        let edge = self.edge_writes(
            relationship,
            update.and_then(|u| u.get("edge")),
            TimestampOperation::Update,
        )?;
        let mut updates = Vec::new();
        for target in Self::targets(relationship, member) {
            let (writes, relationships) = match update.and_then(|u| u.get("node")) {
                Some(node) => self.update_input(target, expect_object("node", node)?)?,
                None => (Vec::new(), Vec::new()),
            };
            updates.push(NestedUpdate {
                entity: target.id(),
                filters: self.nested_where(relationship, target, item)?,
                writes,
                edge: edge.clone(),
                relationships,
                authorization: AuthorizationFilters::default(),
            });
        }
        Ok(updates)
    }

    fn nested_delete(
        &self,
        relationship: &RelationshipAdapter<'a>,
        member: Option<ConcreteEntityAdapter<'a>>,
        item: &Map<String, Value>,
    ) -> Result<Vec<NestedDelete>, TranslationError> {
        Self::targets(relationship, member)
            .into_iter()
            .map(|target| {
                Ok(NestedDelete {
                    entity: target.id(),
                    filters: self.nested_where(relationship, target, item)?,
                    relationships: self.sub_mutations(target, NestedOperation::Delete, item.get("delete"))?,
                    authorization: AuthorizationFilters::default(),
                })
            })
            .collect()
    }

    /// MERGE on identifying properties; `onCreate` is applied only when no
    /// node matched.
    fn nested_connect_or_create(
        &self,
        relationship: &RelationshipAdapter<'a>,
        member: Option<ConcreteEntityAdapter<'a>>,
        item: &Map<String, Value>,
    ) -> Result<NestedConnectOrCreate, TranslationError> {
        let target = match (member, relationship.target()) {
            (Some(member), _) => member,
            (None, EntityAdapter::Concrete(target)) => target,
            (None, EntityAdapter::Composite(composite)) => {
                return Err(TranslationError::UnsupportedOperation(format!(
                    "connectOrCreate on interface `{}`",
                    composite.name()
                )))
            }
        };
        let node_where = item
            .get("where")
            .and_then(|w| w.get("node"))
            .ok_or_else(|| TranslationError::invalid_argument_with_context("where", "`node` is required"))?;
        let node_where = expect_object("where", node_where)?;
        if node_where.is_empty() {
            return Err(TranslationError::invalid_argument_with_context(
                "where",
                "at least one unique field is required",
            ));
        }
        let mut key = Vec::new();
        for (name, value) in node_where {
            let attribute = target
                .attribute(name)
                .filter(|a| a.attribute.flags.identifying)
                .ok_or_else(|| {
                    TranslationError::invalid_argument_with_context(
                        name.as_str(),
                        format!("not a unique field of {}", target.name()),
                    )
                })?;
            key.push(PropertyWrite {
                field: attribute.name().to_string(),
                property: attribute.database_name().to_string(),
                scalar: attribute.scalar(),
                operator: WriteOperator::Set,
                value: value.clone(),
            });
        }

        let on_create = item.get("onCreate").filter(|v| !v.is_null());
        let mut node_writes = Vec::new();
        if let Some(node) = on_create.and_then(|c| c.get("node")).filter(|v| !v.is_null()) {
            for (name, value) in expect_object("node", node)? {
                node_writes.push(self.property_write(
                    target.name(),
                    name,
                    value,
                    TimestampOperation::Create,
                    false,
                    |n| target.attribute(n),
                )?);
            }
        }
        Ok(NestedConnectOrCreate {
            entity: target.id(),
            key,
            on_create: node_writes,
            edge: self.edge_writes(
                relationship,
                on_create.and_then(|c| c.get("edge")),
                TimestampOperation::Create,
            )?,
            authorization: AuthorizationFilters::default(),
        })
    }

    /// The `<plural> { ... }` selection of a mutation response; `info` is
    /// answered from the driver's counters.
    fn mutation_projection(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        tree: &ResolveTree,
    ) -> Result<Option<MutationProjection>, TranslationError> {
        let plural = &entity.naming().plural;
        let mut projection = None;
        for field in &tree.fields {
            match field.name.as_str() {
                "info" | "__typename" => {}
                name if name == plural => {
                    projection = Some(MutationProjection {
                        alias: field.response_key().to_string(),
                        fields: self.node_fields(entity, field)?,
                        authorization: AuthorizationFilters::default(),
                    })
                }
                other => {
                    return Err(TranslationError::unknown_field_with_context(
                        format!("{}MutationResponse", entity.name()),
                        other,
                    ))
                }
            }
        }
        Ok(projection)
    }

    pub(crate) fn create(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        tree: &ResolveTree,
    ) -> Result<QueryOperation, TranslationError> {
        let rows = match tree.arg("input") {
            Some(input) => expect_objects("input", input)?,
            None => Vec::new(),
        };
        let projection = self.mutation_projection(entity, tree)?;

        if self.context.config.unwind_create_enabled
            && !rows.is_empty()
            && rows.iter().all(|row| self.unwind_eligible(entity, row))
        {
            log::debug!("batch create of {} {} row(s)", rows.len(), entity.name());
            return Ok(QueryOperation::UnwindCreate(UnwindCreateOperation {
                entity: entity.id(),
                rows: Value::Array(
                    rows.iter()
                        .map(|row| Value::Object(self.normalize_unwind_row(entity, row)))
                        .collect(),
                ),
                tree: self.unwind_node(entity, &rows)?,
                projection,
            }));
        }

        let rows = rows
            .into_iter()
            .map(|row| self.create_input(entity, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryOperation::Create(CreateOperation {
            entity: entity.id(),
            rows,
            projection,
        }))
    }

    /// Whether a row only creates, recursively, and only against concrete
    /// targets.
    fn unwind_eligible(&self, entity: ConcreteEntityAdapter<'a>, row: &Map<String, Value>) -> bool {
        row.iter().all(|(key, value)| {
            let relationship = match entity.relationship(key) {
                Some(relationship) => relationship,
                None => return true,
            };
            let target = match relationship.target() {
                EntityAdapter::Concrete(target) => target,
                EntityAdapter::Composite(_) => return false,
            };
            let operations = match value.as_object() {
                Some(operations) => operations,
                None => return false,
            };
            operations.iter().all(|(operation, creates)| {
                operation == "create"
                    && items(creates).iter().all(|create| {
                        match create.get("node").and_then(Value::as_object) {
                            Some(node) => self.unwind_eligible(target, node),
                            None => false,
                        }
                    })
            })
        })
    }

    /// Nested `create` inputs become lists so the emitter can always UNWIND
    /// them.
    fn normalize_unwind_row(&self, entity: ConcreteEntityAdapter<'a>, row: &Map<String, Value>) -> Map<String, Value> {
        row.iter()
            .map(|(key, value)| {
                let target = match entity.relationship(key).map(|r| r.target()) {
                    Some(EntityAdapter::Concrete(target)) => target,
                    _ => return (key.clone(), value.clone()),
                };
                let creates: Vec<Value> = value
                    .get("create")
                    .map(items)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|create| {
                        let mut normalized = Map::new();
                        if let Some(node) = create.get("node").and_then(Value::as_object) {
                            normalized.insert("node".to_string(), Value::Object(self.normalize_unwind_row(target, node)));
                        }
                        if let Some(edge) = create.get("edge").filter(|e| !e.is_null()) {
                            normalized.insert("edge".to_string(), edge.clone());
                        }
                        Value::Object(normalized)
                    })
                    .collect();
                (key.clone(), json!({ "create": creates }))
            })
            .collect()
    }

    /// Shape of one nesting level across all rows: the union of their
    /// property keys and nested creates.
    fn unwind_node(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        rows: &[&Map<String, Value>],
    ) -> Result<UnwindCreateNode, TranslationError> {
        let mut properties: Vec<UnwindProperty> = Vec::new();
        let mut relationships: Vec<UnwindRelationship> = Vec::new();
        let mut relationship_names: Vec<&str> = Vec::new();

        for row in rows {
            for (key, value) in row.iter() {
                if let Some(relationship) = entity.relationship(key) {
                    if !relationship_names.contains(&relationship.name()) {
                        relationship_names.push(relationship.name());
                    }
                    continue;
                }
                if properties.iter().any(|p| &p.field == key) {
                    continue;
                }
                let write = self.property_write(
                    entity.name(),
                    key,
                    value,
                    TimestampOperation::Create,
                    false,
                    |name| entity.attribute(name),
                )?;
                properties.push(UnwindProperty {
                    field: write.field,
                    property: write.property,
                    scalar: write.scalar,
                });
            }
        }

        for name in relationship_names {
            let relationship = match entity.relationship(name) {
                Some(relationship) => relationship,
                None => continue,
            };
            if !relationship.allows(NestedOperation::Create) {
                return Err(TranslationError::NestedOperationNotAllowed {
                    type_name: entity.name().to_string(),
                    field: name.to_string(),
                    operation: NestedOperation::Create.input_key().to_string(),
                });
            }
            let target = match relationship.target() {
                EntityAdapter::Concrete(target) => target,
                EntityAdapter::Composite(composite) => {
                    return Err(TranslationError::UnsupportedOperation(format!(
                        "batch create into `{}`",
                        composite.name()
                    )))
                }
            };
            let creates: Vec<&Value> = rows
                .iter()
                .filter_map(|row| row.get(name))
                .filter_map(|value| value.get("create"))
                .flat_map(items)
                .collect();
            let nodes: Vec<&Map<String, Value>> = creates
                .iter()
                .filter_map(|create| create.get("node").and_then(Value::as_object))
                .collect();

            let mut edge_properties: Vec<UnwindProperty> = Vec::new();
            for edge in creates.iter().filter_map(|c| c.get("edge").and_then(Value::as_object)) {
                for (key, value) in edge {
                    if edge_properties.iter().any(|p| &p.field == key) {
                        continue;
                    }
                    let write = self.property_write(
                        relationship.name(),
                        key,
                        value,
                        TimestampOperation::Create,
                        false,
                        |n| relationship.edge_attribute(n),
                    )?;
                    edge_properties.push(UnwindProperty {
                        field: write.field,
                        property: write.property,
                        scalar: write.scalar,
                    });
                }
            }

            relationships.push(UnwindRelationship {
                relationship: relationship.reference(),
                edge_properties,
                node: self.unwind_node(target, &nodes)?,
            });
        }

        Ok(UnwindCreateNode {
            entity: entity.id(),
            properties,
            relationships,
            authorization: AuthorizationFilters::default(),
        })
    }

    pub(crate) fn update(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        tree: &ResolveTree,
    ) -> Result<UpdateOperation, TranslationError> {
        let filters = match tree.arg("where") {
            Some(where_) => self.filters.node_filters(entity, expect_object("where", where_)?)?,
            None => Vec::new(),
        };
        let (writes, relationships) = match tree.arg("update") {
            Some(update) => self.update_input(entity, expect_object("update", update)?)?,
            None => (Vec::new(), Vec::new()),
        };
        Ok(UpdateOperation {
            entity: entity.id(),
            filters,
            writes,
            relationships,
            authorization: AuthorizationFilters::default(),
            projection: self.mutation_projection(entity, tree)?,
        })
    }

    pub(crate) fn delete(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        tree: &ResolveTree,
    ) -> Result<DeleteOperation, TranslationError> {
        let filters = match tree.arg("where") {
            Some(where_) => self.filters.node_filters(entity, expect_object("where", where_)?)?,
            None => Vec::new(),
        };
        Ok(DeleteOperation {
            entity: entity.id(),
            filters,
            relationships: self.sub_mutations(entity, NestedOperation::Delete, tree.arg("delete"))?,
            authorization: AuthorizationFilters::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslatorConfig;
    use crate::query_ast::context::TranslationContext;
    use crate::schema_model::testing::movies_model;
    use crate::schema_model::Neo4jGraphQLSchemaModel;

    fn build_with(
        model: &Neo4jGraphQLSchemaModel,
        context: &TranslationContext,
        tree: Value,
    ) -> Result<QueryOperation, TranslationError> {
        let tree: ResolveTree = serde_json::from_value(tree).unwrap();
        QueryAstFactory::new(model, context).create_query_ast(&tree)
    }

    fn build(model: &Neo4jGraphQLSchemaModel, tree: Value) -> Result<QueryOperation, TranslationError> {
        build_with(model, &TranslationContext::default(), tree)
    }

    #[test]
    fn test_plain_rows_take_the_batch_path() {
        let model = movies_model();
        let operation = build(
            &model,
            json!({
                "name": "createMovies",
                "args": { "input": [{ "title": "A" }, { "title": "B", "released": 1999 }, { "title": "C" }] },
                "fields": [{ "name": "movies", "fields": [{ "name": "title" }] }]
            }),
        )
        .unwrap();
        match operation {
            QueryOperation::UnwindCreate(create) => {
                assert_eq!(create.rows.as_array().unwrap().len(), 3);
                let fields: Vec<_> = create.tree.properties.iter().map(|p| p.field.as_str()).collect();
                assert_eq!(fields, vec!["title", "released"]);
                assert!(create.projection.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nested_creates_are_normalised_to_lists() {
        let model = movies_model();
        let operation = build(
            &model,
            json!({
                "name": "createMovies",
                "args": { "input": [{
                    "title": "A",
                    "actors": { "create": { "node": { "name": "Keanu" }, "edge": { "screenTime": 10 } } }
                }] }
            }),
        )
        .unwrap();
        match operation {
            QueryOperation::UnwindCreate(create) => {
                assert_eq!(
                    create.rows[0]["actors"],
                    json!({ "create": [{ "node": { "name": "Keanu" }, "edge": { "screenTime": 10 } }] })
                );
                let actors = &create.tree.relationships[0];
                assert_eq!(actors.edge_properties[0].field, "screenTime");
                assert_eq!(actors.node.properties[0].field, "name");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_connect_forces_per_row_path() {
        let model = movies_model();
        let operation = build(
            &model,
            json!({
                "name": "createMovies",
                "args": { "input": [{ "title": "A", "genres": { "connect": [{ "where": { "node": { "name": "Drama" } } }] } }] }
            }),
        )
        .unwrap();
        match operation {
            QueryOperation::Create(create) => match &create.rows[0].relationships[0].operations[0] {
                NestedMutation::Connect(connect) => assert_eq!(connect.filters.len(), 1),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_batch_path_can_be_disabled() {
        let model = movies_model();
        let context = TranslationContext::new(TranslatorConfig {
            unwind_create_enabled: false,
            ..TranslatorConfig::default()
        });
        let operation = build_with(
            &model,
            &context,
            json!({ "name": "createMovies", "args": { "input": [{ "title": "A" }, { "title": "B" }] } }),
        )
        .unwrap();
        assert!(matches!(operation, QueryOperation::Create(ref c) if c.rows.len() == 2));
    }

    #[test]
    fn test_autogenerated_fields_are_not_input() {
        let model = movies_model();
        let err = build(
            &model,
            json!({ "name": "createMovies", "args": { "input": [{ "title": "A", "id": "x" }] } }),
        )
        .unwrap_err();
        assert!(matches!(err, TranslationError::InvalidArgument { ref argument, .. } if argument == "id"));
    }

    #[test]
    fn test_nested_operation_permission() {
        let model = movies_model();
        let err = build(
            &model,
            json!({
                "name": "updateMovies",
                "args": { "update": { "genres": { "delete": [{ "where": { "node": { "name": "Drama" } } }] } } }
            }),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TranslationError::NestedOperationNotAllowed {
                type_name: "Movie".to_string(),
                field: "genres".to_string(),
                operation: "delete".to_string(),
            }
        );
    }

    #[test]
    fn test_update_operators() {
        let model = movies_model();
        let operation = build(
            &model,
            json!({
                "name": "updateMovies",
                "args": {
                    "where": { "title": "A" },
                    "update": { "released_INCREMENT": 1, "rating_ADD": 0.5, "title_SET": "B" }
                }
            }),
        )
        .unwrap();
        match operation {
            QueryOperation::Update(update) => {
                let operators: Vec<_> = update.writes.iter().map(|w| w.operator).collect();
                assert_eq!(
                    operators,
                    vec![WriteOperator::Increment, WriteOperator::Add, WriteOperator::Set]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
        let err = build(
            &model,
            json!({ "name": "updateMovies", "args": { "update": { "title_INCREMENT": 1 } } }),
        )
        .unwrap_err();
        assert!(matches!(err, TranslationError::InvalidArgument { .. }));
    }

    #[test]
    fn test_nested_update_disconnect_and_connect_or_create() {
        let model = movies_model();
        let operation = build(
            &model,
            json!({
                "name": "updateMovies",
                "args": { "update": {
                    "actors": {
                        "update": [{ "where": { "node": { "name": "Keanu" } }, "update": { "edge": { "screenTime_INCREMENT": 5 } } }],
                        "disconnect": [{ "where": { "edge": { "screenTime_LT": 1 } } }],
                        "connectOrCreate": [{ "where": { "node": { "name": "Carrie" } }, "onCreate": { "node": { "born": 1967 } } }]
                    }
                } }
            }),
        )
        .unwrap();
        let update = match operation {
            QueryOperation::Update(update) => update,
            other => panic!("unexpected {:?}", other),
        };
        let operations = &update.relationships[0].operations;
        assert_eq!(operations.len(), 3);
        match &operations[0] {
            NestedMutation::Update(nested) => assert_eq!(nested.edge[0].operator, WriteOperator::Increment),
            other => panic!("unexpected {:?}", other),
        }
        match &operations[2] {
            NestedMutation::ConnectOrCreate(merge) => {
                assert_eq!(merge.key[0].property, "name");
                assert_eq!(merge.on_create[0].field, "born");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_connect_or_create_needs_unique_key() {
        let model = movies_model();
        let err = build(
            &model,
            json!({
                "name": "updateMovies",
                "args": { "update": { "actors": { "connectOrCreate": [{ "where": { "node": { "born": 1964 } } }] } } }
            }),
        )
        .unwrap_err();
        assert!(matches!(err, TranslationError::InvalidArgument { ref argument, .. } if argument == "born"));
    }

    #[test]
    fn test_delete_with_nested_delete() {
        let model = movies_model();
        let operation = build(
            &model,
            json!({
                "name": "deleteMovies",
                "args": {
                    "where": { "title": "A" },
                    "delete": { "actors": [{ "where": { "node": { "name": "Keanu" } } }] }
                }
            }),
        )
        .unwrap();
        match operation {
            QueryOperation::Delete(delete) => {
                assert_eq!(delete.filters.len(), 1);
                assert!(matches!(delete.relationships[0].operations[0], NestedMutation::Delete(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
