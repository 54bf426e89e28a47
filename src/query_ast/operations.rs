//! The operation tree built for one request.
//!
//! Every node targets concrete entities by id. Interfaces and unions are
//! expanded into one branch per concrete type at build time, so emission
//! never has to resolve polymorphism itself.

use serde_json::{Map, Value};

use super::fields::{AggregationField, Field};
use super::filters::{dedup, Filter};
use super::sort::{Pagination, SortField};
use crate::schema_model::relationship::RelationshipRef;
use crate::schema_model::{CompositeEntityId, ConcreteEntityId, ScalarType};

/// Predicates woven in from `@authorization` rules.
///
/// Each entry is the predicate of one rule source (a type or a field);
/// entries are ANDed, the rules within one source are already ORed into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizationFilters {
    /// Narrow the matched rows
    pub filters: Vec<Filter>,
    /// Must hold for every matched row before the operation runs
    pub validate_before: Vec<Filter>,
    /// Must hold for every row once the operation has run
    pub validate_after: Vec<Filter>,
    /// Attribute-level AFTER rules of batch creates: only enforced on rows
    /// that supply the attribute
    pub field_validate_after: Vec<(String, Filter)>,
}

impl AuthorizationFilters {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
            && self.validate_before.is_empty()
            && self.validate_after.is_empty()
            && self.field_validate_after.is_empty()
    }

    /// Add another source's predicates; structurally equal predicates are
    /// kept once, so weaving twice changes nothing.
    pub fn merge(&mut self, other: AuthorizationFilters) {
        self.filters.extend(other.filters);
        self.validate_before.extend(other.validate_before);
        self.validate_after.extend(other.validate_after);
        for entry in other.field_validate_after {
            if !self.field_validate_after.contains(&entry) {
                self.field_validate_after.push(entry);
            }
        }
        dedup(&mut self.filters);
        dedup(&mut self.validate_before);
        dedup(&mut self.validate_after);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOperation {
    pub alias: String,
    pub entity: ConcreteEntityId,
    /// Relationship traversed from the enclosing node; `None` at the root
    pub relationship: Option<RelationshipRef>,
    pub filters: Vec<Filter>,
    pub fields: Vec<Field>,
    pub sort: Vec<SortField>,
    pub pagination: Pagination,
    pub authorization: AuthorizationFilters,
}

/// Read of an interface or union: one branch per concrete type, combined
/// with UNION.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeReadOperation {
    pub alias: String,
    pub composite: CompositeEntityId,
    pub relationship: Option<RelationshipRef>,
    pub branches: Vec<ReadOperation>,
    pub sort: Vec<SortField>,
    pub pagination: Pagination,
}

/// Response keys selected inside a connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionSelection {
    pub edges: Option<String>,
    pub node: Option<String>,
    pub properties: Option<String>,
    pub cursor: Option<String>,
    pub total_count: Option<String>,
    pub page_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionBranch {
    pub entity: ConcreteEntityId,
    /// Node and edge predicates
    pub filters: Vec<Filter>,
    pub node_fields: Vec<Field>,
    pub authorization: AuthorizationFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionReadOperation {
    pub alias: String,
    pub relationship: Option<RelationshipRef>,
    pub branches: Vec<ConnectionBranch>,
    pub selection: ConnectionSelection,
    /// Relationship-properties projection
    pub edge_fields: Vec<Field>,
    pub sort: Vec<SortField>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOperation {
    pub alias: String,
    pub entity: ConcreteEntityId,
    pub relationship: Option<RelationshipRef>,
    pub filters: Vec<Filter>,
    pub count: Option<String>,
    /// `node { ... }` key of nested aggregates; root aggregates list their
    /// fields at the top level
    pub node_key: Option<String>,
    pub node_fields: Vec<AggregationField>,
    pub edge_key: Option<String>,
    pub edge_fields: Vec<AggregationField>,
    pub authorization: AuthorizationFilters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperator {
    Set,
    Increment,
    Decrement,
    Add,
    Subtract,
    Push,
    Pop,
}

impl WriteOperator {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "SET" => Some(WriteOperator::Set),
            "INCREMENT" => Some(WriteOperator::Increment),
            "DECREMENT" => Some(WriteOperator::Decrement),
            "ADD" => Some(WriteOperator::Add),
            "SUBTRACT" => Some(WriteOperator::Subtract),
            "PUSH" => Some(WriteOperator::Push),
            "POP" => Some(WriteOperator::Pop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyWrite {
    pub field: String,
    pub property: String,
    pub scalar: Option<ScalarType>,
    pub operator: WriteOperator,
    pub value: Value,
}

/// One node to create, with everything nested under it.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    pub entity: ConcreteEntityId,
    pub writes: Vec<PropertyWrite>,
    pub relationships: Vec<RelationshipMutation>,
    pub authorization: AuthorizationFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedCreate {
    pub node: CreateInput,
    pub edge: Vec<PropertyWrite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedConnect {
    pub entity: ConcreteEntityId,
    pub filters: Vec<Filter>,
    pub edge: Vec<PropertyWrite>,
    /// `connect` nested inside `connect`, relative to the connected node
    pub relationships: Vec<RelationshipMutation>,
    pub authorization: AuthorizationFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedDisconnect {
    pub entity: ConcreteEntityId,
    pub filters: Vec<Filter>,
    pub relationships: Vec<RelationshipMutation>,
    pub authorization: AuthorizationFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedUpdate {
    pub entity: ConcreteEntityId,
    pub filters: Vec<Filter>,
    pub writes: Vec<PropertyWrite>,
    pub edge: Vec<PropertyWrite>,
    pub relationships: Vec<RelationshipMutation>,
    pub authorization: AuthorizationFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedDelete {
    pub entity: ConcreteEntityId,
    pub filters: Vec<Filter>,
    pub relationships: Vec<RelationshipMutation>,
    pub authorization: AuthorizationFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NestedConnectOrCreate {
    pub entity: ConcreteEntityId,
    /// Identifying properties used as the MERGE key
    pub key: Vec<PropertyWrite>,
    pub on_create: Vec<PropertyWrite>,
    pub edge: Vec<PropertyWrite>,
    pub authorization: AuthorizationFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NestedMutation {
    Create(NestedCreate),
    Connect(NestedConnect),
    Disconnect(NestedDisconnect),
    Update(NestedUpdate),
    Delete(NestedDelete),
    ConnectOrCreate(NestedConnectOrCreate),
}

/// Nested operations against one relationship field, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipMutation {
    pub relationship: RelationshipRef,
    pub operations: Vec<NestedMutation>,
}

/// The entity list returned by a create or update (`createMovies { movies }`).
#[derive(Debug, Clone, PartialEq)]
pub struct MutationProjection {
    pub alias: String,
    pub fields: Vec<Field>,
    pub authorization: AuthorizationFilters,
}

/// Per-row create: one CALL block per input row.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOperation {
    pub entity: ConcreteEntityId,
    pub rows: Vec<CreateInput>,
    pub projection: Option<MutationProjection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnwindProperty {
    pub field: String,
    pub property: String,
    pub scalar: Option<ScalarType>,
}

/// Shape shared by every row of a batch create at one nesting level.
#[derive(Debug, Clone, PartialEq)]
pub struct UnwindCreateNode {
    pub entity: ConcreteEntityId,
    /// Union of the attribute keys supplied across rows
    pub properties: Vec<UnwindProperty>,
    pub relationships: Vec<UnwindRelationship>,
    pub authorization: AuthorizationFilters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnwindRelationship {
    pub relationship: RelationshipRef,
    pub edge_properties: Vec<UnwindProperty>,
    pub node: UnwindCreateNode,
}

/// Batch create: the rows travel as one list parameter and are expanded
/// with UNWIND.
#[derive(Debug, Clone, PartialEq)]
pub struct UnwindCreateOperation {
    pub entity: ConcreteEntityId,
    /// Normalised input rows; nested `create` inputs are always lists of
    /// `{ node, edge }`
    pub rows: Value,
    pub tree: UnwindCreateNode,
    pub projection: Option<MutationProjection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOperation {
    pub entity: ConcreteEntityId,
    pub filters: Vec<Filter>,
    pub writes: Vec<PropertyWrite>,
    pub relationships: Vec<RelationshipMutation>,
    pub authorization: AuthorizationFilters,
    pub projection: Option<MutationProjection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOperation {
    pub entity: ConcreteEntityId,
    pub filters: Vec<Filter>,
    pub relationships: Vec<RelationshipMutation>,
    pub authorization: AuthorizationFilters,
}

/// A `Query`/`Mutation` root field backed by `@cypher`.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomCypherOperation {
    pub alias: String,
    pub field: String,
    pub statement: String,
    pub column_name: String,
    pub is_list: bool,
    pub args: Map<String, Value>,
    /// Filters, projection and paging of the returned nodes
    pub target: Option<Box<ReadOperation>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperation {
    Read(ReadOperation),
    CompositeRead(CompositeReadOperation),
    Connection(ConnectionReadOperation),
    Aggregate(AggregateOperation),
    Create(CreateOperation),
    UnwindCreate(UnwindCreateOperation),
    Update(UpdateOperation),
    Delete(DeleteOperation),
    CustomCypher(CustomCypherOperation),
}

impl QueryOperation {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            QueryOperation::Create(_)
                | QueryOperation::UnwindCreate(_)
                | QueryOperation::Update(_)
                | QueryOperation::Delete(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            QueryOperation::Read(_) => "read",
            QueryOperation::CompositeRead(_) => "composite read",
            QueryOperation::Connection(_) => "connection",
            QueryOperation::Aggregate(_) => "aggregate",
            QueryOperation::Create(_) => "create",
            QueryOperation::UnwindCreate(_) => "unwind create",
            QueryOperation::Update(_) => "update",
            QueryOperation::Delete(_) => "delete",
            QueryOperation::CustomCypher(_) => "custom cypher",
        }
    }
}
