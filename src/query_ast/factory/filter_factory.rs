//! `where` inputs → [`Filter`] trees.
//!
//! Key resolution order for one entity:
//! 1. logical keys (`AND`, `OR`, `NOT`) and `typename_IN`
//! 2. an exact attribute name (implicit `EQ`) or relationship name (`SOME`)
//! 3. `<rel>Aggregate`, `<rel>Connection[_Q]`, `<rel>_Q`
//! 4. `<attr>_<OP>`

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::query_ast::errors::TranslationError;
use crate::query_ast::filters::{
    AggregationComparator, AggregationFilter, AggregationFunction, AggregationPredicate,
    CypherFieldComparison, CypherFieldFilter, Filter, FilterValue, LogicalOperator,
    PropertyFilter, PropertyOwner, Quantifier, RelationshipFilter, TargetFilter,
};
use crate::schema_model::adapters::{
    AttributeAdapter, ConcreteEntityAdapter, EntityAdapter, FilterOperator, RelationshipAdapter,
};
use crate::schema_model::attribute::{Attribute, AttributeKind};
use crate::schema_model::{ConcreteEntityId, EntityRef, Neo4jGraphQLSchemaModel};

/// `released_GTE`, `title_STARTS_WITH`
static OPERATOR_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<field>.+)_(?P<op>EQ|IN|LT|LTE|GT|GTE|CONTAINS|STARTS_WITH|ENDS_WITH|MATCHES|INCLUDES)$")
        .unwrap()
});

/// `actors_SOME`, `actorsConnection_ALL`
static QUANTIFIER_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<field>.+)_(?P<quantifier>SOME|ALL|NONE|SINGLE)$").unwrap());

/// `someInt_AVERAGE_GT`, `name_SHORTEST_LENGTH_LTE`
static AGGREGATION_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<field>.+?)_(?P<agg>AVERAGE_LENGTH|SHORTEST_LENGTH|LONGEST_LENGTH|AVERAGE|SUM|MIN|MAX)_(?P<op>EQ|GT|GTE|LT|LTE)$")
        .unwrap()
});

/// `count`, `count_GT`
static COUNT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^count(?:_(?P<op>EQ|GT|GTE|LT|LTE))?$").unwrap());

const JWT_PREFIX: &str = "$jwt.";

pub struct FilterFactory<'a> {
    model: &'a Neo4jGraphQLSchemaModel,
    /// Treat `"$jwt.<path>"` strings as claim references (authorization
    /// rules only; request values are always literals)
    jwt_references: bool,
}

pub(super) fn expect_object<'v>(key: &str, value: &'v Value) -> Result<&'v Map<String, Value>, TranslationError> {
    value.as_object().ok_or_else(|| {
        TranslationError::invalid_argument_with_context(key, "expected an input object")
    })
}

pub(super) fn expect_objects<'v>(key: &str, value: &'v Value) -> Result<Vec<&'v Map<String, Value>>, TranslationError> {
    match value {
        Value::Array(items) => items.iter().map(|item| expect_object(key, item)).collect(),
        Value::Object(map) => Ok(vec![map]),
        _ => Err(TranslationError::invalid_argument_with_context(
            key,
            "expected a list of input objects",
        )),
    }
}

impl<'a> FilterFactory<'a> {
    pub fn new(model: &'a Neo4jGraphQLSchemaModel) -> Self {
        FilterFactory {
            model,
            jwt_references: false,
        }
    }

    pub fn for_authorization(model: &'a Neo4jGraphQLSchemaModel) -> Self {
        FilterFactory {
            model,
            jwt_references: true,
        }
    }

    pub fn value(&self, value: &Value) -> FilterValue {
        if self.jwt_references {
            if let Some(path) = value.as_str().and_then(|s| s.strip_prefix(JWT_PREFIX)) {
                return FilterValue::Jwt(path.to_string());
            }
        }
        FilterValue::Param(value.clone())
    }

    /// Predicates of a `where` input on a concrete entity.
    pub fn node_filters(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        where_: &Map<String, Value>,
    ) -> Result<Vec<Filter>, TranslationError> {
        let mut filters = Vec::new();
        for (key, value) in where_ {
            match key.as_str() {
                "AND" | "OR" => {
                    let mut branches = Vec::new();
                    for branch in expect_objects(key, value)? {
                        if let Some(filter) = Filter::and(self.node_filters(entity, branch)?) {
                            branches.push(filter);
                        }
                    }
                    let combined = if key == "AND" {
                        Filter::and(branches)
                    } else {
                        Filter::or(branches)
                    };
                    filters.extend(combined);
                }
                "NOT" => {
                    let inner = self.node_filters(entity, expect_object(key, value)?)?;
                    if let Some(filter) = Filter::and(inner) {
                        filters.push(Filter::not(filter));
                    }
                }
                "typename_IN" => filters.push(self.typename_filter(value)?),
                _ => filters.push(self.field_filter(entity, key, value)?),
            }
        }
        log::trace!("{} filter(s) on {}", filters.len(), entity.name());
        Ok(filters)
    }

    fn typename_filter(&self, value: &Value) -> Result<Filter, TranslationError> {
        let names = value.as_array().ok_or_else(|| {
            TranslationError::invalid_argument_with_context("typename_IN", "expected a list of type names")
        })?;
        let mut entities = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_str().unwrap_or_default();
            let entity = self
                .model
                .concrete_entity_by_name(name)
                .ok_or_else(|| TranslationError::UnknownEntity(name.to_string()))?;
            entities.push(entity.id);
        }
        Ok(Filter::TypeName { entities })
    }

    fn field_filter(
        &self,
        entity: ConcreteEntityAdapter<'a>,
        key: &str,
        value: &Value,
    ) -> Result<Filter, TranslationError> {
        if let Some(attribute) = entity.attribute(key) {
            return self.attribute_filter(PropertyOwner::Node, attribute, FilterOperator::Eq, value);
        }
        if let Some(relationship) = entity.relationship(key) {
            return self.relationship_filter(relationship, Quantifier::Some, value);
        }
        if let Some(name) = key.strip_suffix("Aggregate") {
            if let Some(relationship) = entity.relationship(name) {
                return self.aggregation_filter(relationship, key, value);
            }
        }
        if let Some(name) = key.strip_suffix("Connection") {
            if let Some(relationship) = entity.relationship(name) {
                return self.connection_filter(relationship, Quantifier::Some, value);
            }
        }
        if let Some(captures) = QUANTIFIER_KEY.captures(key) {
            let field = &captures["field"];
            let quantifier = Quantifier::from_suffix(&captures["quantifier"]).unwrap_or(Quantifier::Some);
            if let Some(relationship) = entity.relationship(field) {
                return self.relationship_filter(relationship, quantifier, value);
            }
            if let Some(relationship) = field.strip_suffix("Connection").and_then(|n| entity.relationship(n)) {
                return self.connection_filter(relationship, quantifier, value);
            }
        }
        if let Some(captures) = OPERATOR_KEY.captures(key) {
            if let Some(attribute) = entity.attribute(&captures["field"]) {
                let operator = FilterOperator::from_suffix(&captures["op"]).unwrap_or(FilterOperator::Eq);
                return self.attribute_filter(PropertyOwner::Node, attribute, operator, value);
            }
        }
        Err(TranslationError::unknown_field_with_context(entity.name(), key))
    }

    fn attribute_filter(
        &self,
        owner: PropertyOwner,
        attribute: AttributeAdapter<'a>,
        operator: FilterOperator,
        value: &Value,
    ) -> Result<Filter, TranslationError> {
        let declared = attribute.attribute;
        if declared.is_custom_resolved() {
            return Err(TranslationError::invalid_argument_with_context(
                declared.name.as_str(),
                "custom-resolved fields cannot be filtered",
            ));
        }
        if declared.is_cypher() {
            return self.cypher_field_filter(declared, operator, value);
        }
        if !attribute.supports(operator) {
            return Err(TranslationError::invalid_argument_with_context(
                declared.name.as_str(),
                format!("operator {:?} is not supported on this field", operator),
            ));
        }
        if operator == FilterOperator::In && !value.is_array() {
            return Err(TranslationError::invalid_argument_with_context(
                declared.name.as_str(),
                "_IN expects a list",
            ));
        }
        Ok(Filter::Property(PropertyFilter {
            owner,
            field: declared.name.clone(),
            property: declared.database_name.clone(),
            scalar: attribute.scalar(),
            is_list: attribute.is_list(),
            coalesce: attribute.coalesce_value().cloned(),
            operator,
            value: self.value(value),
        }))
    }

    fn cypher_field_filter(
        &self,
        attribute: &'a Attribute,
        operator: FilterOperator,
        value: &Value,
    ) -> Result<Filter, TranslationError> {
        let cypher = match &attribute.annotations.cypher {
            Some(cypher) => cypher,
            None => return Err(TranslationError::unknown_field_with_context("", attribute.name.as_str())),
        };
        let comparison = match (attribute.cypher_target, &attribute.attribute_type.kind) {
            (Some(target), _) => {
                let target = ConcreteEntityAdapter::new(self.model, target);
                let where_ = expect_object(&attribute.name, value)?;
                CypherFieldComparison::Entity {
                    entity: target.id(),
                    filters: self.node_filters(target, where_)?,
                }
            }
            (None, AttributeKind::Object(_)) => {
                return Err(TranslationError::invalid_argument_with_context(
                    attribute.name.as_str(),
                    "object-typed @cypher fields cannot be filtered",
                ))
            }
            (None, _) => CypherFieldComparison::Scalar {
                scalar: attribute.attribute_type.scalar(),
                operator,
                value: self.value(value),
            },
        };
        Ok(Filter::CypherField(CypherFieldFilter {
            field: attribute.name.clone(),
            statement: cypher.statement.clone(),
            column_name: cypher.column_name.clone(),
            is_list: attribute.attribute_type.is_list,
            comparison,
        }))
    }

    /// Per-concrete-target predicates for a nested `where`. Interface
    /// targets apply the same input to every implementation; union targets
    /// are keyed by member type.
    fn target_filters(
        &self,
        relationship: &RelationshipAdapter<'a>,
        where_: &Map<String, Value>,
        node_key: Option<&str>,
    ) -> Result<Vec<TargetFilter>, TranslationError> {
        let mut targets = Vec::new();
        let is_union = matches!(relationship.target(), EntityAdapter::Composite(c) if c.is_union());
        for target in relationship.target_concrete_entities() {
            let node_where = if is_union {
                match where_.get(target.name()) {
                    Some(member) => Some(expect_object(target.name(), member)?),
                    None if where_.is_empty() => None,
                    None => continue,
                }
            } else {
                Some(where_)
            };
            let mut filters = Vec::new();
            if let Some(node_where) = node_where {
                match node_key {
                    None => filters.extend(self.node_filters(target, node_where)?),
                    Some(_) => filters.extend(self.connection_where(relationship, target, node_where)?),
                }
            }
            targets.push(TargetFilter {
                entity: target.id(),
                filters,
            });
        }
        Ok(targets)
    }

    fn relationship_filter(
        &self,
        relationship: RelationshipAdapter<'a>,
        quantifier: Quantifier,
        value: &Value,
    ) -> Result<Filter, TranslationError> {
        // `director: null` means no related node at all
        if value.is_null() {
            return Ok(Filter::Relationship(RelationshipFilter {
                relationship: relationship.reference(),
                quantifier: Quantifier::None,
                targets: self.target_filters(&relationship, &Map::new(), None)?,
            }));
        }
        let where_ = expect_object(relationship.name(), value)?;
        Ok(Filter::Relationship(RelationshipFilter {
            relationship: relationship.reference(),
            quantifier,
            targets: self.target_filters(&relationship, where_, None)?,
        }))
    }

    fn connection_filter(
        &self,
        relationship: RelationshipAdapter<'a>,
        quantifier: Quantifier,
        value: &Value,
    ) -> Result<Filter, TranslationError> {
        let where_ = expect_object(relationship.name(), value)?;
        Ok(Filter::Relationship(RelationshipFilter {
            relationship: relationship.reference(),
            quantifier,
            targets: self.target_filters(&relationship, where_, Some("node"))?,
        }))
    }

    /// `{ node, edge, AND, OR, NOT }` of a connection `where`.
    pub fn connection_where(
        &self,
        relationship: &RelationshipAdapter<'a>,
        target: ConcreteEntityAdapter<'a>,
        where_: &Map<String, Value>,
    ) -> Result<Vec<Filter>, TranslationError> {
        let mut filters = Vec::new();
        for (key, value) in where_ {
            match key.as_str() {
                "node" => filters.extend(self.node_filters(target, expect_object(key, value)?)?),
                "edge" => filters.extend(self.edge_filters(relationship, expect_object(key, value)?)?),
                "AND" | "OR" => {
                    let mut branches = Vec::new();
                    for branch in expect_objects(key, value)? {
                        branches.extend(Filter::and(self.connection_where(relationship, target, branch)?));
                    }
                    let combined = if key == "AND" {
                        Filter::and(branches)
                    } else {
                        Filter::or(branches)
                    };
                    filters.extend(combined);
                }
                "NOT" => {
                    let inner = self.connection_where(relationship, target, expect_object(key, value)?)?;
                    filters.extend(Filter::and(inner).map(Filter::not));
                }
                // union connection inputs key predicates by member type
                other if other == target.name() => {
                    filters.extend(self.connection_where(relationship, target, expect_object(key, value)?)?)
                }
                other if relationship.target_concrete_entities().iter().any(|e| e.name() == other) => {}
                other => {
                    return Err(TranslationError::unknown_field_with_context(
                        relationship.connection_field(),
                        other,
                    ))
                }
            }
        }
        Ok(filters)
    }

    /// Predicates on relationship properties.
    pub fn edge_filters(
        &self,
        relationship: &RelationshipAdapter<'a>,
        where_: &Map<String, Value>,
    ) -> Result<Vec<Filter>, TranslationError> {
        let mut filters = Vec::new();
        for (key, value) in where_ {
            match key.as_str() {
                "AND" | "OR" => {
                    let mut branches = Vec::new();
                    for branch in expect_objects(key, value)? {
                        branches.extend(Filter::and(self.edge_filters(relationship, branch)?));
                    }
                    let combined = if key == "AND" {
                        Filter::and(branches)
                    } else {
                        Filter::or(branches)
                    };
                    filters.extend(combined);
                }
                "NOT" => {
                    let inner = self.edge_filters(relationship, expect_object(key, value)?)?;
                    filters.extend(Filter::and(inner).map(Filter::not));
                }
                _ => {
                    let (attribute, operator) = match relationship.edge_attribute(key) {
                        Some(attribute) => (attribute, FilterOperator::Eq),
                        None => {
                            let captures = OPERATOR_KEY.captures(key).ok_or_else(|| {
                                TranslationError::unknown_field_with_context(relationship.name(), key)
                            })?;
                            let attribute = relationship.edge_attribute(&captures["field"]).ok_or_else(|| {
                                TranslationError::unknown_field_with_context(relationship.name(), key)
                            })?;
                            let operator =
                                FilterOperator::from_suffix(&captures["op"]).unwrap_or(FilterOperator::Eq);
                            (attribute, operator)
                        }
                    };
                    filters.push(self.attribute_filter(PropertyOwner::Edge, attribute, operator, value)?);
                }
            }
        }
        Ok(filters)
    }

    fn aggregation_filter(
        &self,
        relationship: RelationshipAdapter<'a>,
        key: &str,
        value: &Value,
    ) -> Result<Filter, TranslationError> {
        let target = match relationship.target_ref() {
            EntityRef::Concrete(id) => id,
            EntityRef::Composite(_) => {
                return Err(TranslationError::UnsupportedOperation(format!(
                    "{} on an interface or union relationship",
                    key
                )))
            }
        };
        if !relationship.is_aggregable() {
            return Err(TranslationError::invalid_argument_with_context(
                key,
                "aggregation is disabled for this relationship",
            ));
        }
        let predicates = self.aggregation_predicates(&relationship, target, expect_object(key, value)?)?;
        Ok(Filter::Aggregation(AggregationFilter {
            relationship: relationship.reference(),
            target,
            predicates,
        }))
    }

    fn aggregation_predicates(
        &self,
        relationship: &RelationshipAdapter<'a>,
        target: ConcreteEntityId,
        where_: &Map<String, Value>,
    ) -> Result<Vec<AggregationPredicate>, TranslationError> {
        let mut predicates = Vec::new();
        for (key, value) in where_ {
            match key.as_str() {
                "AND" | "OR" | "NOT" => {
                    let mut children = Vec::new();
                    for branch in expect_objects(key, value)? {
                        let inner = self.aggregation_predicates(relationship, target, branch)?;
                        if inner.len() == 1 {
                            children.extend(inner);
                        } else if !inner.is_empty() {
                            children.push(AggregationPredicate::Logical {
                                operator: LogicalOperator::And,
                                children: inner,
                            });
                        }
                    }
                    let operator = match key.as_str() {
                        "AND" => LogicalOperator::And,
                        "OR" => LogicalOperator::Or,
                        _ => LogicalOperator::Not,
                    };
                    predicates.push(AggregationPredicate::Logical { operator, children });
                }
                "node" => {
                    let entity = ConcreteEntityAdapter::new(self.model, target);
                    for (field_key, field_value) in expect_object(key, value)? {
                        let (attribute, function, comparator) =
                            self.aggregation_key(field_key, |name| entity.attribute(name))?;
                        predicates.push(self.aggregation_property(
                            PropertyOwner::Node,
                            attribute,
                            function,
                            comparator,
                            field_value,
                        )?);
                    }
                }
                "edge" => {
                    for (field_key, field_value) in expect_object(key, value)? {
                        let (attribute, function, comparator) =
                            self.aggregation_key(field_key, |name| relationship.edge_attribute(name))?;
                        predicates.push(self.aggregation_property(
                            PropertyOwner::Edge,
                            attribute,
                            function,
                            comparator,
                            field_value,
                        )?);
                    }
                }
                _ => {
                    let captures = COUNT_KEY.captures(key).ok_or_else(|| {
                        TranslationError::unknown_field_with_context(relationship.aggregate_field(), key)
                    })?;
                    let comparator = captures
                        .name("op")
                        .and_then(|op| AggregationComparator::from_suffix(op.as_str()))
                        .unwrap_or(AggregationComparator::Eq);
                    predicates.push(AggregationPredicate::Count {
                        comparator,
                        value: self.value(value),
                    });
                }
            }
        }
        Ok(predicates)
    }

    fn aggregation_key<F>(
        &self,
        key: &str,
        lookup: F,
    ) -> Result<(AttributeAdapter<'a>, AggregationFunction, AggregationComparator), TranslationError>
    where
        F: Fn(&str) -> Option<AttributeAdapter<'a>>,
    {
        let captures = AGGREGATION_KEY
            .captures(key)
            .ok_or_else(|| TranslationError::unknown_field_with_context("aggregate input", key))?;
        let attribute = lookup(&captures["field"])
            .ok_or_else(|| TranslationError::unknown_field_with_context("aggregate input", key))?;
        let function = AggregationFunction::from_suffix(&captures["agg"])
            .ok_or_else(|| TranslationError::unknown_field_with_context("aggregate input", key))?;
        let comparator = AggregationComparator::from_suffix(&captures["op"])
            .ok_or_else(|| TranslationError::unknown_field_with_context("aggregate input", key))?;
        Ok((attribute, function, comparator))
    }

    fn aggregation_property(
        &self,
        owner: PropertyOwner,
        attribute: AttributeAdapter<'a>,
        function: AggregationFunction,
        comparator: AggregationComparator,
        value: &Value,
    ) -> Result<AggregationPredicate, TranslationError> {
        let scalar = attribute.scalar();
        let is_string = scalar.map(|s| s.is_string_like()).unwrap_or(false);
        let is_numeric = scalar.map(|s| s.is_numeric()).unwrap_or(false);
        let valid = attribute.is_aggregable()
            && match function {
                f if f.applies_to_strings() => is_string,
                AggregationFunction::Average | AggregationFunction::Sum => is_numeric,
                _ => !is_string,
            };
        if !valid {
            return Err(TranslationError::invalid_argument_with_context(
                attribute.name(),
                format!("{:?} aggregation is not available on this field", function),
            ));
        }
        Ok(AggregationPredicate::Property {
            owner,
            property: attribute.database_name().to_string(),
            function,
            comparator,
            value: self.value(value),
        })
    }

    /// `where.jwt` of an authorization rule: comparisons against claims.
    pub fn jwt_filters(&self, where_: &Map<String, Value>) -> Result<Vec<Filter>, TranslationError> {
        let mut filters = Vec::new();
        for (key, value) in where_ {
            match key.as_str() {
                "AND" | "OR" => {
                    let mut branches = Vec::new();
                    for branch in expect_objects(key, value)? {
                        branches.extend(Filter::and(self.jwt_filters(branch)?));
                    }
                    let combined = if key == "AND" {
                        Filter::and(branches)
                    } else {
                        Filter::or(branches)
                    };
                    filters.extend(combined);
                }
                "NOT" => {
                    let inner = self.jwt_filters(expect_object(key, value)?)?;
                    filters.extend(Filter::and(inner).map(Filter::not));
                }
                _ => {
                    let (path, operator) = match OPERATOR_KEY.captures(key) {
                        Some(captures) => (
                            captures["field"].to_string(),
                            FilterOperator::from_suffix(&captures["op"]).unwrap_or(FilterOperator::Eq),
                        ),
                        None => (key.clone(), FilterOperator::Eq),
                    };
                    filters.push(Filter::Jwt {
                        path,
                        operator,
                        value: self.value(value),
                    });
                }
            }
        }
        Ok(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_model::testing::{auth_model, movies_model};
    use serde_json::json;
    use test_case::test_case;

    fn movie(model: &Neo4jGraphQLSchemaModel) -> ConcreteEntityAdapter<'_> {
        ConcreteEntityAdapter::new(model, model.concrete_entity_by_name("Movie").unwrap().id)
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test_case("title", FilterOperator::Eq; "implicit equality")]
    #[test_case("title_EQ", FilterOperator::Eq; "explicit equality")]
    #[test_case("title_STARTS_WITH", FilterOperator::StartsWith; "starts with")]
    #[test_case("released_LTE", FilterOperator::Lte; "less or equal")]
    #[test_case("released_LT", FilterOperator::Lt; "less than")]
    fn test_attribute_operators(key: &str, expected: FilterOperator) {
        let model = movies_model();
        let value = if key.starts_with("title") { json!("A") } else { json!(2000) };
        let filters = FilterFactory::new(&model)
            .node_filters(movie(&model), &object(json!({ key: value })))
            .unwrap();
        match &filters[0] {
            Filter::Property(p) => assert_eq!(p.operator, expected),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_alias_uses_database_name() {
        let model = movies_model();
        let filters = FilterFactory::new(&model)
            .node_filters(movie(&model), &object(json!({ "tagline_CONTAINS": "x" })))
            .unwrap();
        match &filters[0] {
            Filter::Property(p) => assert_eq!(p.property, "tag_line"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_field_is_translation_error() {
        let model = movies_model();
        let err = FilterFactory::new(&model)
            .node_filters(movie(&model), &object(json!({ "budget_GT": 3 })))
            .unwrap_err();
        assert_eq!(
            err,
            TranslationError::unknown_field_with_context("Movie", "budget_GT")
        );
    }

    #[test]
    fn test_unsupported_operator_rejected() {
        let model = movies_model();
        let err = FilterFactory::new(&model)
            .node_filters(movie(&model), &object(json!({ "released_CONTAINS": 3 })))
            .unwrap_err();
        assert!(matches!(err, TranslationError::InvalidArgument { .. }));
    }

    #[test]
    fn test_relationship_quantifiers() {
        let model = movies_model();
        let factory = FilterFactory::new(&model);
        let filters = factory
            .node_filters(
                movie(&model),
                &object(json!({
                    "actors_ALL": { "name_EQ": "Keanu" },
                    "actorsConnection_NONE": { "edge": { "screenTime_GT": 10 } }
                })),
            )
            .unwrap();
        let quantifiers: Vec<_> = filters
            .iter()
            .map(|f| match f {
                Filter::Relationship(r) => r.quantifier,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(quantifiers, vec![Quantifier::All, Quantifier::None]);
        match &filters[1] {
            Filter::Relationship(r) => match &r.targets[0].filters[0] {
                Filter::Property(p) => assert_eq!(p.owner, PropertyOwner::Edge),
                other => panic!("unexpected {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_aggregation_filter() {
        let model = auth_model();
        let user = ConcreteEntityAdapter::new(&model, model.concrete_entity_by_name("User").unwrap().id);
        let filters = FilterFactory::new(&model)
            .node_filters(
                user,
                &object(json!({ "likesAggregate": { "count_GTE": 2, "node": { "someInt_AVERAGE_GT": 5 } } })),
            )
            .unwrap();
        match &filters[0] {
            Filter::Aggregation(a) => {
                assert_eq!(a.predicates.len(), 2);
                assert!(a.predicates.contains(&AggregationPredicate::Property {
                    owner: PropertyOwner::Node,
                    property: "someInt".to_string(),
                    function: AggregationFunction::Average,
                    comparator: AggregationComparator::Gt,
                    value: FilterValue::Param(json!(5)),
                }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_string_length_aggregation_requires_string() {
        let model = auth_model();
        let user = ConcreteEntityAdapter::new(&model, model.concrete_entity_by_name("User").unwrap().id);
        let err = FilterFactory::new(&model)
            .node_filters(
                user,
                &object(json!({ "likesAggregate": { "node": { "someInt_SHORTEST_LENGTH_GT": 5 } } })),
            )
            .unwrap_err();
        assert!(matches!(err, TranslationError::InvalidArgument { .. }));
    }

    #[test]
    fn test_jwt_references_only_in_rules() {
        let model = auth_model();
        let user = ConcreteEntityAdapter::new(&model, model.concrete_entity_by_name("User").unwrap().id);
        let where_ = object(json!({ "id_EQ": "$jwt.sub" }));

        let request = FilterFactory::new(&model).node_filters(user, &where_).unwrap();
        let rule = FilterFactory::for_authorization(&model).node_filters(user, &where_).unwrap();
        match (&request[0], &rule[0]) {
            (Filter::Property(a), Filter::Property(b)) => {
                assert_eq!(a.value, FilterValue::Param(json!("$jwt.sub")));
                assert_eq!(b.value, FilterValue::Jwt("sub".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cypher_field_filters() {
        let model = movies_model();
        let filters = FilterFactory::new(&model)
            .node_filters(
                movie(&model),
                &object(json!({ "actorCount_GT": 2, "topActor": { "name": "Keanu" } })),
            )
            .unwrap();
        assert!(matches!(
            &filters[0],
            Filter::CypherField(CypherFieldFilter { comparison: CypherFieldComparison::Scalar { .. }, .. })
        ));
        assert!(matches!(
            &filters[1],
            Filter::CypherField(CypherFieldFilter { comparison: CypherFieldComparison::Entity { .. }, .. })
        ));
    }

    #[test]
    fn test_logical_keys() {
        let model = movies_model();
        let filters = FilterFactory::new(&model)
            .node_filters(
                movie(&model),
                &object(json!({ "OR": [{ "title": "A" }, { "released_GT": 2000 }], "NOT": { "title": "B" } })),
            )
            .unwrap();
        assert!(matches!(&filters[0], Filter::Logical { operator: LogicalOperator::Or, children } if children.len() == 2));
        assert!(matches!(&filters[1], Filter::Logical { operator: LogicalOperator::Not, .. }));
    }
}
