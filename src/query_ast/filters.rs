//! Predicate tree of the operation tree.
//!
//! Filters reference the schema by id (entities, relationships) and carry
//! every user value as a [`FilterValue`]; nothing here is query text yet.

use serde_json::Value;

use crate::schema_model::{ConcreteEntityId, FilterOperator, ScalarType};
use crate::schema_model::relationship::RelationshipRef;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A request (or rule) literal, always emitted as a parameter
    Param(Value),
    /// Dotted path into the JWT claims (`"$jwt.sub"` → `sub`)
    Jwt(String),
}

impl FilterValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Param(Value::Null))
    }
}

/// Whether a property lives on the matched node or on the relationship
/// that reached it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyOwner {
    Node,
    Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    All,
    None,
    Single,
}

impl Quantifier {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "SOME" => Some(Quantifier::Some),
            "ALL" => Some(Quantifier::All),
            "NONE" => Some(Quantifier::None),
            "SINGLE" => Some(Quantifier::Single),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFilter {
    pub owner: PropertyOwner,
    /// Field name as declared
    pub field: String,
    /// Stored property key
    pub property: String,
    pub scalar: Option<ScalarType>,
    pub is_list: bool,
    pub coalesce: Option<Value>,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

/// Predicates on the nodes one relationship reaches, for one concrete
/// target type. Edge predicates are property filters owned by
/// [`PropertyOwner::Edge`].
#[derive(Debug, Clone, PartialEq)]
pub struct TargetFilter {
    pub entity: ConcreteEntityId,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipFilter {
    pub relationship: RelationshipRef,
    pub quantifier: Quantifier,
    /// One entry per concrete type the predicate applies to; more than one
    /// only for interface and union targets
    pub targets: Vec<TargetFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationFunction {
    Min,
    Max,
    Average,
    Sum,
    ShortestLength,
    LongestLength,
    AverageLength,
}

impl AggregationFunction {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "MIN" => Some(AggregationFunction::Min),
            "MAX" => Some(AggregationFunction::Max),
            "AVERAGE" => Some(AggregationFunction::Average),
            "SUM" => Some(AggregationFunction::Sum),
            "SHORTEST_LENGTH" => Some(AggregationFunction::ShortestLength),
            "LONGEST_LENGTH" => Some(AggregationFunction::LongestLength),
            "AVERAGE_LENGTH" => Some(AggregationFunction::AverageLength),
            _ => None,
        }
    }

    pub fn applies_to_strings(&self) -> bool {
        matches!(
            self,
            AggregationFunction::ShortestLength
                | AggregationFunction::LongestLength
                | AggregationFunction::AverageLength
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationComparator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl AggregationComparator {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "EQ" => Some(AggregationComparator::Eq),
            "GT" => Some(AggregationComparator::Gt),
            "GTE" => Some(AggregationComparator::Gte),
            "LT" => Some(AggregationComparator::Lt),
            "LTE" => Some(AggregationComparator::Lte),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationPredicate {
    Count {
        comparator: AggregationComparator,
        value: FilterValue,
    },
    Property {
        owner: PropertyOwner,
        property: String,
        function: AggregationFunction,
        comparator: AggregationComparator,
        value: FilterValue,
    },
    Logical {
        operator: LogicalOperator,
        children: Vec<AggregationPredicate>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationFilter {
    pub relationship: RelationshipRef,
    pub target: ConcreteEntityId,
    /// ANDed together
    pub predicates: Vec<AggregationPredicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CypherFieldComparison {
    Scalar {
        scalar: Option<ScalarType>,
        operator: FilterOperator,
        value: FilterValue,
    },
    /// Nested `where` on the node(s) a `@cypher` field returns
    Entity {
        entity: ConcreteEntityId,
        filters: Vec<Filter>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CypherFieldFilter {
    pub field: String,
    pub statement: String,
    pub column_name: String,
    pub is_list: bool,
    pub comparison: CypherFieldComparison,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Property(PropertyFilter),
    Logical {
        operator: LogicalOperator,
        children: Vec<Filter>,
    },
    Relationship(RelationshipFilter),
    Aggregation(AggregationFilter),
    /// `typename_IN`: the node is one of these concrete types
    TypeName { entities: Vec<ConcreteEntityId> },
    CypherField(CypherFieldFilter),
    /// Comparison against a JWT claim (`where.jwt` of a rule)
    Jwt {
        path: String,
        operator: FilterOperator,
        value: FilterValue,
    },
    /// The request carries a verified token
    Authenticated,
}

impl Filter {
    /// Conjunction of `filters`, flattened; `None` when there is nothing to
    /// check.
    pub fn and(filters: Vec<Filter>) -> Option<Filter> {
        Self::combine(LogicalOperator::And, filters)
    }

    pub fn or(filters: Vec<Filter>) -> Option<Filter> {
        Self::combine(LogicalOperator::Or, filters)
    }

    pub fn not(filter: Filter) -> Filter {
        Filter::Logical {
            operator: LogicalOperator::Not,
            children: vec![filter],
        }
    }

    fn combine(operator: LogicalOperator, filters: Vec<Filter>) -> Option<Filter> {
        let mut children = Vec::with_capacity(filters.len());
        for filter in filters {
            match filter {
                Filter::Logical {
                    operator: inner,
                    children: nested,
                } if inner == operator => children.extend(nested),
                other => children.push(other),
            }
        }
        dedup(&mut children);
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(Filter::Logical { operator, children }),
        }
    }

    /// Whether rendering this predicate needs the JWT parameters.
    pub fn uses_jwt(&self) -> bool {
        match self {
            Filter::Property(p) => matches!(p.value, FilterValue::Jwt(_)),
            Filter::Logical { children, .. } => children.iter().any(Filter::uses_jwt),
            Filter::Relationship(r) => r
                .targets
                .iter()
                .any(|t| t.filters.iter().any(Filter::uses_jwt)),
            Filter::Aggregation(a) => a.predicates.iter().any(AggregationPredicate::uses_jwt),
            Filter::TypeName { .. } => false,
            Filter::CypherField(c) => match &c.comparison {
                CypherFieldComparison::Scalar { value, .. } => matches!(value, FilterValue::Jwt(_)),
                CypherFieldComparison::Entity { filters, .. } => filters.iter().any(Filter::uses_jwt),
            },
            Filter::Jwt { .. } | Filter::Authenticated => true,
        }
    }
}

impl AggregationPredicate {
    fn uses_jwt(&self) -> bool {
        match self {
            AggregationPredicate::Count { value, .. }
            | AggregationPredicate::Property { value, .. } => matches!(value, FilterValue::Jwt(_)),
            AggregationPredicate::Logical { children, .. } => {
                children.iter().any(AggregationPredicate::uses_jwt)
            }
        }
    }
}

/// Drop structurally equal predicates, keeping first occurrences.
pub fn dedup(filters: &mut Vec<Filter>) {
    let mut unique: Vec<Filter> = Vec::with_capacity(filters.len());
    for filter in filters.drain(..) {
        if !unique.contains(&filter) {
            unique.push(filter);
        }
    }
    *filters = unique;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn title_eq(value: &str) -> Filter {
        Filter::Property(PropertyFilter {
            owner: PropertyOwner::Node,
            field: "title".to_string(),
            property: "title".to_string(),
            scalar: Some(ScalarType::String),
            is_list: false,
            coalesce: None,
            operator: FilterOperator::Eq,
            value: FilterValue::Param(json!(value)),
        })
    }

    #[test]
    fn test_and_flattens_and_dedups() {
        let nested = Filter::and(vec![title_eq("a"), title_eq("b")]).unwrap();
        let combined = Filter::and(vec![nested, title_eq("a")]).unwrap();
        match combined {
            Filter::Logical { operator, children } => {
                assert_eq!(operator, LogicalOperator::And);
                assert_eq!(children, vec![title_eq("a"), title_eq("b")]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(Filter::and(vec![]), None);
        assert_eq!(Filter::or(vec![title_eq("a")]), Some(title_eq("a")));
        assert_eq!(
            Filter::and(vec![title_eq("a"), title_eq("a")]),
            Some(title_eq("a"))
        );
    }

    #[test]
    fn test_uses_jwt() {
        assert!(!title_eq("a").uses_jwt());
        assert!(Filter::Authenticated.uses_jwt());
        let jwt = Filter::Property(PropertyFilter {
            value: FilterValue::Jwt("sub".to_string()),
            ..match title_eq("a") {
                Filter::Property(p) => p,
                _ => unreachable!(),
            }
        });
        assert!(Filter::not(jwt).uses_jwt());
    }
}
