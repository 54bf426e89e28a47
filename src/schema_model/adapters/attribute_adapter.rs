use serde_json::Value;

use crate::schema_model::attribute::{Attribute, AttributeKind, ScalarType};

/// Comparison operators accepted in `where` inputs (`title_CONTAINS`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    In,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    Includes,
}

impl FilterOperator {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let operator = match suffix {
            "EQ" => FilterOperator::Eq,
            "IN" => FilterOperator::In,
            "LT" => FilterOperator::Lt,
            "LTE" => FilterOperator::Lte,
            "GT" => FilterOperator::Gt,
            "GTE" => FilterOperator::Gte,
            "CONTAINS" => FilterOperator::Contains,
            "STARTS_WITH" => FilterOperator::StartsWith,
            "ENDS_WITH" => FilterOperator::EndsWith,
            "MATCHES" => FilterOperator::Matches,
            "INCLUDES" => FilterOperator::Includes,
            _ => return None,
        };
        Some(operator)
    }
}

const STRING_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Eq,
    FilterOperator::In,
    FilterOperator::Lt,
    FilterOperator::Lte,
    FilterOperator::Gt,
    FilterOperator::Gte,
    FilterOperator::Contains,
    FilterOperator::StartsWith,
    FilterOperator::EndsWith,
    FilterOperator::Matches,
];
const ORDERED_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Eq,
    FilterOperator::In,
    FilterOperator::Lt,
    FilterOperator::Lte,
    FilterOperator::Gt,
    FilterOperator::Gte,
];
const EQUALITY_OPERATORS: &[FilterOperator] = &[FilterOperator::Eq, FilterOperator::In];
const LIST_OPERATORS: &[FilterOperator] = &[FilterOperator::Eq, FilterOperator::Includes];

#[derive(Debug, Clone, Copy)]
pub struct AttributeAdapter<'a> {
    pub attribute: &'a Attribute,
}

impl<'a> AttributeAdapter<'a> {
    pub fn new(attribute: &'a Attribute) -> Self {
        AttributeAdapter { attribute }
    }

    pub fn name(&self) -> &'a str {
        &self.attribute.name
    }

    pub fn database_name(&self) -> &'a str {
        &self.attribute.database_name
    }

    pub fn scalar(&self) -> Option<ScalarType> {
        self.attribute.attribute_type.scalar()
    }

    pub fn is_list(&self) -> bool {
        self.attribute.attribute_type.is_list
    }

    pub fn is_required(&self) -> bool {
        self.attribute.attribute_type.is_required
    }

    pub fn coalesce_value(&self) -> Option<&'a Value> {
        self.attribute.coalesce_value()
    }

    /// Operators a `where` input may apply to this attribute.
    pub fn filter_operators(&self) -> &'static [FilterOperator] {
        if self.is_list() {
            return LIST_OPERATORS;
        }
        match &self.attribute.attribute_type.kind {
            AttributeKind::Scalar(scalar) if scalar.is_string_like() => STRING_OPERATORS,
            AttributeKind::Scalar(scalar) if scalar.is_numeric() || scalar.is_temporal() => {
                ORDERED_OPERATORS
            }
            AttributeKind::Scalar(_) | AttributeKind::Enum(_) => EQUALITY_OPERATORS,
            AttributeKind::Object(_) => &[],
        }
    }

    pub fn supports(&self, operator: FilterOperator) -> bool {
        self.filter_operators().contains(&operator)
    }

    pub fn is_filterable(&self) -> bool {
        !self.attribute.is_custom_resolved() && !self.filter_operators().is_empty()
    }

    pub fn is_sortable(&self) -> bool {
        !self.is_list()
            && !self.attribute.is_custom_resolved()
            && !matches!(self.attribute.attribute_type.kind, AttributeKind::Object(_))
    }

    /// Scalars that `<rel>Aggregate` selections and filters can summarise.
    pub fn is_aggregable(&self) -> bool {
        if self.is_list() || !self.attribute.is_persisted() {
            return false;
        }
        match self.scalar() {
            Some(scalar) => scalar.is_numeric() || scalar.is_string_like() || scalar.is_temporal(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_model::annotations::Annotations;
    use crate::schema_model::attribute::{AttributeFlags, AttributeType};

    fn attribute(kind: AttributeKind, is_list: bool) -> Attribute {
        Attribute {
            name: "x".to_string(),
            attribute_type: AttributeType {
                kind,
                is_list,
                is_required: false,
                list_items_required: false,
            },
            database_name: "x".to_string(),
            flags: AttributeFlags::default(),
            annotations: Annotations::default(),
            cypher_target: None,
        }
    }

    #[test]
    fn test_filter_operators_follow_type() {
        let title = attribute(AttributeKind::Scalar(ScalarType::String), false);
        assert!(AttributeAdapter::new(&title).supports(FilterOperator::Contains));

        let year = attribute(AttributeKind::Scalar(ScalarType::Int), false);
        assert!(AttributeAdapter::new(&year).supports(FilterOperator::Gte));
        assert!(!AttributeAdapter::new(&year).supports(FilterOperator::Contains));

        let flag = attribute(AttributeKind::Scalar(ScalarType::Boolean), false);
        assert!(!AttributeAdapter::new(&flag).supports(FilterOperator::Gt));

        let tags = attribute(AttributeKind::Scalar(ScalarType::String), true);
        assert!(AttributeAdapter::new(&tags).supports(FilterOperator::Includes));
        assert!(!AttributeAdapter::new(&tags).is_aggregable());
    }
}
