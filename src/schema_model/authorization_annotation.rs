//! Typed form of `@authorization(filter: [...], validate: [...])`.
//!
//! Rules keep their `where.node` input as structured JSON; it is turned
//! into predicate nodes against the owning entity when an operation is
//! woven (see `authorization::weaver`).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationOperation {
    Read,
    Aggregate,
    Create,
    Update,
    Delete,
    CreateRelationship,
    DeleteRelationship,
}

impl AuthorizationOperation {
    pub const ALL: [AuthorizationOperation; 7] = [
        AuthorizationOperation::Read,
        AuthorizationOperation::Aggregate,
        AuthorizationOperation::Create,
        AuthorizationOperation::Update,
        AuthorizationOperation::Delete,
        AuthorizationOperation::CreateRelationship,
        AuthorizationOperation::DeleteRelationship,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationWhen {
    Before,
    After,
}

/// `{ node, jwt, AND, OR, NOT }` of a single rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationWhere {
    #[serde(default)]
    pub node: Option<Map<String, Value>>,
    #[serde(default)]
    pub jwt: Option<Map<String, Value>>,
    #[serde(default, rename = "AND")]
    pub and: Vec<AuthorizationWhere>,
    #[serde(default, rename = "OR")]
    pub or: Vec<AuthorizationWhere>,
    #[serde(default, rename = "NOT")]
    pub not: Option<Box<AuthorizationWhere>>,
}

impl AuthorizationWhere {
    pub fn is_empty(&self) -> bool {
        self.node.is_none()
            && self.jwt.is_none()
            && self.and.is_empty()
            && self.or.is_empty()
            && self.not.is_none()
    }
}

fn default_filter_operations() -> Vec<AuthorizationOperation> {
    vec![
        AuthorizationOperation::Read,
        AuthorizationOperation::Aggregate,
        AuthorizationOperation::Update,
        AuthorizationOperation::Delete,
        AuthorizationOperation::CreateRelationship,
        AuthorizationOperation::DeleteRelationship,
    ]
}

fn default_validate_operations() -> Vec<AuthorizationOperation> {
    AuthorizationOperation::ALL.to_vec()
}

fn default_when() -> Vec<AuthorizationWhen> {
    vec![AuthorizationWhen::Before, AuthorizationWhen::After]
}

fn default_true() -> bool {
    true
}

/// GraphQL input coercion: a lone enum value stands for a one-element list.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationFilterRule {
    #[serde(default = "default_filter_operations", deserialize_with = "one_or_many")]
    pub operations: Vec<AuthorizationOperation>,
    #[serde(default = "default_true")]
    pub require_authentication: bool,
    #[serde(default, rename = "where")]
    pub where_: AuthorizationWhere,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationValidationRule {
    #[serde(default = "default_validate_operations", deserialize_with = "one_or_many")]
    pub operations: Vec<AuthorizationOperation>,
    #[serde(default = "default_when", deserialize_with = "one_or_many")]
    pub when: Vec<AuthorizationWhen>,
    #[serde(default = "default_true")]
    pub require_authentication: bool,
    #[serde(default, rename = "where")]
    pub where_: AuthorizationWhere,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationAnnotation {
    #[serde(default)]
    pub filter: Vec<AuthorizationFilterRule>,
    #[serde(default)]
    pub validate: Vec<AuthorizationValidationRule>,
}

impl AuthorizationAnnotation {
    /// Several `@authorization` directives on one declaration (type plus
    /// `extend type`) accumulate.
    pub fn merge(&mut self, other: AuthorizationAnnotation) {
        self.filter.extend(other.filter);
        self.validate.extend(other.validate);
    }

    pub fn filter_rules_for(
        &self,
        operation: AuthorizationOperation,
    ) -> impl Iterator<Item = &AuthorizationFilterRule> {
        self.filter
            .iter()
            .filter(move |rule| rule.operations.contains(&operation))
    }

    pub fn validate_rules_for(
        &self,
        operation: AuthorizationOperation,
        when: AuthorizationWhen,
    ) -> impl Iterator<Item = &AuthorizationValidationRule> {
        self.validate.iter().filter(move |rule| {
            rule.operations.contains(&operation) && rule.when.contains(&when)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_defaults() {
        let annotation: AuthorizationAnnotation = serde_json::from_value(json!({
            "filter": [{ "where": { "node": { "id_EQ": "$jwt.sub" } } }],
            "validate": [{ "where": { "jwt": { "roles_INCLUDES": "admin" } } }]
        }))
        .unwrap();
        let filter = &annotation.filter[0];
        assert!(filter.require_authentication);
        assert!(!filter.operations.contains(&AuthorizationOperation::Create));
        let validate = &annotation.validate[0];
        assert_eq!(validate.operations.len(), 7);
        assert_eq!(validate.when, vec![AuthorizationWhen::Before, AuthorizationWhen::After]);
    }

    #[test]
    fn test_rules_selected_by_operation_and_when() {
        let annotation: AuthorizationAnnotation = serde_json::from_value(json!({
            "validate": [
                { "operations": ["CREATE"], "when": ["AFTER"], "where": { "node": { "a_EQ": 1 } } },
                { "operations": ["UPDATE"], "when": ["BEFORE"], "where": { "node": { "a_EQ": 2 } } }
            ]
        }))
        .unwrap();
        assert_eq!(
            annotation
                .validate_rules_for(AuthorizationOperation::Create, AuthorizationWhen::After)
                .count(),
            1
        );
        assert_eq!(
            annotation
                .validate_rules_for(AuthorizationOperation::Create, AuthorizationWhen::Before)
                .count(),
            0
        );
    }

    #[test]
    fn test_single_when_value_is_coerced_to_list() {
        let rule: AuthorizationValidationRule = serde_json::from_value(json!({
            "when": "BEFORE",
            "where": { "node": { "id_EQ": "$jwt.sub" } }
        }))
        .unwrap();
        assert_eq!(rule.when, vec![AuthorizationWhen::Before]);
    }
}
