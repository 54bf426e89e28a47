use serde::{Deserialize, Serialize};

use super::attribute::Attribute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    Query,
    Mutation,
}

impl OperationType {
    pub fn type_name(&self) -> &'static str {
        match self {
            OperationType::Query => "Query",
            OperationType::Mutation => "Mutation",
        }
    }
}

/// A root type (`Query` / `Mutation`) declared in the document.
#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    pub operation_type: OperationType,
    /// `@cypher` fields the translator resolves itself
    pub user_resolved_attributes: Vec<Attribute>,
    /// Fields resolved outside the database (`@customResolver` or plain)
    pub custom_resolved_attributes: Vec<Attribute>,
}

impl Operation {
    pub fn user_resolved_attribute(&self, name: &str) -> Option<&Attribute> {
        self.user_resolved_attributes.iter().find(|a| a.name == name)
    }

    pub fn is_custom_resolved(&self, name: &str) -> bool {
        self.custom_resolved_attributes.iter().any(|a| a.name == name)
    }
}
