//! Where a relationship field was first declared.
//!
//! A relationship field on a node type may re-declare a field of one of its
//! interfaces, which may itself re-declare a field of its own interfaces.
//! Walking the implements-chain upward, the topmost interface that declares
//! the field is the "first declared" one.
//!
//! Two sibling interfaces in the same implements-list can both declare the
//! field (a diamond). Which one wins is an explicit policy rather than an
//! accident of iteration order; see [`InterfaceConflictPolicy`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use super::definitions::{parse_type_ref, TypeDefinition};
use super::errors::SchemaValidationError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceConflictPolicy {
    /// The sibling listed last in the implements-list wins
    #[default]
    LastDeclared,
    /// The sibling listed first in the implements-list wins
    FirstDeclared,
    /// Two different declaring siblings fail the schema build
    Reject,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown interface conflict policy `{0}` (expected last_declared, first_declared or reject)")]
pub struct UnknownConflictPolicy(pub String);

impl FromStr for InterfaceConflictPolicy {
    type Err = UnknownConflictPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last_declared" => Ok(InterfaceConflictPolicy::LastDeclared),
            "first_declared" => Ok(InterfaceConflictPolicy::FirstDeclared),
            "reject" => Ok(InterfaceConflictPolicy::Reject),
            _ => Err(UnknownConflictPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationOrigin {
    pub interface: String,
    pub target: String,
}

pub struct DeclarationOriginResolver<'d> {
    definitions: &'d HashMap<&'d str, &'d TypeDefinition>,
    policy: InterfaceConflictPolicy,
}

impl<'d> DeclarationOriginResolver<'d> {
    pub fn new(
        definitions: &'d HashMap<&'d str, &'d TypeDefinition>,
        policy: InterfaceConflictPolicy,
    ) -> Self {
        DeclarationOriginResolver {
            definitions,
            policy,
        }
    }

    /// Resolve the origin of `field` for a type implementing `implements`.
    pub fn resolve(
        &self,
        owner: &str,
        field: &str,
        implements: &[String],
    ) -> Result<Option<DeclarationOrigin>, SchemaValidationError> {
        let mut visiting = vec![owner.to_string()];
        self.resolve_in(owner, field, implements, &mut visiting)
    }

    fn resolve_in(
        &self,
        owner: &str,
        field: &str,
        implements: &[String],
        visiting: &mut Vec<String>,
    ) -> Result<Option<DeclarationOrigin>, SchemaValidationError> {
        let mut candidates: Vec<DeclarationOrigin> = Vec::new();

        for interface_name in implements {
            if visiting.contains(interface_name) {
                continue;
            }
            let interface = match self.definitions.get(interface_name.as_str()) {
                Some(TypeDefinition::Interface(def)) => def,
                _ => continue,
            };

            let mut branch = match interface.field(field) {
                Some(declared) => Some(DeclarationOrigin {
                    interface: interface.name.clone(),
                    target: parse_type_ref(&declared.type_ref)?.named_type().to_string(),
                }),
                None => None,
            };

            visiting.push(interface_name.clone());
            let higher = self.resolve_in(owner, field, &interface.implements, visiting)?;
            visiting.pop();

            // topmost ancestor wins within a branch
            if higher.is_some() {
                branch = higher;
            }
            if let Some(origin) = branch {
                candidates.push(origin);
            }
        }

        self.choose(owner, field, candidates)
    }

    fn choose(
        &self,
        owner: &str,
        field: &str,
        mut candidates: Vec<DeclarationOrigin>,
    ) -> Result<Option<DeclarationOrigin>, SchemaValidationError> {
        if candidates.is_empty() {
            return Ok(None);
        }
        let first = candidates[0].clone();
        if let Some(conflict) = candidates.iter().find(|c| c.interface != first.interface) {
            match self.policy {
                InterfaceConflictPolicy::Reject => {
                    return Err(SchemaValidationError::AmbiguousRelationshipDeclaration {
                        type_name: owner.to_string(),
                        field: field.to_string(),
                        first: first.interface,
                        second: conflict.interface.clone(),
                    })
                }
                policy => log::warn!(
                    "{}.{} is declared by sibling interfaces `{}` and `{}`; resolving with {:?}",
                    owner,
                    field,
                    first.interface,
                    conflict.interface,
                    policy
                ),
            }
        }
        let chosen = match self.policy {
            InterfaceConflictPolicy::FirstDeclared | InterfaceConflictPolicy::Reject => {
                candidates.swap_remove(0)
            }
            InterfaceConflictPolicy::LastDeclared => candidates.pop().unwrap_or(first),
        };
        Ok(Some(chosen))
    }
}
