//! Merges a policy's allow and deny statements into per-resource permissions.
//!
//! The resolver walks the statements once, in order. Allowed actions are
//! merged into the resource's entry (seeded from the policy's default,
//! resource-independent actions) and denied actions are tracked per resource
//! and always removed from that resource's entry, whichever comes first. A
//! resource that is only ever denied gets no entry at all.
//!
//! # Example
//! ```
//! use authz::{resolve, ConditionValues, PolicyDocument, CONSOLE_RESOURCE};
//!
//! let policy = PolicyDocument::parse(br#"{
//!     "Version": "2012-10-17",
//!     "Statement": [{"Effect": "Allow", "Action": ["s3:GetObject"], "Resource": ["arn:aws:s3:::photos/*"]}]
//! }"#).unwrap();
//!
//! let resolved = resolve(&policy, &ConditionValues::new()).unwrap();
//! let permissions = resolved.flatten();
//! assert!(permissions.contains_key(CONSOLE_RESOURCE));
//! assert_eq!(permissions["arn:aws:s3:::photos/*"], vec!["s3:GetObject"]);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::ActionSet;
use crate::condition::ConditionValues;
use crate::error::{AuthzError, Result};
use crate::policy::{Effect, PolicyDocument, Statement};

/// Synthetic resource carrying the policy's resource-independent grants.
pub const CONSOLE_RESOURCE: &str = "console";

/// A prefix-scoped allow grant taken from a statement's condition block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedResource {
    pub resource: String,
    pub prefixes: Vec<String>,
    pub condition_operator: String,
}

/// Output of permission resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPermissions {
    pub permissions: BTreeMap<String, ActionSet>,
    pub allow_resources: Vec<AllowedResource>,
}

impl ResolvedPermissions {
    /// `resource -> [action name]`, actions in set order.
    pub fn flatten(&self) -> BTreeMap<String, Vec<String>> {
        self.permissions
            .iter()
            .map(|(resource, actions)| (resource.clone(), actions.to_names()))
            .collect()
    }
}

#[derive(Deserialize)]
struct PrefixCondition {
    #[serde(rename = "s3:prefix", default)]
    prefixes: Vec<String>,
}

/// Merges statements on top of a fixed set of default actions.
#[derive(Debug, Clone, Default)]
pub struct PermissionResolver {
    default_actions: ActionSet,
}

impl PermissionResolver {
    pub fn new(default_actions: ActionSet) -> Self {
        Self { default_actions }
    }

    pub fn resolve(&self, policy: &PolicyDocument) -> Result<ResolvedPermissions> {
        let mut permissions: BTreeMap<String, ActionSet> = BTreeMap::new();
        let mut denied: BTreeMap<String, ActionSet> = BTreeMap::new();
        let mut allow_resources = Vec::new();

        permissions.insert(CONSOLE_RESOURCE.to_string(), self.default_actions.clone());

        for statement in &policy.statements {
            for resource in &statement.resources {
                let resource = resource.to_string();
                match statement.effect {
                    Effect::Allow => {
                        let denied_here = denied.get(&resource);
                        let added = match denied_here {
                            Some(denied_here) => statement.actions.difference(denied_here),
                            None => statement.actions.clone(),
                        };
                        let base = permissions.get(&resource).unwrap_or(&self.default_actions);
                        let mut merged = base.union(&added);
                        if let Some(denied_here) = denied_here {
                            merged = merged.difference(denied_here);
                        }
                        permissions.insert(resource.clone(), merged);

                        allow_resources.extend(prefix_grants(&resource, statement)?);
                    }
                    Effect::Deny => {
                        let denied_here = denied.entry(resource.clone()).or_default();
                        *denied_here = denied_here.union(&statement.actions);
                        if let Some(allowed) = permissions.get_mut(&resource) {
                            *allowed = allowed.difference(denied_here);
                        }
                    }
                }
            }
        }

        debug!(
            resources = permissions.len(),
            allow_resources = allow_resources.len(),
            "Resolved policy permissions"
        );

        Ok(ResolvedPermissions {
            permissions,
            allow_resources,
        })
    }
}

/// One grant per condition operator of an Allow statement.
fn prefix_grants(resource: &str, statement: &Statement) -> Result<Vec<AllowedResource>> {
    let encoded = serde_json::to_value(&statement.conditions)
        .map_err(|e| AuthzError::ConditionEncoding(e.to_string()))?;
    let by_operator: BTreeMap<String, PrefixCondition> = serde_json::from_value(encoded)
        .map_err(|e| AuthzError::ConditionEncoding(e.to_string()))?;

    Ok(by_operator
        .into_iter()
        .map(|(operator, condition)| AllowedResource {
            resource: resource.to_string(),
            prefixes: condition.prefixes,
            condition_operator: operator,
        })
        .collect())
}

/// Resolves `policy` using its own default actions under `values`.
pub fn resolve(policy: &PolicyDocument, values: &ConditionValues) -> Result<ResolvedPermissions> {
    let default_actions = policy.allowed_actions("", "", values);
    PermissionResolver::new(default_actions).resolve(policy)
}
