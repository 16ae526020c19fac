//! IAM policy documents: parsing, validation and request evaluation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{supported_actions, Action, ActionSet};
use crate::condition::{ConditionValues, Conditions};
use crate::error::{AuthzError, Result};
use crate::resource::ResourceSet;

/// The only dated policy language version accepted.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Whether a statement grants or denies its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    /// Applies the effect to the outcome of a statement match: an Allow
    /// statement allows what it matches, a Deny statement allows what it
    /// does not.
    pub fn is_allowed(self, matched: bool) -> bool {
        match self {
            Effect::Allow => matched,
            Effect::Deny => !matched,
        }
    }
}

/// The request being evaluated against a policy.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    pub action: &'a Action,
    pub bucket: &'a str,
    pub object: &'a str,
    pub values: &'a ConditionValues,
}

impl Args<'_> {
    /// The `bucket/object` path resources are matched against. An empty object
    /// yields `bucket/`.
    fn resource_path(&self) -> String {
        let mut resource = self.bucket.to_string();
        if self.object.is_empty() {
            resource.push('/');
        } else {
            if !self.object.starts_with('/') {
                resource.push('/');
            }
            resource.push_str(self.object);
        }
        resource
    }
}

/// One allow/deny rule of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sid: String,
    pub effect: Effect,
    #[serde(rename = "Action")]
    pub actions: ActionSet,
    #[serde(rename = "Resource", default, skip_serializing_if = "ResourceSet::is_empty")]
    pub resources: ResourceSet,
    #[serde(rename = "Condition", default, skip_serializing_if = "Conditions::is_empty")]
    pub conditions: Conditions,
}

impl Statement {
    pub fn new(effect: Effect, actions: ActionSet, resources: ResourceSet) -> Self {
        Self {
            sid: String::new(),
            effect,
            actions,
            resources,
            conditions: Conditions::default(),
        }
    }

    /// True when every action is an admin, KMS or STS action, which carry no
    /// object storage resource.
    fn is_resourceless(&self) -> bool {
        !self.actions.is_empty()
            && self
                .actions
                .iter()
                .all(|a| a.is_admin() || a.is_kms() || a.is_sts())
    }

    pub fn validate(&self) -> Result<()> {
        if self.actions.is_empty() {
            return Err(AuthzError::InvalidStatement(format!(
                "statement `{}` has no actions",
                self.sid
            )));
        }
        if let Some(action) = self.actions.iter().find(|a| !a.is_valid()) {
            return Err(AuthzError::InvalidStatement(format!(
                "unsupported action `{action}`"
            )));
        }
        if self.resources.is_empty() && !self.is_resourceless() {
            return Err(AuthzError::InvalidStatement(format!(
                "statement `{}` has no resources",
                self.sid
            )));
        }
        Ok(())
    }

    fn matches(&self, args: &Args<'_>) -> bool {
        if !self.actions.matches(args.action) {
            return false;
        }
        if !self.is_resourceless() && !self.resources.matches(&args.resource_path(), args.values) {
            return false;
        }
        self.conditions.evaluate(args.values)
    }

    /// Whether this statement, taken alone, lets the request through.
    pub fn is_allowed(&self, args: &Args<'_>) -> bool {
        self.effect.is_allowed(self.matches(args))
    }
}

/// A parsed IAM policy document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "Statement", default, deserialize_with = "statements::deserialize")]
    pub statements: Vec<Statement>,
}

impl PolicyDocument {
    /// Parses and validates a policy. A `null` or blank body is the empty policy.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let trimmed = bytes.trim_ascii();
        if trimmed.is_empty() || trimmed == b"null" {
            return Ok(Self::default());
        }

        let policy: PolicyDocument = serde_json::from_slice(trimmed)?;
        policy.validate()?;
        debug!(statements = policy.statements.len(), "Parsed policy document");
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.is_empty() && self.version != POLICY_VERSION {
            return Err(AuthzError::InvalidVersion(self.version.clone()));
        }
        self.statements.iter().try_for_each(Statement::validate)
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Any matching Deny wins; otherwise any matching Allow grants.
    pub fn is_allowed(&self, args: &Args<'_>) -> bool {
        let denied = self
            .statements
            .iter()
            .filter(|s| s.effect == Effect::Deny)
            .any(|s| !s.is_allowed(args));
        if denied {
            return false;
        }

        self.statements
            .iter()
            .filter(|s| s.effect == Effect::Allow)
            .any(|s| s.is_allowed(args))
    }

    /// Every catalogue action this policy allows on `bucket`/`object`.
    pub fn allowed_actions(&self, bucket: &str, object: &str, values: &ConditionValues) -> ActionSet {
        supported_actions()
            .filter(|action| {
                self.is_allowed(&Args {
                    action,
                    bucket,
                    object,
                    values,
                })
            })
            .collect()
    }
}

mod statements {
    use serde::{Deserialize, Deserializer};

    use super::Statement;

    /// Accepts a single statement object as well as an array.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Statement>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(Box<Statement>),
            Many(Vec<Statement>),
        }

        Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(OneOrMany::One(statement)) => vec![*statement],
            Some(OneOrMany::Many(statements)) => statements,
        })
    }
}
