//! Session status resolution: from a principal to permissions and features.

use std::collections::BTreeMap;
use std::sync::Arc;

use authz::{AllowedResource, PermissionResolver, PolicyDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::admin::AdminClientProvider;
use crate::conditions::session_condition_values;
use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::features::enabled_features;
use crate::policy_vars::replace_policy_variables;
use crate::principal::Principal;
use crate::token::decode_claims;

/// What the console UI needs to know about the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub status: String,
    pub distributed_mode: bool,
    pub permissions: BTreeMap<String, Vec<String>>,
    pub allow_resources: Vec<AllowedResource>,
    pub features: Vec<String>,
    pub server_end_point: String,
}

/// Resolves session status against the storage server.
#[derive(Clone)]
pub struct SessionResolver {
    config: Arc<ConsoleConfig>,
    admin: Arc<dyn AdminClientProvider>,
}

impl SessionResolver {
    pub fn new(config: Arc<ConsoleConfig>, admin: Arc<dyn AdminClientProvider>) -> Self {
        Self { config, admin }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn admin(&self) -> &dyn AdminClientProvider {
        self.admin.as_ref()
    }

    pub async fn resolve(&self, principal: &Principal) -> Result<SessionStatus> {
        self.resolve_at(principal, Utc::now()).await
    }

    /// Resolves with an explicit evaluation time for time-based conditions.
    pub async fn resolve_at(&self, principal: &Principal, now: DateTime<Utc>) -> Result<SessionStatus> {
        let claims = decode_claims(&principal.sts_session_token)?;

        let client = self.admin.connect(&principal.credentials())?;
        let account = client.account_info().await?;
        debug!(account = %account.account_name, "Fetched account info");

        let raw_policy = replace_policy_variables(&claims, &account);
        let policy = PolicyDocument::parse(&raw_policy)?;

        let values = session_condition_values(principal, &claims, &self.config, now);
        let default_actions = policy.allowed_actions("", "", &values);
        let resolved = PermissionResolver::new(default_actions).resolve(&policy)?;

        info!(
            account = %account.account_name,
            resources = resolved.permissions.len(),
            "Resolved session permissions"
        );

        Ok(SessionStatus {
            status: "ok".to_string(),
            distributed_mode: account.is_erasure(),
            permissions: resolved.flatten(),
            allow_resources: resolved.allow_resources,
            features: enabled_features(&self.config, principal),
            server_end_point: self.config.minio_server.clone(),
        })
    }
}
