use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use session::SessionStatus;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// A prefix-scoped allow grant
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllowResource {
    #[schema(example = "arn:aws:s3:::bucket1/*")]
    pub resource: String,
    pub prefixes: Vec<String>,
    #[schema(example = "StringEquals")]
    pub condition_operator: String,
}

/// Permissions, features and topology of the current session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// True when the storage server runs erasure-coded
    pub distributed_mode: bool,
    /// Resource to allowed action names
    pub permissions: BTreeMap<String, Vec<String>>,
    pub allow_resources: Vec<AllowResource>,
    pub features: Vec<String>,
    pub server_end_point: String,
}

impl From<SessionStatus> for SessionResponse {
    fn from(status: SessionStatus) -> Self {
        Self {
            status: status.status,
            distributed_mode: status.distributed_mode,
            permissions: status.permissions,
            allow_resources: status
                .allow_resources
                .into_iter()
                .map(|entry| AllowResource {
                    resource: entry.resource,
                    prefixes: entry.prefixes,
                    condition_operator: entry.condition_operator,
                })
                .collect(),
            features: status.features,
            server_end_point: status.server_end_point,
        }
    }
}

/// STS credentials to open a console session with
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub session_token: String,
    #[serde(default)]
    pub hide_menu: bool,
    #[serde(default)]
    pub object_browser_only: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Storage server this console talks to
    pub storage_endpoint: String,
}
