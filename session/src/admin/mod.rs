//! Storage admin API: account info and the client seams used to fetch it.

pub mod client;
pub mod signer;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{Result, SessionError};
use crate::principal::Credentials;

pub use client::{HttpAdminClient, HttpAdminClientProvider};

/// Storage backend topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    Unknown,
    Fs,
    Erasure,
}

impl From<u8> for ServerType {
    fn from(value: u8) -> Self {
        match value {
            1 => ServerType::Fs,
            2 => ServerType::Erasure,
            _ => ServerType::Unknown,
        }
    }
}

/// What the admin API reports about the calling account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_name: String,
    pub server_type: ServerType,
    /// The account's effective policy, as raw JSON bytes.
    pub policy: Vec<u8>,
}

impl AccountInfo {
    pub fn is_erasure(&self) -> bool {
        self.server_type == ServerType::Erasure
    }

    /// Decodes an `accountinfo` response body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Backend {
            #[serde(rename = "Type", default)]
            backend_type: u8,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Response {
            account_name: String,
            #[serde(default)]
            server: Option<Backend>,
            #[serde(default)]
            policy: Option<Box<RawValue>>,
        }

        let response: Response = serde_json::from_slice(body)
            .map_err(|e| SessionError::AccountInfo(format!("undecodable response: {e}")))?;

        Ok(Self {
            account_name: response.account_name,
            server_type: response
                .server
                .map(|s| ServerType::from(s.backend_type))
                .unwrap_or(ServerType::Unknown),
            policy: response
                .policy
                .map(|raw| raw.get().as_bytes().to_vec())
                .unwrap_or_default(),
        })
    }
}

/// A client bound to one set of credentials.
#[async_trait]
pub trait AdminClient: Send + Sync {
    async fn account_info(&self) -> Result<AccountInfo>;
}

/// Builds admin clients from session credentials.
pub trait AdminClientProvider: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn AdminClient>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_account_info() {
        let body = br#"{
            "AccountName": "alice",
            "Server": {"Type": 2, "GatewayOnline": false},
            "Policy": {"Version": "2012-10-17", "Statement": []},
            "Buckets": [{"name": "photos"}]
        }"#;

        let info = AccountInfo::from_json(body).unwrap();
        assert_eq!(info.account_name, "alice");
        assert!(info.is_erasure());

        let policy: serde_json::Value = serde_json::from_slice(&info.policy).unwrap();
        assert_eq!(policy["Version"], "2012-10-17");
    }

    #[test]
    fn test_missing_policy_and_server() {
        let info = AccountInfo::from_json(br#"{"AccountName": "bob", "Policy": null}"#).unwrap();
        assert_eq!(info.server_type, ServerType::Unknown);
        assert!(info.policy.is_empty());
    }

    #[test]
    fn test_undecodable_body() {
        assert!(matches!(
            AccountInfo::from_json(b"<html>"),
            Err(SessionError::AccountInfo(_))
        ));
    }
}
