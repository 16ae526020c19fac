//! `reqwest` implementation of the admin client seams.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use super::signer::{amz_date, CanonicalRequest, Signer, EMPTY_PAYLOAD_SHA256};
use super::{AccountInfo, AdminClient, AdminClientProvider};
use crate::config::ConsoleConfig;
use crate::error::{Result, SessionError};
use crate::principal::Credentials;

const ACCOUNT_INFO_PATH: &str = "/minio/admin/v3/accountinfo";

/// Creates one [`HttpAdminClient`] per set of session credentials. The
/// underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpAdminClientProvider {
    endpoint: Url,
    region: String,
    http: Client,
}

impl HttpAdminClientProvider {
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.minio_server).map_err(|e| {
            SessionError::Configuration(format!("invalid storage endpoint `{}`: {e}", config.minio_server))
        })?;
        let http = Client::builder()
            .timeout(config.admin_timeout())
            .build()
            .map_err(|e| SessionError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            region: config.region.clone(),
            http,
        })
    }
}

impl AdminClientProvider for HttpAdminClientProvider {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn AdminClient>> {
        if credentials.access_key.is_empty() || credentials.secret_key.is_empty() {
            return Err(SessionError::AdminClient("missing access or secret key".to_string()));
        }
        Ok(Box::new(HttpAdminClient {
            endpoint: self.endpoint.clone(),
            signer: Signer::new(&self.region, "s3"),
            credentials: credentials.clone(),
            http: self.http.clone(),
        }))
    }
}

/// Admin API client bound to one set of credentials.
#[derive(Debug)]
pub struct HttpAdminClient {
    endpoint: Url,
    signer: Signer,
    credentials: Credentials,
    http: Client,
}

impl HttpAdminClient {
    fn host_header(&self) -> Result<String> {
        let host = self
            .endpoint
            .host_str()
            .ok_or_else(|| SessionError::AdminClient("storage endpoint has no host".to_string()))?;
        Ok(match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }

    /// Sends a signed GET with an empty body.
    async fn signed_get(&self, path: &str) -> Result<reqwest::Response> {
        let url = self
            .endpoint
            .join(path)
            .map_err(|e| SessionError::AdminClient(format!("invalid admin path `{path}`: {e}")))?;

        let now = Utc::now();
        let mut headers = BTreeMap::from([
            ("host".to_string(), self.host_header()?),
            ("x-amz-content-sha256".to_string(), EMPTY_PAYLOAD_SHA256.to_string()),
            ("x-amz-date".to_string(), amz_date(&now)),
        ]);
        if !self.credentials.session_token.is_empty() {
            headers.insert(
                "x-amz-security-token".to_string(),
                self.credentials.session_token.clone(),
            );
        }

        let canonical = CanonicalRequest {
            method: "GET",
            path: url.path(),
            query: &[],
            headers: &headers,
            payload_sha256: EMPTY_PAYLOAD_SHA256,
        };
        let authorization = self.signer.authorization(&self.credentials, &now, &canonical);

        // reqwest derives Host from the URL
        let mut request = self.http.get(url.clone());
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!("Admin request: GET {}", url.path());
        request
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| SessionError::AccountInfo(format!("request failed: {e}")))
    }
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn account_info(&self) -> Result<AccountInfo> {
        let response = self.signed_get(ACCOUNT_INFO_PATH).await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SessionError::AccountInfo(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            warn!("Account info request returned {}", status);
            return Err(SessionError::AccountInfo(format!(
                "server returned {status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }

        AccountInfo::from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(server: &str) -> HttpAdminClientProvider {
        HttpAdminClientProvider::new(&ConsoleConfig::default().with_minio_server(server)).unwrap()
    }

    #[test]
    fn test_connect_requires_keys() {
        let provider = provider("http://localhost:9000");
        assert!(matches!(
            provider.connect(&Credentials::new("", "secret", "token")),
            Err(SessionError::AdminClient(_))
        ));
        assert!(provider.connect(&Credentials::new("AK", "SK", "")).is_ok());
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = ConsoleConfig::default().with_minio_server("not a url");
        assert!(matches!(
            HttpAdminClientProvider::new(&config),
            Err(SessionError::Configuration(_))
        ));
    }

    #[test]
    fn test_host_header_keeps_explicit_port() {
        let client = HttpAdminClient {
            endpoint: Url::parse("http://minio.local:9000").unwrap(),
            signer: Signer::new("", "s3"),
            credentials: Credentials::new("AK", "SK", ""),
            http: Client::new(),
        };
        assert_eq!(client.host_header().unwrap(), "minio.local:9000");

        let client = HttpAdminClient {
            endpoint: Url::parse("https://minio.example.net").unwrap(),
            ..client
        };
        assert_eq!(client.host_header().unwrap(), "minio.example.net");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_account_info_error() {
        // port 9 (discard) is not expected to serve HTTP
        let client = provider("http://127.0.0.1:9")
            .connect(&Credentials::new("AK", "SK", ""))
            .unwrap();
        assert!(matches!(
            client.account_info().await,
            Err(SessionError::AccountInfo(_))
        ));
    }
}
