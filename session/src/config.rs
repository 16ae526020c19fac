//! Console configuration loaded from the environment.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SessionError};

pub const DEFAULT_MINIO_SERVER: &str = "http://localhost:9000";
pub const DEFAULT_ADMIN_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_SESSION_TIMEOUT_SECONDS: i64 = 43_200; // 12 hours

/// Settings shared by every session request. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Storage server endpoint, e.g. `https://minio.example.net:9000`
    pub minio_server: String,
    /// Region reported as the location constraint condition value
    pub region: String,
    /// Log search backend; enables the `log-search` feature when set
    pub log_query_url: Option<String>,
    pub idp_url: Option<String>,
    pub idp_client_id: Option<String>,
    pub ldap_enabled: bool,
    /// Timeout for admin API calls in seconds
    pub admin_timeout_seconds: u64,
    /// Session cookie lifetime in seconds
    pub session_timeout_seconds: i64,
    /// Whether to use secure cookies (HTTPS only)
    pub secure_cookies: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            minio_server: DEFAULT_MINIO_SERVER.to_string(),
            region: String::new(),
            log_query_url: None,
            idp_url: None,
            idp_client_id: None,
            ldap_enabled: false,
            admin_timeout_seconds: DEFAULT_ADMIN_TIMEOUT_SECONDS,
            session_timeout_seconds: DEFAULT_SESSION_TIMEOUT_SECONDS,
            secure_cookies: false,
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from `CONSOLE_*` environment variables, reading a
    /// `.env` file first when one exists.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let minio_server = non_empty("CONSOLE_MINIO_SERVER")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.minio_server);
        if !minio_server.starts_with("http://") && !minio_server.starts_with("https://") {
            return Err(SessionError::Configuration(format!(
                "CONSOLE_MINIO_SERVER must be an http(s) URL, got `{minio_server}`"
            )));
        }

        Ok(Self {
            minio_server,
            region: non_empty("CONSOLE_MINIO_REGION").unwrap_or_default(),
            log_query_url: non_empty("CONSOLE_LOG_QUERY_URL"),
            idp_url: non_empty("CONSOLE_IDP_URL"),
            idp_client_id: non_empty("CONSOLE_IDP_CLIENT_ID"),
            ldap_enabled: non_empty("CONSOLE_LDAP_ENABLED").is_some_and(|v| is_on(&v)),
            admin_timeout_seconds: parse_or(
                non_empty("CONSOLE_ADMIN_TIMEOUT_SECONDS"),
                "CONSOLE_ADMIN_TIMEOUT_SECONDS",
                defaults.admin_timeout_seconds,
            ),
            session_timeout_seconds: parse_or(
                non_empty("CONSOLE_SESSION_TIMEOUT_SECONDS"),
                "CONSOLE_SESSION_TIMEOUT_SECONDS",
                defaults.session_timeout_seconds,
            ),
            secure_cookies: non_empty("CONSOLE_SECURE_COOKIES").is_some_and(|v| is_on(&v)),
        })
    }

    pub fn with_minio_server(mut self, server: impl Into<String>) -> Self {
        self.minio_server = server.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_log_query_url(mut self, url: impl Into<String>) -> Self {
        self.log_query_url = Some(url.into());
        self
    }

    pub fn with_oidc(mut self, idp_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        self.idp_url = Some(idp_url.into());
        self.idp_client_id = Some(client_id.into());
        self
    }

    pub fn with_ldap(mut self, enabled: bool) -> Self {
        self.ldap_enabled = enabled;
        self
    }

    pub fn with_admin_timeout(mut self, seconds: u64) -> Self {
        self.admin_timeout_seconds = seconds;
        self
    }

    pub fn log_search_enabled(&self) -> bool {
        self.log_query_url.is_some()
    }

    /// OpenID Connect login needs both the provider URL and a client id.
    pub fn oidc_enabled(&self) -> bool {
        self.idp_url.is_some() && self.idp_client_id.is_some()
    }

    /// Whether the storage endpoint is reached over TLS.
    pub fn secure_transport(&self) -> bool {
        self.minio_server.starts_with("https://")
    }

    pub fn admin_timeout(&self) -> Duration {
        Duration::from_secs(self.admin_timeout_seconds)
    }
}

fn is_on(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "on" | "true" | "yes" | "1")
}

fn parse_or<T: std::str::FromStr + Copy>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {} value `{}`", key, raw);
            default
        }),
        None => default,
    }
}
