//! The caller's identity as stored in the server-side session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Temporary credentials issued by the storage server's STS.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub session_token: String,
}

impl Credentials {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: session_token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// The resolved identity of a console session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub sts_access_key_id: String,
    pub sts_secret_access_key: String,
    pub sts_session_token: String,
    /// The account the credentials were issued for.
    pub account_access_key: String,
    #[serde(default)]
    pub hide_menu: bool,
    #[serde(default)]
    pub object_browser_only: bool,
}

impl Principal {
    pub fn new(credentials: Credentials, account_access_key: impl Into<String>) -> Self {
        Self {
            sts_access_key_id: credentials.access_key,
            sts_secret_access_key: credentials.secret_key,
            sts_session_token: credentials.session_token,
            account_access_key: account_access_key.into(),
            hide_menu: false,
            object_browser_only: false,
        }
    }

    pub fn with_hide_menu(mut self, hide_menu: bool) -> Self {
        self.hide_menu = hide_menu;
        self
    }

    pub fn with_object_browser_only(mut self, object_browser_only: bool) -> Self {
        self.object_browser_only = object_browser_only;
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            &self.sts_access_key_id,
            &self.sts_secret_access_key,
            &self.sts_session_token,
        )
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("sts_access_key_id", &self.sts_access_key_id)
            .field("account_access_key", &self.account_access_key)
            .field("hide_menu", &self.hide_menu)
            .field("object_browser_only", &self.object_browser_only)
            .finish_non_exhaustive()
    }
}
