//! Console features advertised to the UI.

use crate::config::ConsoleConfig;
use crate::principal::Principal;

pub const LOG_SEARCH: &str = "log-search";
pub const OIDC_IDP: &str = "oidc-idp";
pub const LDAP_IDP: &str = "ldap-idp";
pub const EXTERNAL_IDP: &str = "external-idp";
pub const HIDE_MENU: &str = "hide-menu";
pub const OBJECT_BROWSER_ONLY: &str = "object-browser-only";

/// Features enabled for this session, in a fixed order.
pub fn enabled_features(config: &ConsoleConfig, principal: &Principal) -> Vec<String> {
    let mut features = Vec::new();
    if config.log_search_enabled() {
        features.push(LOG_SEARCH);
    }
    if config.oidc_enabled() {
        features.extend([OIDC_IDP, EXTERNAL_IDP]);
    }
    if config.ldap_enabled {
        features.extend([LDAP_IDP, EXTERNAL_IDP]);
    }
    if principal.hide_menu {
        features.push(HIDE_MENU);
    }
    if principal.object_browser_only {
        features.push(OBJECT_BROWSER_ONLY);
    }
    features.into_iter().map(String::from).collect()
}
