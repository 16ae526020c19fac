//! Condition values describing a console session request.

use authz::ConditionValues;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::ConsoleConfig;
use crate::principal::Principal;
use crate::token::Claims;

/// Console calls always use temporary credentials.
pub const PRINCIPAL_TYPE: &str = "AssumeRole";
pub const SIGNATURE_VERSION: &str = "AWS4-HMAC-SHA256";
pub const AUTH_TYPE: &str = "REST-HEADER";

/// Builds the values policies are evaluated against for `principal` at `now`.
///
/// String claims are added last under their own names and win over the
/// fixed keys.
pub fn session_condition_values(
    principal: &Principal,
    claims: &Claims,
    config: &ConsoleConfig,
    now: DateTime<Utc>,
) -> ConditionValues {
    let mut values = ConditionValues::new()
        .with("username", [principal.account_access_key.as_str()])
        .with("principaltype", [PRINCIPAL_TYPE])
        .with("SecureTransport", [config.secure_transport().to_string()])
        .with("CurrentTime", [now.to_rfc3339_opts(SecondsFormat::Secs, true)])
        .with("EpochTime", [now.timestamp().to_string()])
        .with("signatureversion", [SIGNATURE_VERSION])
        .with("authType", [AUTH_TYPE])
        .with("LocationConstraint", [config.region.as_str()]);

    for (name, value) in claims.string_claims() {
        values.insert(name, [value]);
    }
    values
}
