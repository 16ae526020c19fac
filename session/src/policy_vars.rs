//! Substitution of identity variables inside an account's raw policy.

use crate::admin::AccountInfo;
use crate::token::Claims;

/// Token claims that may appear as `${jwt:<claim>}` in a policy.
const JWT_FIELDS: &[&str] = &[
    "sub",
    "iss",
    "aud",
    "jti",
    "upn",
    "name",
    "groups",
    "given_name",
    "family_name",
    "middle_name",
    "nickname",
    "preferred_username",
    "profile",
    "picture",
    "website",
    "email",
    "gender",
    "birthdate",
    "phone_number",
    "address",
    "scope",
    "client_id",
];

/// `${ldap:...}` variables and the claims they are read from.
const LDAP_VARIABLES: &[(&str, &str)] = &[
    ("${ldap:user}", "ldapUser"),
    ("${ldap:username}", "ldapUsername"),
];

/// Rewrites `${aws:username}`, `${aws:userid}`, `${jwt:*}` and `${ldap:*}`
/// variables in the account's policy. Variables whose claim is absent are
/// left in place. Values are escaped so they stay inside their JSON string.
pub fn replace_policy_variables(claims: &Claims, account: &AccountInfo) -> Vec<u8> {
    let mut policy = account.policy.clone();

    let account_name = escape_json(&account.account_name);
    for variable in ["${aws:username}", "${aws:userid}"] {
        policy = replace_all(&policy, variable.as_bytes(), account_name.as_bytes());
    }

    for field in JWT_FIELDS {
        if let Some(value) = claims.get(field) {
            let variable = format!("${{jwt:{field}}}");
            let value = escape_json(&value.to_string());
            policy = replace_all(&policy, variable.as_bytes(), value.as_bytes());
        }
    }

    for (variable, claim) in LDAP_VARIABLES {
        if let Some(value) = claims.get(claim) {
            let value = escape_json(&value.to_string());
            policy = replace_all(&policy, variable.as_bytes(), value.as_bytes());
        }
    }

    policy
}

/// Escapes `value` as the body of a JSON string literal, without the quotes.
fn escape_json(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    if needle.is_empty() {
        return haystack.to_vec();
    }

    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(pos) = rest.windows(needle.len()).position(|w| w == needle) {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(replacement);
        rest = &rest[pos + needle.len()..];
    }
    out.extend_from_slice(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::ServerType;
    use crate::token::ClaimValue;

    fn account(policy: &str) -> AccountInfo {
        AccountInfo {
            account_name: "alice".to_string(),
            server_type: ServerType::Erasure,
            policy: policy.as_bytes().to_vec(),
        }
    }

    fn text(value: &str) -> ClaimValue {
        ClaimValue::String(value.to_string())
    }

    #[test]
    fn test_aws_variables_use_account_name() {
        let out = replace_policy_variables(
            &Claims::new(),
            &account(r#"["arn:aws:s3:::home/${aws:username}/*", "${aws:userid}"]"#),
        );
        assert_eq!(out, br#"["arn:aws:s3:::home/alice/*", "alice"]"#);
    }

    #[test]
    fn test_jwt_and_ldap_variables() {
        let claims = Claims::new()
            .with("sub", text("user-1"))
            .with("email", text("alice@example.net"))
            .with("ldapUser", text("cn=alice,dc=example"))
            .with("ldapUsername", text("alice"));

        let out = replace_policy_variables(
            &claims,
            &account("${jwt:sub} ${jwt:email} ${ldap:user} ${ldap:username} ${jwt:nickname}"),
        );
        assert_eq!(
            out,
            b"user-1 alice@example.net cn=alice,dc=example alice ${jwt:nickname}"
        );
    }

    #[test]
    fn test_unlisted_claims_are_not_substituted() {
        let claims = Claims::new().with("accessKey", text("STSKEY"));
        let out = replace_policy_variables(&claims, &account("${jwt:accessKey}"));
        assert_eq!(out, b"${jwt:accessKey}");
    }

    #[test]
    fn test_non_string_claims_render_as_text() {
        let claims = Claims::new().with("aud", ClaimValue::Number(serde_json::Number::from(42u64)));
        let out = replace_policy_variables(&claims, &account("${jwt:aud}"));
        assert_eq!(out, b"42");
    }

    #[test]
    fn test_array_claims_keep_policy_valid() {
        let claims = Claims::new().with(
            "groups",
            ClaimValue::Nested(serde_json::json!(["dev", "ops"])),
        );
        let out = replace_policy_variables(
            &claims,
            &account(r#"{"Resource": "arn:aws:s3:::team-${jwt:groups}/*"}"#),
        );

        assert_eq!(out, br#"{"Resource": "arn:aws:s3:::team-[dev ops]/*"}"#);
        assert!(serde_json::from_slice::<serde_json::Value>(&out).is_ok());
    }

    #[test]
    fn test_quotes_and_backslashes_are_escaped() {
        let claims = Claims::new()
            .with("name", text(r#"al"ice\"#))
            .with("ldapUsername", text("line\nbreak"));
        let out = replace_policy_variables(
            &claims,
            &account(r#"["${jwt:name}", "${ldap:username}"]"#),
        );

        let parsed: Vec<String> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, vec![r#"al"ice\"#.to_string(), "line\nbreak".to_string()]);
    }

    #[test]
    fn test_account_name_is_escaped() {
        let mut info = account(r#"["home/${aws:username}"]"#);
        info.account_name = r#"bob"x"#.to_string();

        let out = replace_policy_variables(&Claims::new(), &info);
        let parsed: Vec<String> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, vec![r#"home/bob"x"#.to_string()]);
    }

    #[test]
    fn test_substitution_is_deterministic() {
        let claims = Claims::new().with("sub", text("user-1"));
        let info = account(r#"{"Resource": "arn:aws:s3:::${jwt:sub}/${aws:username}/*"}"#);

        let first = replace_policy_variables(&claims, &info);
        let second = replace_policy_variables(&claims, &info);
        assert_eq!(first, second);
    }

    #[test]
    fn test_replace_all_bytes() {
        assert_eq!(replace_all(b"aXbXc", b"X", b"--"), b"a--b--c");
        assert_eq!(replace_all(b"abc", b"", b"--"), b"abc");
        assert_eq!(replace_all(b"", b"X", b"--"), b"");
    }
}
