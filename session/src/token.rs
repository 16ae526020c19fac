//! Unverified decoding of session token claims.
//!
//! The storage server verified the token when it issued the session
//! credentials; here we only need its claims to build condition values.

use std::collections::BTreeMap;
use std::fmt;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SessionError};

/// Signing algorithms a session token header may name.
const SUPPORTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::HS256,
    Algorithm::HS384,
    Algorithm::HS512,
    Algorithm::EdDSA,
];

/// A single decoded claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Nested(serde_json::Value),
}

impl ClaimValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ClaimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimValue::String(s) => f.write_str(s),
            ClaimValue::Number(n) => write!(f, "{n}"),
            ClaimValue::Bool(b) => write!(f, "{b}"),
            ClaimValue::Nested(value) => write_nested(f, value),
        }
    }
}

/// Renders nested values as `[a b]` and `map[k:v]`, the way storage
/// servers print them into policy variables.
fn write_nested(f: &mut fmt::Formatter<'_>, value: &serde_json::Value) -> fmt::Result {
    use serde_json::Value;

    match value {
        Value::Null => f.write_str("<nil>"),
        Value::String(s) => f.write_str(s),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) => write!(f, "{n}"),
        Value::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write_nested(f, item)?;
            }
            f.write_str("]")
        }
        Value::Object(map) => {
            f.write_str("map[")?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{key}:")?;
                write_nested(f, item)?;
            }
            f.write_str("]")
        }
    }
}

/// Claims carried by a session token, keyed by claim name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(BTreeMap<String, ClaimValue>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: ClaimValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String-valued claims only; numbers, booleans and nested values are skipped.
    pub fn string_claims(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(name, value)| value.as_str().map(|v| (name.as_str(), v)))
    }
}

/// Decodes the claims of a `header.payload.signature` token without checking
/// the signature.
pub fn decode_claims(token: &str) -> Result<Claims> {
    let header = decode_header(token)
        .map_err(|e| SessionError::InvalidToken(format!("malformed header: {e}")))?;
    if !SUPPORTED_ALGORITHMS.contains(&header.alg) {
        return Err(SessionError::InvalidToken(format!(
            "unsupported signing algorithm `{:?}`",
            header.alg
        )));
    }

    let mut validation = Validation::new(header.alg);
    validation.algorithms = SUPPORTED_ALGORITHMS.to_vec();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| SessionError::InvalidToken(format!("malformed payload: {e}")))?;

    debug!(alg = ?header.alg, claims = data.claims.len(), "Decoded session token claims");
    Ok(data.claims)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rstest::rstest;

    /// Builds an unsigned-looking token with the given header and payload.
    pub(crate) fn token(header: &serde_json::Value, payload: &serde_json::Value) -> String {
        format!(
            "{}.{}.c2lnbmF0dXJl",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(payload.to_string())
        )
    }

    #[test]
    fn test_decode_claims() {
        let token = token(
            &serde_json::json!({"alg": "HS512", "typ": "JWT"}),
            &serde_json::json!({
                "accessKey": "STSKEY",
                "exp": 1735689600,
                "ldapUser": "cn=alice,dc=example",
                "admin": true,
                "groups": ["dev", "ops"]
            }),
        );

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.len(), 5);
        assert_eq!(claims.get("accessKey").and_then(ClaimValue::as_str), Some("STSKEY"));
        assert!(matches!(claims.get("exp"), Some(ClaimValue::Number(_))));
        assert_eq!(claims.get("admin"), Some(&ClaimValue::Bool(true)));
        assert!(matches!(claims.get("groups"), Some(ClaimValue::Nested(_))));

        let strings: Vec<(&str, &str)> = claims.string_claims().collect();
        assert_eq!(
            strings,
            vec![("accessKey", "STSKEY"), ("ldapUser", "cn=alice,dc=example")]
        );
    }

    #[test]
    fn test_nested_claims_render_as_words() {
        let groups = ClaimValue::Nested(serde_json::json!(["dev", "ops"]));
        assert_eq!(groups.to_string(), "[dev ops]");

        let address = ClaimValue::Nested(serde_json::json!({
            "country": "NL",
            "lines": ["a", 1, null]
        }));
        assert_eq!(address.to_string(), "map[country:NL lines:[a 1 <nil>]]");
    }

    #[rstest]
    #[case("")]
    #[case("not-a-token")]
    #[case("a.b")]
    #[case("a.b.c.d")]
    #[case("!!!.???.sig")]
    fn test_malformed_tokens(#[case] raw: &str) {
        assert!(matches!(decode_claims(raw), Err(SessionError::InvalidToken(_))));
    }

    #[rstest]
    #[case(serde_json::json!({"alg": "none"}))]
    #[case(serde_json::json!({"alg": "XYZ"}))]
    #[case(serde_json::json!({"alg": "RS3256"}))]
    #[case(serde_json::json!({"typ": "JWT"}))]
    fn test_rejected_headers(#[case] header: serde_json::Value) {
        let raw = token(&header, &serde_json::json!({"sub": "a"}));
        assert!(matches!(decode_claims(&raw), Err(SessionError::InvalidToken(_))));
    }

    #[test]
    fn test_payload_must_be_an_object() {
        let raw = token(&serde_json::json!({"alg": "ES256"}), &serde_json::json!(["a"]));
        assert!(decode_claims(&raw).is_err());
    }
}
