//! AWS Signature Version 4 for admin API requests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::principal::Credentials;

pub const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Hex SHA-256 of an empty payload.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

type HmacSha256 = Hmac<Sha256>;

/// The parts of a request that take part in the signature.
#[derive(Debug, Clone)]
pub struct CanonicalRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a [(String, String)],
    /// Header names are lower-cased when the request is canonicalised.
    pub headers: &'a BTreeMap<String, String>,
    pub payload_sha256: &'a str,
}

impl CanonicalRequest<'_> {
    fn signed_headers(&self) -> String {
        self.headers
            .keys()
            .map(|k| k.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn to_canonical_string(&self) -> String {
        let path = self
            .path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let path = if path.is_empty() { "/".to_string() } else { path };

        let mut query: Vec<(String, String)> = self
            .query
            .iter()
            .map(|(k, v)| (urlencoding::encode(k).into_owned(), urlencoding::encode(v).into_owned()))
            .collect();
        query.sort();
        let query = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let headers: BTreeMap<String, String> = self
            .headers
            .iter()
            .map(|(k, v)| {
                let value = v.split_whitespace().collect::<Vec<_>>().join(" ");
                (k.to_ascii_lowercase(), value)
            })
            .collect();
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{k}:{v}\n"))
            .collect();

        format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.method,
            path,
            query,
            canonical_headers,
            self.signed_headers(),
            self.payload_sha256
        )
    }
}

/// Signs requests for one region and service.
#[derive(Debug, Clone)]
pub struct Signer {
    region: String,
    service: String,
}

impl Signer {
    pub fn new(region: impl Into<String>, service: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            // the storage server treats an unset region as us-east-1
            region: if region.is_empty() {
                "us-east-1".to_string()
            } else {
                region
            },
            service: service.into(),
        }
    }

    fn scope(&self, date: &DateTime<Utc>) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            date.format("%Y%m%d"),
            self.region,
            self.service
        )
    }

    pub fn string_to_sign(&self, date: &DateTime<Utc>, request: &CanonicalRequest<'_>) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            SIGNING_ALGORITHM,
            amz_date(date),
            self.scope(date),
            sha256_hex(request.to_canonical_string().as_bytes())
        )
    }

    pub fn signature(
        &self,
        secret_key: &str,
        date: &DateTime<Utc>,
        request: &CanonicalRequest<'_>,
    ) -> String {
        let key = signing_key(
            secret_key,
            &date.format("%Y%m%d").to_string(),
            &self.region,
            &self.service,
        );
        hex::encode(hmac_sha256(&key, self.string_to_sign(date, request).as_bytes()))
    }

    /// The `Authorization` header value.
    pub fn authorization(
        &self,
        credentials: &Credentials,
        date: &DateTime<Utc>,
        request: &CanonicalRequest<'_>,
    ) -> String {
        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            SIGNING_ALGORITHM,
            credentials.access_key,
            self.scope(date),
            request.signed_headers(),
            self.signature(&credentials.secret_key, date, request)
        )
    }
}

/// `x-amz-date` formatting: `20150830T123600Z`.
pub fn amz_date(date: &DateTime<Utc>) -> String {
    date.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derives the per-day signing key.
pub fn signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}
