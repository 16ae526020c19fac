//! Error types for policy parsing and permission resolution.
//!
//! # Security Note
//! These errors carry policy details and are meant for logs only. The HTTP
//! layer collapses every one of them into a single "invalid session" reply.

use thiserror::Error;

/// Errors that can occur while parsing or evaluating IAM policies.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The policy document is not valid JSON or has the wrong shape.
    #[error("Policy parsing failed: {0}")]
    PolicyParse(String),

    /// The policy has an unsupported `Version` value.
    #[error("Unsupported policy version: {0}")]
    InvalidVersion(String),

    /// A statement violates the policy grammar (empty actions, bad resource, ...).
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    /// A condition block uses an unknown operator or malformed values.
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// A statement's condition block could not be re-encoded while merging.
    #[error("Condition encoding failed: {0}")]
    ConditionEncoding(String),
}

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

impl From<serde_json::Error> for AuthzError {
    fn from(err: serde_json::Error) -> Self {
        AuthzError::PolicyParse(err.to_string())
    }
}
