//! Console session resolution.
//!
//! Turns the STS credentials held in a console session into the permissions,
//! features and cluster topology the UI renders. The flow for one request is:
//!
//! 1. decode the session token's claims ([`token::decode_claims`])
//! 2. fetch the account's policy from the storage admin API ([`admin`])
//! 3. substitute identity variables into the policy ([`policy_vars`])
//! 4. merge statements into per-resource permissions ([`authz`])
//! 5. assemble the [`SessionStatus`]
//!
//! Any failure aborts the whole resolution; no partial status is returned.

pub mod admin;
pub mod conditions;
pub mod config;
pub mod error;
pub mod features;
pub mod policy_vars;
pub mod principal;
pub mod status;
pub mod store;
pub mod token;

pub use admin::{AccountInfo, AdminClient, AdminClientProvider, HttpAdminClientProvider, ServerType};
pub use config::ConsoleConfig;
pub use error::{Result, SessionError};
pub use principal::{Credentials, Principal};
pub use status::{SessionResolver, SessionStatus};
pub use store::{PrincipalStore, SessionKeys};
pub use token::{decode_claims, ClaimValue, Claims};

// tower-sessions types the HTTP layer builds its session layer from
pub use tower_sessions;
