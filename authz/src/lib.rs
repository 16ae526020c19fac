//! IAM policy evaluation and permission resolution for the storage console.
//!
//! This crate models the storage server's IAM policy language (statements,
//! actions, resources and condition blocks) and turns a caller's effective
//! policy into the per-resource permission map the console UI renders.
//!
//! # Architecture Overview
//!
//! The resolution flow follows this pattern:
//!
//! 1. **Parse** the policy document with [`PolicyDocument::parse`]
//! 2. **Evaluate** the resource-independent default actions under the
//!    request's [`ConditionValues`]
//! 3. **Merge** allow and deny statements per resource with [`PermissionResolver`]
//! 4. **Flatten** the result into `resource -> [action]` for the response
//!
//! # Deny Precedence
//!
//! An action named by a Deny statement for a resource never appears in that
//! resource's final permission set, regardless of where the Deny sits in the
//! statement list. The synthetic [`CONSOLE_RESOURCE`] entry always carries the
//! default actions.

pub mod action;
pub mod condition;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod resource;
pub mod wildcard;

pub use action::{Action, ActionSet};
pub use condition::{ConditionValues, Conditions};
pub use error::{AuthzError, Result};
pub use policy::{Args, Effect, PolicyDocument, Statement};
pub use resolver::{resolve, AllowedResource, PermissionResolver, ResolvedPermissions, CONSOLE_RESOURCE};
pub use resource::{Resource, ResourceSet};
