use anyhow::{bail, Context, Result};
use authz::{PolicyDocument, ResolvedPermissions};
use chrono::Utc;
use colored::*;
use serde_json::json;
use session::{
    conditions::session_condition_values, policy_vars::replace_policy_variables, AccountInfo,
    ClaimValue, Claims, ConsoleConfig, Credentials, Principal, ServerType,
};
use std::path::PathBuf;
use tracing::debug;

/// Inputs for an offline policy resolution
pub struct ResolveOptions {
    pub file: PathBuf,
    pub username: String,
    pub region: String,
    pub claims: Vec<String>,
    pub format: String,
}

/// Resolve a policy file the same way a live session would, without a storage server
pub fn resolve(options: ResolveOptions) -> Result<()> {
    let raw = std::fs::read(&options.file)
        .with_context(|| format!("failed to read {}", options.file.display()))?;
    let claims = parse_claims(&options.claims)?;

    let account = AccountInfo {
        account_name: options.username.clone(),
        server_type: ServerType::Unknown,
        policy: raw,
    };
    let concrete = replace_policy_variables(&claims, &account);
    let policy = PolicyDocument::parse(&concrete)
        .with_context(|| format!("invalid policy in {}", options.file.display()))?;
    debug!("Parsed {} statement(s)", policy.statements.len());

    let principal = Principal::new(Credentials::new("", "", ""), options.username);
    let config = ConsoleConfig::default().with_region(options.region);
    let values = session_condition_values(&principal, &claims, &config, Utc::now());

    let resolved = authz::resolve(&policy, &values)?;

    match options.format.as_str() {
        "text" => print_permissions_text(&resolved),
        _ => {
            let output = json!({
                "permissions": resolved.flatten(),
                "allowResources": resolved.allow_resources,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Parse `name=value` pairs into string claims
fn parse_claims(pairs: &[String]) -> Result<Claims> {
    let mut claims = Claims::new();
    for pair in pairs {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("claim `{}` must be written as name=value", pair);
        };
        if name.is_empty() {
            bail!("claim `{}` has an empty name", pair);
        }
        claims = claims.with(name, ClaimValue::String(value.to_string()));
    }
    Ok(claims)
}

fn print_permissions_text(resolved: &ResolvedPermissions) {
    println!("{}", "=== Resolved Permissions ===".bold());
    println!();

    for (resource, actions) in resolved.flatten() {
        println!("{}", resource.bold());
        if actions.is_empty() {
            println!("  {}", "(no actions)".dimmed());
        }
        for action in actions {
            println!("  {} {}", "✓".green(), action);
        }
    }

    if !resolved.allow_resources.is_empty() {
        println!();
        println!("{}", "Prefix grants:".bold());
        println!("{}", "─".repeat(50));
        for entry in &resolved.allow_resources {
            println!(
                "{} {} [{}]",
                entry.resource,
                entry.condition_operator.cyan(),
                entry.prefixes.join(", ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_claims() {
        let claims = parse_claims(&["sub=u-1".to_string(), "groups=a=b".to_string()]).unwrap();
        assert_eq!(claims.len(), 2);
        assert_eq!(claims.get("sub").and_then(ClaimValue::as_str), Some("u-1"));
        assert_eq!(claims.get("groups").and_then(ClaimValue::as_str), Some("a=b"));
    }

    #[test]
    fn test_parse_claims_rejects_malformed_pairs() {
        assert!(parse_claims(&["sub".to_string()]).is_err());
        assert!(parse_claims(&["=value".to_string()]).is_err());
    }
}
