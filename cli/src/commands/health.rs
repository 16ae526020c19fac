use anyhow::{bail, Result};
use colored::*;
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Execute the health check command
///
/// Fails when any component is not healthy so the command can gate scripts.
pub async fn execute(url: String, format: String) -> Result<()> {
    let health_status = check_console_health(url.trim_end_matches('/')).await?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&health_status)?);
        }
        _ => {
            print_health_status_text(&health_status);
        }
    }

    let overall = health_status["status"].as_str().unwrap_or("unknown");
    if overall != "healthy" {
        bail!("console is {}", overall);
    }
    Ok(())
}

/// Check the console API and the storage server it reports
async fn check_console_health(base_url: &str) -> Result<serde_json::Value> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

    let mut status = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "components": {}
    });

    let api_status = check_api_health(&client, base_url).await;
    let storage_endpoint = api_status["storage_endpoint"].as_str().map(str::to_string);
    status["components"]["api"] = api_status;

    status["components"]["storage"] = match storage_endpoint {
        Some(endpoint) => check_storage_health(&client, &endpoint).await,
        None => json!({
            "status": "unknown",
            "message": "Storage endpoint not reported by the console"
        }),
    };

    // The API being down makes the console unusable, storage alone degrades it
    let component_status =
        |name: &str| status["components"][name]["status"].as_str().unwrap_or("unknown") == "healthy";
    let overall = match (component_status("api"), component_status("storage")) {
        (true, true) => "healthy",
        (true, false) => "degraded",
        (false, _) => "unhealthy",
    };
    status["status"] = json!(overall);

    Ok(status)
}

/// Check the console API health endpoint
async fn check_api_health(client: &reqwest::Client, base_url: &str) -> serde_json::Value {
    let api_url = format!("{}/api/v1/health", base_url);

    match client.get(&api_url).send().await {
        Ok(response) if response.status().is_success() => {
            match response.json::<serde_json::Value>().await {
                Ok(body) => json!({
                    "status": "healthy",
                    "message": "Console API is running and responsive",
                    "endpoint": base_url,
                    "version": body["version"],
                    "storage_endpoint": body["storage_endpoint"],
                }),
                Err(e) => json!({
                    "status": "unhealthy",
                    "message": format!("Console API returned an unreadable body: {}", e),
                    "endpoint": base_url,
                }),
            }
        }
        Ok(response) => json!({
            "status": "unhealthy",
            "message": format!("Console API returned status: {}", response.status()),
            "endpoint": base_url,
        }),
        Err(_) => json!({
            "status": "offline",
            "message": "Console API is not running or not reachable",
            "endpoint": base_url,
        }),
    }
}

/// Check the storage server liveness probe
async fn check_storage_health(client: &reqwest::Client, endpoint: &str) -> serde_json::Value {
    let live_url = format!("{}/minio/health/live", endpoint.trim_end_matches('/'));

    match client.get(&live_url).send().await {
        Ok(response) if response.status().is_success() => json!({
            "status": "healthy",
            "message": "Storage server is live",
            "endpoint": endpoint,
        }),
        Ok(response) => json!({
            "status": "unhealthy",
            "message": format!("Storage server returned status: {}", response.status()),
            "endpoint": endpoint,
        }),
        Err(_) => json!({
            "status": "offline",
            "message": "Storage server is not reachable from this host",
            "endpoint": endpoint,
        }),
    }
}

/// Print health status in a formatted text output
fn print_health_status_text(status: &serde_json::Value) {
    println!("{}", "=== Console Health Check ===".bold());
    println!();

    let overall_status = status["status"].as_str().unwrap_or("unknown");
    let status_display = match overall_status {
        "healthy" => "HEALTHY".green().bold(),
        "degraded" => "DEGRADED".yellow().bold(),
        "unhealthy" => "UNHEALTHY".red().bold(),
        _ => "UNKNOWN".white().bold(),
    };

    println!("Overall Status: {}", status_display);
    println!("Timestamp: {}", status["timestamp"].as_str().unwrap_or(""));
    println!();

    println!("{}", "Components:".bold());
    println!("{}", "─".repeat(50));

    if let Some(components) = status["components"].as_object() {
        for (name, component) in components {
            let comp_status = component["status"].as_str().unwrap_or("unknown");
            let status_icon = match comp_status {
                "healthy" => "✓".green(),
                "unhealthy" => "✗".red(),
                "offline" => "○".white(),
                _ => "?".white(),
            };

            let status_text = match comp_status {
                "healthy" => comp_status.green(),
                "unhealthy" => comp_status.red(),
                _ => comp_status.white(),
            };

            println!(
                "{} {} ({})",
                status_icon,
                name.to_uppercase().bold(),
                status_text
            );

            if let Some(message) = component["message"].as_str() {
                println!("  {}", message);
            }
            if let Some(endpoint) = component["endpoint"].as_str() {
                println!("  Endpoint: {}", endpoint);
            }
            if let Some(version) = component["version"].as_str() {
                println!("  Version: {}", version);
            }

            println!();
        }
    }
}
