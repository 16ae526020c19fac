use anyhow::{anyhow, Result};
use api::{start_server_with_config, ApiConfig, AppState};
use session::{ConsoleConfig, HttpAdminClientProvider};
use std::sync::Arc;
use tracing::info;

/// Run the console API server until interrupted
pub async fn execute(host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = ConsoleConfig::from_env()?;

    let mut api_config = ApiConfig::from_env();
    if let Some(host) = host {
        api_config = api_config.with_host(host);
    }
    if let Some(port) = port {
        api_config = api_config.with_port(port);
    }

    let admin = HttpAdminClientProvider::new(&config)?;
    info!(
        "Starting console v{} against {}",
        env!("CARGO_PKG_VERSION"),
        config.minio_server
    );

    let state = AppState::new(config, Arc::new(admin));
    start_server_with_config(state, api_config)
        .await
        .map_err(|e| anyhow!("API server failed: {}", e))?;

    info!("Console shutdown complete");
    Ok(())
}
