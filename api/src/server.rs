use crate::{create_router, AppState};
use std::env;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// API server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
        }
    }
}

impl ApiConfig {
    /// Create a new API configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `CONSOLE_HOST` and `CONSOLE_PORT`, falling back to the defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = env::var("CONSOLE_HOST") {
            if !host.trim().is_empty() {
                config.host = host;
            }
        }
        if let Ok(port) = env::var("CONSOLE_PORT") {
            match port.trim().parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!("Ignoring invalid CONSOLE_PORT value `{}`", port),
            }
        }
        config
    }

    /// Set the bind address
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Start the API server with the given configuration
pub async fn start_server_with_config(
    state: AppState,
    config: ApiConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let storage = state.config().minio_server.clone();
    let app = create_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on {}", addr);
    info!("Storage server: {}", storage);
    info!(
        "Swagger UI available at http://localhost:{}/api/v1/swagger",
        config.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

/// Start the API server with default configuration
pub async fn start_server(state: AppState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    start_server_with_config(state, ApiConfig::default()).await
}

/// Start the API server in a background task
pub fn spawn_server(state: AppState, config: ApiConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = start_server_with_config(state, config).await {
            tracing::error!("API server error: {}", e);
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::new();
        assert_eq!(config.bind_address(), "0.0.0.0:9090");
    }

    #[test]
    fn test_builder() {
        let config = ApiConfig::new().with_host("127.0.0.1").with_port(9443);
        assert_eq!(config.bind_address(), "127.0.0.1:9443");
    }
}
