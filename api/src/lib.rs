use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use session::{AdminClientProvider, ConsoleConfig, SessionResolver};
use std::sync::Arc;
use time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error;
pub mod handlers;
pub mod middleware_hooks;
pub mod models;
pub mod server;

#[cfg(test)]
mod middleware_hooks_tests;

// Re-export server functions for convenience
pub use server::{spawn_server, start_server, start_server_with_config, ApiConfig};

/// Name of the console session cookie
pub const SESSION_COOKIE: &str = "token";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: SessionResolver,
}

impl AppState {
    pub fn new(config: ConsoleConfig, admin: Arc<dyn AdminClientProvider>) -> Self {
        Self {
            resolver: SessionResolver::new(Arc::new(config), admin),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        self.resolver.config()
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::session::session_check,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::SessionResponse,
            models::AllowResource,
            models::LoginRequest,
            models::HealthResponse,
            error::ApiErrorResponse,
        )
    ),
    tags(
        (name = "session", description = "Console session and permissions"),
        (name = "auth", description = "Session login and logout"),
        (name = "health", description = "Health check endpoints"),
    ),
    info(
        title = "Storage Console API",
        version = "1.0.0",
        description = "Session and permission API for the object storage console",
    ),
)]
pub struct ApiDoc;

/// Create the main API router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_secure(state.config().secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            state.config().session_timeout_seconds,
        )));

    // Routes that need an established session
    let authenticated = Router::new()
        .route("/session", get(handlers::session::session_check))
        .route_layer(middleware::from_fn(middleware_hooks::session_middleware));

    // API v1 routes
    let api_v1 = Router::new()
        .merge(authenticated)
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/health", get(handlers::health::health_check))
        .layer(middleware::from_fn(middleware_hooks::request_middleware))
        .layer(middleware::from_fn(middleware_hooks::response_middleware));

    // Main router
    Router::new()
        .nest("/api/v1", api_v1)
        .merge(SwaggerUi::new("/api/v1/swagger").url("/api/v1/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(session_layer),
        )
        .with_state(state)
}
