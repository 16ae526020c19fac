use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use session::PrincipalStore;
use std::time::Instant;
use tower_sessions::Session;
use tracing::{debug, info, warn};

use crate::error::ApiError;

/// Session middleware
///
/// Loads the principal stored at login and attaches it to the request as an
/// extension. Requests without a principal are rejected with the
/// "invalid session" envelope before reaching the handler.
pub async fn session_middleware(
    session: Session,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = match PrincipalStore::principal(&session).await {
        Ok(Some(principal)) => principal,
        Ok(None) => {
            debug!("SESSION MIDDLEWARE: No principal for {}", request.uri());
            return Err(ApiError::InvalidSession);
        }
        Err(e) => {
            warn!("SESSION MIDDLEWARE: Failed to load session: {}", e);
            return Err(ApiError::InvalidSession);
        }
    };

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Request processing middleware hook
/// This runs before routing to log and time incoming requests
pub async fn request_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    info!(
        "REQUEST MIDDLEWARE: Processing incoming {} request to {}",
        method, uri
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    debug!(
        "REQUEST MIDDLEWARE: {} {} -> {} in {:?}",
        method,
        uri,
        response.status(),
        duration
    );

    response
}

/// Response processing middleware hook
/// Session data must never be cached by browsers or proxies
pub async fn response_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        "x-console-version",
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    response
}
