//! Session login and logout

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use session::{decode_claims, Credentials, Principal, PrincipalStore};
use tower_sessions::Session;
use tracing::{error, info};

use crate::{
    error::{ApiError, ApiErrorResponse, ApiResult},
    models::LoginRequest,
    AppState,
};

/// Open a console session with STS credentials
///
/// The credentials are checked against the storage server before the
/// session is stored.
///
/// POST /api/v1/login
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 204, description = "Session established"),
        (status = 400, description = "Malformed request body", body = ApiErrorResponse),
        (status = 401, description = "Invalid credentials", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(request) = payload?;
    let credentials = Credentials::new(request.access_key, request.secret_key, request.session_token);
    decode_claims(&credentials.session_token)?;

    let client = state.resolver.admin().connect(&credentials)?;
    let account = client.account_info().await?;

    let principal = Principal::new(credentials, account.account_name)
        .with_hide_menu(request.hide_menu)
        .with_object_browser_only(request.object_browser_only);

    PrincipalStore::login(&session, &principal).await.map_err(|e| {
        error!("Failed to store session: {}", e);
        ApiError::InternalError("Session error".to_string())
    })?;

    info!(account = %principal.account_access_key, "Console session established");
    Ok(StatusCode::NO_CONTENT)
}

/// Close the current session
///
/// POST /api/v1/logout
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses(
        (status = 204, description = "Session closed")
    ),
    tag = "auth"
)]
pub async fn logout(session: Session) -> ApiResult<StatusCode> {
    PrincipalStore::logout(&session).await.map_err(|e| {
        error!("Failed to destroy session: {}", e);
        ApiError::InternalError("Session error".to_string())
    })?;

    Ok(StatusCode::NO_CONTENT)
}
