use axum::{extract::State, Extension, Json};
use session::Principal;
use tracing::debug;

use crate::{
    error::{ApiErrorResponse, ApiResult},
    models::SessionResponse,
    AppState,
};

/// Permissions, features and topology for the logged-in principal
///
/// GET /api/v1/session
#[utoipa::path(
    get,
    path = "/api/v1/session",
    responses(
        (status = 200, description = "Session is valid", body = SessionResponse),
        (status = 401, description = "Invalid session", body = ApiErrorResponse)
    ),
    tag = "session"
)]
pub async fn session_check(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<SessionResponse>> {
    debug!(account = %principal.account_access_key, "Session check");

    let status = state.resolver.resolve(&principal).await?;
    Ok(Json(status.into()))
}
