use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use session::SessionError;
use thiserror::Error;
use tracing::warn;

/// API Error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Any failure while resolving or establishing a console session.
    #[error("invalid session")]
    InvalidSession,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error envelope returned by every endpoint
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiErrorResponse {
    /// HTTP status code
    pub code: u16,
    pub message: String,
}

impl ApiError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidSession => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = ApiErrorResponse {
            code: status.as_u16(),
            message: self.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Session failures all look the same to clients; the cause only goes to the log.
impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        warn!("Session resolution failed: {}", err);
        ApiError::InvalidSession
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_session_envelope() {
        let response = ApiError::from(SessionError::InvalidToken("bad".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let envelope: ApiErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope.code, 401);
        assert_eq!(envelope.message, "invalid session");
    }

    #[tokio::test]
    async fn test_missing_json_content_type_is_bad_request() {
        use axum::{body::Body, extract::FromRequest, http::Request};

        let request = Request::builder()
            .method("POST")
            .body(Body::from("{}"))
            .unwrap();
        let rejection = Json::<serde_json::Value>::from_request(request, &())
            .await
            .unwrap_err();

        let response = ApiError::from(rejection).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let envelope: ApiErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope.code, 400);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InternalError("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
