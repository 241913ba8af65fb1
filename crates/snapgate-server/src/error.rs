//! `SnapError` as an HTTP response

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use snapgate_core::SnapError;

/// JSON error body: `{"error": code, "message": text}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable error code
    pub error: &'static str,
    /// Human-readable detail
    pub message: String,
}

/// Handler error wrapping the domain error
#[derive(Debug)]
pub struct ApiError(pub SnapError);

impl From<SnapError> for ApiError {
    fn from(err: SnapError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = if self.0.is_expected() {
            tracing::debug!(code = self.0.code(), error = %self.0, "request rejected");
            self.0.to_string()
        } else {
            tracing::error!(error = %self.0, "request failed");
            "internal error".to_string()
        };
        let body = ErrorBody {
            error: self.0.code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type of HTTP handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let response = ApiError(SnapError::gone("expired")).into_response();
        assert_eq!(response.status(), StatusCode::GONE);

        let response = ApiError(SnapError::QuotaExceeded {
            active: 10,
            limit: 10,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = ApiError(SnapError::internal("kv down")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
