//! Application error types with Axum response mapping.
//!
//! Each variant maps to a specific HTTP status + JSON body. The CSRF
//! mismatch uses 419 so clients can tell it apart from 401/403 and
//! recover by re-priming their token.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Status returned when the CSRF token is absent or does not match.
pub const TOKEN_MISMATCH_STATUS: u16 = 419;

/// `StatusCode` form of [`TOKEN_MISMATCH_STATUS`].
pub fn token_mismatch_status() -> StatusCode {
    StatusCode::from_u16(TOKEN_MISMATCH_STATUS).unwrap_or(StatusCode::FORBIDDEN)
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("CSRF token mismatch: {0}")]
    CsrfMismatch(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::CsrfMismatch(_) => token_mismatch_status(),
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            AppError::CsrfMismatch(reason) => json!({
                "error": "CSRF token mismatch",
                "message": reason,
            }),
            AppError::PayloadTooLarge => json!({"error": "Request body too large"}),
            AppError::BadRequest(msg) => json!({"error": msg}),
            AppError::Internal(msg) => json!({"error": msg}),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), axum::Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csrf_mismatch_is_419() {
        let err = AppError::CsrfMismatch("token absent".into());
        assert_eq!(err.status().as_u16(), 419);
        let body = err.body();
        assert_eq!(body["error"], "CSRF token mismatch");
        assert_eq!(body["message"], "token absent");
    }

    #[test]
    fn test_csrf_mismatch_is_not_generic_failure() {
        let status = AppError::CsrfMismatch("x".into()).status();
        assert_ne!(status, StatusCode::FORBIDDEN);
        assert_ne!(status, StatusCode::UNAUTHORIZED);
        assert!(!status.is_server_error());
        assert!(status.is_client_error());
    }

    #[test]
    fn test_payload_too_large() {
        let err = AppError::PayloadTooLarge;
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.body()["error"], "Request body too large");
    }

    #[test]
    fn test_bad_request() {
        let err = AppError::BadRequest("Missing field".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body()["error"], "Missing field");
    }

    #[test]
    fn test_into_response_status() {
        let resp = AppError::Internal("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
