//! GET /sanctum/csrf-cookie (path configurable via `CSRF_BOOTSTRAP_PATH`)

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::AppState;
use crate::error::AppError;
use crate::session::middleware::SessionHandle;

/// Issue the session's token in the `XSRF-TOKEN` cookie.
///
/// Idempotent: an existing token is reissued, not rotated, so concurrent
/// bootstraps from one client all see the same value.
pub async fn csrf_cookie(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
) -> Result<Response, AppError> {
    let token = session.data.lock().await.ensure_csrf_token();
    let cookie = xsrf_cookie(&state, &token)?;
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

/// `Set-Cookie` value carrying `token` to client scripts (not HttpOnly).
pub(crate) fn xsrf_cookie(state: &AppState, token: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&state.session_layer.xsrf_cookie(token))
        .map_err(|e| AppError::Internal(format!("Invalid XSRF cookie: {e}")))
}
