//! GET /api/debug/csrf (mounted only when `DEBUG_ROUTES` is enabled)

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use super::csrf_cookie::xsrf_cookie;
use crate::AppState;
use crate::csrf::context::TokenSummary;
use crate::error::AppError;
use crate::session::cookie::cookie_names;
use crate::session::middleware::SessionHandle;
use crate::types::DebugCsrfResponse;

/// Force-rotate the session token and report what the server sees.
pub async fn debug_csrf(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = session.data.lock().await.regenerate_csrf_token();
    let summary = TokenSummary::of(&token);
    tracing::info!(
        target: "csrf",
        fingerprint = %summary.fingerprint,
        "regenerated CSRF token via debug route"
    );

    let cookie = xsrf_cookie(&state, &token)?;
    let body = DebugCsrfResponse {
        success: true,
        csrf_token: token,
        session_id: session.id.clone(),
        cookies_received: cookie_names(&headers),
        stateful_domains: state.config.stateful_domains.clone(),
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}
