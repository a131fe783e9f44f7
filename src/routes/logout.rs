//! POST /api/logout

use axum::Json;

use crate::session::middleware::SessionHandle;
use crate::types::SuccessResponse;

/// Destroy the session, and with it the CSRF token.
pub async fn logout(session: SessionHandle) -> Json<SuccessResponse> {
    session.destroy().await;
    tracing::info!("session destroyed on logout");
    Json(SuccessResponse { success: true })
}
