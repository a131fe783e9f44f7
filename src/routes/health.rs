//! GET /health

use axum::Json;

use crate::types::HealthResponse;

/// Liveness check. Never touches the session.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        mode: "csrf-guard".into(),
    })
}
