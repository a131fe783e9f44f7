//! POST|PUT|PATCH|DELETE /api/echo

use axum::Json;
use axum::body::Bytes;
use axum::http::Method;

use crate::types::EchoResponse;

/// Guarded smoke-test endpoint: reaching it means the token was accepted.
pub async fn echo(method: Method, body: Bytes) -> Json<EchoResponse> {
    let body = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
        })
    };

    Json(EchoResponse {
        accepted: true,
        method: method.to_string(),
        body,
    })
}
