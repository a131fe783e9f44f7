//! Shared response DTOs.

use serde::Serialize;

/// GET /health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub mode: String,
}

/// Generic success response.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// GET /api/debug/csrf response.
///
/// Exposes the freshly issued token and session id, so the route is only
/// mounted when debug routes are enabled.
#[derive(Debug, Serialize)]
pub struct DebugCsrfResponse {
    pub success: bool,
    pub csrf_token: String,
    pub session_id: String,
    pub cookies_received: Vec<String>,
    pub stateful_domains: Vec<String>,
}

/// Guarded echo response.
#[derive(Debug, Serialize)]
pub struct EchoResponse {
    pub accepted: bool,
    pub method: String,
    pub body: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_response_shape() {
        let resp = DebugCsrfResponse {
            success: true,
            csrf_token: "t".into(),
            session_id: "s".into(),
            cookies_received: vec!["csrf_session".into()],
            stateful_domains: vec!["localhost".into()],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["csrf_token"], "t");
        assert_eq!(json["cookies_received"][0], "csrf_session");
    }

    #[test]
    fn test_echo_response() {
        let resp = EchoResponse {
            accepted: true,
            method: "PUT".into(),
            body: serde_json::json!({"first_name": "Ada"}),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["accepted"], true);
        assert_eq!(json["body"]["first_name"], "Ada");
    }
}
