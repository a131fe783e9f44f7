//! Server-side session management.
//!
//! Provides the `SessionBackend` trait for pluggable storage, HMAC-SHA256
//! cookie signing, and an in-memory backend. The session is the only
//! owner of the CSRF token; the guard reads it, never writes it.

pub mod cookie;
pub mod memory;
pub mod middleware;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Session key holding the CSRF token.
pub const CSRF_TOKEN_KEY: &str = "_token";

/// Length of generated CSRF tokens, in characters.
pub const CSRF_TOKEN_LEN: usize = 40;

/// Session data stored server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    #[serde(flatten)]
    pub data: HashMap<String, serde_json::Value>,
}

impl SessionData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) {
        self.data.remove(key);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The session-internal CSRF token, if one has been issued.
    pub fn csrf_token(&self) -> Option<&str> {
        self.get(CSRF_TOKEN_KEY)
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
    }

    /// Return the current token, issuing one first if the session has none.
    pub fn ensure_csrf_token(&mut self) -> String {
        if let Some(token) = self.csrf_token() {
            return token.to_string();
        }
        self.regenerate_csrf_token()
    }

    /// Replace the token with a fresh one and return it.
    pub fn regenerate_csrf_token(&mut self) -> String {
        let token = generate_csrf_token();
        self.set(CSRF_TOKEN_KEY, serde_json::Value::String(token.clone()));
        token
    }
}

/// Generate a random alphanumeric CSRF token.
pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Pluggable session storage backend.
///
/// Implementations must be `Send + Sync` for use in Axum's async handlers.
pub trait SessionBackend: Send + Sync {
    /// Load session data by ID. Returns `None` if not found or expired.
    fn load(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Option<SessionData>> + Send;

    /// Save session data.
    fn save(
        &self,
        session_id: &str,
        data: &SessionData,
    ) -> impl std::future::Future<Output = ()> + Send;

    /// Delete a session.
    fn delete(&self, session_id: &str) -> impl std::future::Future<Output = ()> + Send;
}
