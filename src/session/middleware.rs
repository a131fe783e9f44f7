//! Axum session middleware.
//!
//! Extracts the signed session id from its cookie, loads session data from
//! the backend, exposes it through a `SessionHandle` request extension, and
//! saves or clears it once the handler has produced a response. Unchanged
//! existing sessions get their cookies re-issued, so the browser's expiry
//! slides along with the backend's.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::cookie::{CookieAttrs, CookieSigner, find_cookie, set_cookie, sets_cookie};
use super::{SessionBackend, SessionData};
use crate::csrf::XSRF_COOKIE;
use crate::error::AppError;

/// Name of the signed, HttpOnly session cookie.
pub const SESSION_COOKIE: &str = "csrf_session";

/// Shared handle to session state, inserted into request extensions.
#[derive(Clone)]
pub struct SessionHandle {
    pub id: String,
    pub data: Arc<Mutex<SessionData>>,
    pub destroyed: Arc<Mutex<bool>>,
}

impl SessionHandle {
    pub fn new(id: String, data: SessionData) -> Self {
        Self {
            id,
            data: Arc::new(Mutex::new(data)),
            destroyed: Arc::new(Mutex::new(false)),
        }
    }

    /// Current CSRF token, read without modifying the session.
    pub async fn csrf_token(&self) -> Option<String> {
        self.data.lock().await.csrf_token().map(String::from)
    }

    /// Mark the session for deletion once the response is produced.
    pub async fn destroy(&self) {
        *self.destroyed.lock().await = true;
        self.data.lock().await.clear();
    }
}

impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or_else(|| AppError::Internal("Session middleware not configured".into()))
    }
}

/// Session middleware configuration.
pub struct SessionLayer<B: SessionBackend> {
    pub backend: Arc<B>,
    pub signer: CookieSigner,
    pub https_only: bool,
    pub cookie_domain: Option<String>,
    pub max_age_secs: u64,
}

impl<B: SessionBackend> SessionLayer<B> {
    pub fn new(backend: Arc<B>, secret: &str) -> Self {
        Self {
            backend,
            signer: CookieSigner::new(secret.as_bytes()),
            https_only: false,
            cookie_domain: None,
            max_age_secs: 2 * 3600,
        }
    }

    /// Cookie attributes for cookies tied to this session's lifetime.
    pub fn cookie_attrs(&self, http_only: bool) -> CookieAttrs<'_> {
        CookieAttrs {
            max_age_secs: self.max_age_secs,
            http_only,
            secure: self.https_only,
            domain: self.cookie_domain.as_deref(),
        }
    }

    fn session_cookie(&self, session_id: &str) -> String {
        set_cookie(
            SESSION_COOKIE,
            &self.signer.sign(session_id),
            self.cookie_attrs(true),
        )
    }

    /// Script-readable `XSRF-TOKEN` cookie carrying `token`, with the same
    /// lifetime as the session cookie.
    pub fn xsrf_cookie(&self, token: &str) -> String {
        set_cookie(
            XSRF_COOKIE,
            &urlencoding::encode(token),
            self.cookie_attrs(false),
        )
    }

    fn delete_cookie(&self) -> String {
        set_cookie(
            SESSION_COOKIE,
            "",
            CookieAttrs {
                max_age_secs: 0,
                ..self.cookie_attrs(true)
            },
        )
    }
}

/// Axum middleware function for session handling.
pub async fn session_middleware<B: SessionBackend + 'static>(
    layer: Arc<SessionLayer<B>>,
    mut req: Request,
    next: Next,
) -> Response {
    let session_id = find_cookie(req.headers(), SESSION_COOKIE)
        .and_then(|value| layer.signer.verify(value));

    let loaded = match session_id {
        Some(id) => layer.backend.load(&id).await.map(|data| (id, data)),
        None => None,
    };
    let existing = loaded.is_some();

    // Unknown, expired or forged ids all start a fresh session
    let (id, initial) = loaded.unwrap_or_else(|| (generate_session_id(), SessionData::new()));

    let handle = SessionHandle::new(id.clone(), initial.clone());
    req.extensions_mut().insert(handle.clone());

    let mut response = next.run(req).await;

    let destroyed = *handle.destroyed.lock().await;
    let current = handle.data.lock().await.clone();

    let mut cookies = Vec::new();
    if destroyed {
        layer.backend.delete(&id).await;
        cookies.push(layer.delete_cookie());
    } else if current != initial {
        // Only persist real changes so read-only traffic never mints sessions
        layer.backend.save(&id, &current).await;
        cookies.push(layer.session_cookie(&id));
    } else if existing {
        // The backend slid its deadline on load; slide the browser's too
        cookies.push(layer.session_cookie(&id));
        if let Some(token) = current.csrf_token()
            && !sets_cookie(response.headers(), XSRF_COOKIE)
        {
            cookies.push(layer.xsrf_cookie(token));
        }
    }

    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "dropping unencodable session cookie"),
        }
    }

    response
}

fn generate_session_id() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
