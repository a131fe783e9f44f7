//! CSRF double-submit guard for session-backed APIs, plus a client that
//! keeps itself in sync with it.
//!
//! The server side is an Axum router: a session layer owns the token, a
//! bootstrap route hands it to the browser in `XSRF-TOKEN`, and
//! [`csrf::require_csrf`] checks every mutating request. The client side is
//! [`client::CsrfClient`], which primes the cookie, echoes it back and
//! recovers once from a 419.

pub mod client;
pub mod config;
pub mod csrf;
pub mod error;
pub mod observe;
pub mod routes;
pub mod session;
pub mod types;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::csrf::{CSRF_HEADER, CsrfGuard, XSRF_HEADER, require_csrf, trace_csrf};
use crate::session::memory::InMemoryBackend;
use crate::session::middleware::{SessionLayer, session_middleware};

/// Shared application state available to all route handlers.
pub struct AppState {
    pub config: Config,
    pub session_layer: Arc<SessionLayer<InMemoryBackend>>,
    pub guard: Arc<CsrfGuard>,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        let mut session_layer =
            SessionLayer::new(Arc::new(InMemoryBackend::new()), &config.session_secret);
        session_layer.https_only = config.session_https_only;
        session_layer.cookie_domain = config.cookie_domain.clone();

        Self {
            guard: Arc::new(CsrfGuard::from_config(&config)),
            session_layer: Arc::new(session_layer),
            config,
        }
    }
}

/// Build the Axum router with all middleware and routes.
pub fn create_app(state: Arc<AppState>) -> Router {
    create_app_with(state, Router::new())
}

/// Like [`create_app`], with `extra` routes mounted behind the same
/// session and CSRF layers.
pub fn create_app_with(state: Arc<AppState>, extra: Router<Arc<AppState>>) -> Router {
    let session_layer = state.session_layer.clone();
    let guard = state.guard.clone();

    let mut router = Router::new()
        .route("/health", get(routes::health::health))
        .route(
            &state.config.bootstrap_path,
            get(routes::csrf_cookie::csrf_cookie),
        )
        .route(
            "/api/echo",
            post(routes::echo::echo)
                .put(routes::echo::echo)
                .patch(routes::echo::echo)
                .delete(routes::echo::echo),
        )
        .route("/api/logout", post(routes::logout::logout));

    if state.config.debug_routes {
        tracing::warn!("debug routes enabled: /api/debug/csrf exposes session tokens");
        router = router.route("/api/debug/csrf", get(routes::debug::debug_csrf));
    }

    // Guard sits inside the session layer so it can read the token
    let mut router = router
        .merge(extra)
        .layer(from_fn_with_state(guard.clone(), require_csrf));

    if state.config.csrf_trace {
        router = router.layer(from_fn_with_state(guard, trace_csrf));
    }

    router
        .layer(from_fn(move |req, next| {
            let layer = session_layer.clone();
            session_middleware(layer, req, next)
        }))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS: single frontend origin with credentials.
fn cors_layer(config: &Config) -> CorsLayer {
    let origin = match HeaderValue::from_str(&config.frontend_url) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            tracing::warn!(error = %e, url = %config.frontend_url, "invalid FRONTEND_URL; CORS disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            CSRF_HEADER,
            XSRF_HEADER,
            axum::http::HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}
