//! Test utilities: app builders, session seeding, request helpers and a
//! live-server harness for client tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::http::request::Builder;
use axum::middleware::{Next, from_fn};
use axum::response::Response;
use csrf_guard::config::Config;
use csrf_guard::csrf::CsrfGuard;
use csrf_guard::observe::{CsrfObserver, GuardEvent};
use csrf_guard::session::middleware::SESSION_COOKIE;
use csrf_guard::session::{CSRF_TOKEN_KEY, SessionBackend, SessionData};
use csrf_guard::{AppState, create_app_with};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Build a test app from `config`.
pub fn build_test_app(config: Config) -> (Router, Arc<AppState>) {
    build_test_app_with(config, None, Router::new())
}

/// Build a test app with an optional observer and extra routes mounted
/// behind the session and CSRF layers.
pub fn build_test_app_with(
    config: Config,
    observer: Option<Arc<dyn CsrfObserver>>,
    extra: Router<Arc<AppState>>,
) -> (Router, Arc<AppState>) {
    let mut state = AppState::from_config(config);
    if let Some(observer) = observer {
        state.guard = Arc::new(CsrfGuard::from_config(&state.config).with_observer(observer));
    }
    let state = Arc::new(state);
    (create_app_with(state.clone(), extra), state)
}

/// Store a session holding `token` and return the matching `Cookie` pair.
pub async fn seed_session(state: &AppState, session_id: &str, token: &str) -> String {
    let mut data = SessionData::new();
    data.set(CSRF_TOKEN_KEY, json!(token));
    state.session_layer.backend.save(session_id, &data).await;
    session_cookie(state, session_id)
}

/// `Cookie` pair for `session_id`, signed with the app's secret.
pub fn session_cookie(state: &AppState, session_id: &str) -> String {
    format!(
        "{}={}",
        SESSION_COOKIE,
        state.session_layer.signer.sign(session_id)
    )
}

/// Request builder carrying the session cookie.
pub fn with_session(method: &str, uri: &str, cookie: &str) -> Builder {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("Cookie", cookie)
}

/// JSON request to `uri` carrying the session cookie and `X-XSRF-TOKEN`.
pub fn json_with_token(
    method: &str,
    uri: &str,
    cookie: &str,
    token: &str,
    body: &Value,
) -> axum::http::Request<Body> {
    with_session(method, uri, cookie)
        .header("Content-Type", "application/json")
        .header("X-XSRF-TOKEN", token)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// All `Set-Cookie` header values on a response.
pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(String::from)
        .collect()
}

/// Full `Set-Cookie` line for cookie `name`, if the response sets it.
pub fn set_cookie_line(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&prefix))
}

/// Value of cookie `name` set by the response.
pub fn cookie_value(response: &Response, name: &str) -> Option<String> {
    let line = set_cookie_line(response, name)?;
    line.split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, v)| v.to_string())
}

/// Observer that records event kinds, for asserting what the guard saw.
#[derive(Default)]
pub struct RecordingObserver {
    pub kinds: Mutex<Vec<&'static str>>,
}

impl RecordingObserver {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.kinds.lock().unwrap().clone()
    }
}

impl CsrfObserver for RecordingObserver {
    fn observe(&self, event: &GuardEvent<'_>) {
        self.kinds.lock().unwrap().push(event.kind());
    }
}

/// Observer that panics on every event.
pub struct PanickingObserver;

impl CsrfObserver for PanickingObserver {
    fn observe(&self, _event: &GuardEvent<'_>) {
        panic!("observer failure");
    }
}

/// Method, path and status of every request that reached the app.
#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<(String, String, u16)>>>);

impl RequestLog {
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.statuses(method, path).len()
    }

    pub fn statuses(&self, method: &str, path: &str) -> Vec<u16> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, p, _)| m == method && p == path)
            .map(|(_, _, s)| *s)
            .collect()
    }
}

/// Wrap `app` so every request is recorded in the returned log.
pub fn with_request_log(app: Router) -> (Router, RequestLog) {
    let log = RequestLog::default();
    let recorder = log.clone();
    let app = app.layer(from_fn(move |req: Request, next: Next| {
        let log = recorder.clone();
        async move {
            let method = req.method().to_string();
            let path = req.uri().path().to_string();
            let response = next.run(req).await;
            log.0
                .lock()
                .unwrap()
                .push((method, path, response.status().as_u16()));
            response
        }
    }));
    (app, log)
}

/// Serve `app` on an ephemeral local port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
