//! Axum middleware enforcing the double-submit check.
//!
//! Read-only methods and exempt paths pass straight through. Everything
//! else must carry the session's token in `_token`, `X-CSRF-TOKEN` or
//! `X-XSRF-TOKEN` (first non-empty wins) or is answered with 419. The
//! guard never touches the token or the downstream response.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use super::context::RequestContext;
use super::policy::{CsrfPolicy, Requirement};
use super::token::validate;
use super::{FORM_FIELD, XSRF_COOKIE};
use crate::config::Config;
use crate::error::AppError;
use crate::observe::{CsrfObserver, GuardEvent, NoopObserver, TracingObserver, notify};
use crate::session::cookie::sets_cookie;
use crate::session::middleware::SessionHandle;

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Guard configuration shared by [`require_csrf`] and [`trace_csrf`].
pub struct CsrfGuard {
    pub policy: CsrfPolicy,
    pub max_body_bytes: usize,
    pub stateful_domains: Vec<String>,
    observer: Arc<dyn CsrfObserver>,
}

impl CsrfGuard {
    pub fn new(policy: CsrfPolicy) -> Self {
        Self {
            policy,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            stateful_domains: Vec::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Build from configuration. `CSRF_TRACE` selects the tracing observer.
    pub fn from_config(config: &Config) -> Self {
        let observer: Arc<dyn CsrfObserver> = if config.csrf_trace {
            Arc::new(TracingObserver)
        } else {
            Arc::new(NoopObserver)
        };

        Self {
            policy: CsrfPolicy::new(&config.exempt_paths),
            max_body_bytes: config.max_body_bytes,
            stateful_domains: config.stateful_domains.clone(),
            observer,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CsrfObserver>) -> Self {
        self.observer = observer;
        self
    }

    fn emit(&self, event: GuardEvent<'_>) {
        notify(self.observer.as_ref(), &event);
    }
}

/// Reject mutating requests whose token does not match the session's.
pub async fn require_csrf(
    State(guard): State<Arc<CsrfGuard>>,
    session: SessionHandle,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = RequestContext::capture(req.method(), req.uri().path(), req.headers());

    if let Requirement::Bypass(reason) = guard.policy.check(&ctx.method, &ctx.path) {
        guard.emit(GuardEvent::Bypassed { ctx: &ctx, reason });
        return Ok(next.run(req).await);
    }

    let (req, field) = take_token_field(req, guard.max_body_bytes).await?;
    let ctx = ctx.with_field(field);
    let session_token = session.csrf_token().await;

    match validate(&ctx.candidates, session_token.as_deref()) {
        Ok(accepted) => {
            guard.emit(GuardEvent::Accepted {
                ctx: &ctx,
                carrier: accepted.carrier,
            });
            Ok(next.run(req).await)
        }
        Err(mismatch) => {
            let carriers = ctx.carrier_report(session_token.as_deref());
            guard.emit(GuardEvent::Rejected {
                ctx: &ctx,
                mismatch: &mismatch,
                carriers: &carriers,
            });
            Err(AppError::CsrfMismatch(mismatch.to_string()))
        }
    }
}

/// Report every request and its response to the guard's observer.
///
/// Installed outside [`require_csrf`] so rejections are traced too. Body
/// fields are not read here; the guard's own events include them.
pub async fn trace_csrf(
    State(guard): State<Arc<CsrfGuard>>,
    session: SessionHandle,
    req: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::capture(req.method(), req.uri().path(), req.headers());
    let session_token = session.csrf_token().await;
    let carriers = ctx.carrier_report(session_token.as_deref());

    guard.emit(GuardEvent::Request {
        ctx: &ctx,
        carriers: &carriers,
        from_frontend: ctx.from_frontend(&guard.stateful_domains),
    });

    let response = next.run(req).await;

    guard.emit(GuardEvent::Response {
        ctx: &ctx,
        status: response.status().as_u16(),
        sets_xsrf_cookie: sets_cookie(response.headers(), XSRF_COOKIE),
    });

    response
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Form,
    Json,
}

fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();

    if essence == "application/x-www-form-urlencoded" {
        Some(BodyKind::Form)
    } else if essence == "application/json" || essence.ends_with("+json") {
        Some(BodyKind::Json)
    } else {
        None
    }
}

/// Buffer a form or JSON body, pull out `_token`, and hand back an
/// equivalent request. Other bodies are left unread.
async fn take_token_field(
    req: Request,
    limit: usize,
) -> Result<(Request, Option<String>), AppError> {
    let Some(kind) = body_kind(req.headers()) else {
        return Ok((req, None));
    };

    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(AppError::PayloadTooLarge);
    }

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {e}")))?;

    let field = match kind {
        BodyKind::Form => serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
            .ok()
            .and_then(|pairs| {
                pairs
                    .into_iter()
                    .find_map(|(k, v)| (k == FORM_FIELD).then_some(v))
            }),
        BodyKind::Json => serde_json::from_slice::<serde_json::Value>(&bytes)
            .ok()
            .and_then(|v| v.get(FORM_FIELD)?.as_str().map(String::from)),
    };

    Ok((Request::from_parts(parts, Body::from(bytes)), field))
}
