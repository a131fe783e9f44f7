//! Observability hook for the CSRF guard.
//!
//! The guard reports what it decided through a [`CsrfObserver`]; it never
//! logs directly. The default observer does nothing. [`TracingObserver`]
//! emits one structured JSON event per call via `tracing` at target
//! `csrf`. Observers can never fail a request: panics are swallowed by
//! [`notify`].

use serde_json::json;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::csrf::context::{CarrierReport, RequestContext, TokenSummary};
use crate::csrf::policy::BypassReason;
use crate::csrf::token::{Carrier, Mismatch};

/// Something the guard decided or saw.
#[derive(Debug)]
pub enum GuardEvent<'a> {
    /// A request arrived (emitted by the tracing middleware).
    Request {
        ctx: &'a RequestContext,
        carriers: &'a CarrierReport,
        from_frontend: bool,
    },
    Bypassed {
        ctx: &'a RequestContext,
        reason: BypassReason,
    },
    Accepted {
        ctx: &'a RequestContext,
        carrier: Carrier,
    },
    Rejected {
        ctx: &'a RequestContext,
        mismatch: &'a Mismatch,
        carriers: &'a CarrierReport,
    },
    /// The response left the stack (emitted by the tracing middleware).
    Response {
        ctx: &'a RequestContext,
        status: u16,
        sets_xsrf_cookie: bool,
    },
}

impl GuardEvent<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            GuardEvent::Request { .. } => "request",
            GuardEvent::Bypassed { .. } => "bypassed",
            GuardEvent::Accepted { .. } => "accepted",
            GuardEvent::Rejected { .. } => "rejected",
            GuardEvent::Response { .. } => "response",
        }
    }

    fn ctx(&self) -> &RequestContext {
        match self {
            GuardEvent::Request { ctx, .. }
            | GuardEvent::Bypassed { ctx, .. }
            | GuardEvent::Accepted { ctx, .. }
            | GuardEvent::Rejected { ctx, .. }
            | GuardEvent::Response { ctx, .. } => *ctx,
        }
    }
}

/// Receives guard events. Implementations must not block.
pub trait CsrfObserver: Send + Sync {
    fn observe(&self, event: &GuardEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CsrfObserver for NoopObserver {
    fn observe(&self, _event: &GuardEvent<'_>) {}
}

/// Emits events as JSON lines through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CsrfObserver for TracingObserver {
    fn observe(&self, event: &GuardEvent<'_>) {
        let Ok(line) = serde_json::to_string(&event_json(event)) else {
            return;
        };
        match event {
            GuardEvent::Rejected { .. } => tracing::warn!(target: "csrf", "{}", line),
            _ => tracing::info!(target: "csrf", "{}", line),
        }
    }
}

/// Deliver an event, absorbing any panic raised by the observer.
pub fn notify(observer: &dyn CsrfObserver, event: &GuardEvent<'_>) {
    if catch_unwind(AssertUnwindSafe(|| observer.observe(event))).is_err() {
        tracing::debug!(kind = event.kind(), "csrf observer panicked; event dropped");
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn summary_json(summary: &TokenSummary) -> serde_json::Value {
    json!({"length": summary.length, "fingerprint": summary.fingerprint})
}

fn carriers_json(report: &CarrierReport) -> serde_json::Value {
    json!({
        "session_token": report.session_token.as_ref().map(summary_json),
        "any_match": report.any_match(),
        "carriers": report.carriers.iter().map(|c| json!({
            "carrier": c.carrier.as_str(),
            "token": summary_json(&c.token),
            "matches_session": c.matches_session,
        })).collect::<Vec<_>>(),
    })
}

/// Render an event as the JSON object `TracingObserver` logs.
pub fn event_json(event: &GuardEvent<'_>) -> serde_json::Value {
    let ctx = event.ctx();
    let mut out = json!({
        "event": event.kind(),
        "time": now_millis(),
        "method": ctx.method.as_str(),
        "path": ctx.path,
    });

    match event {
        GuardEvent::Request {
            carriers,
            from_frontend,
            ..
        } => {
            out["origin"] = json!(ctx.origin);
            out["referer"] = json!(ctx.referer);
            out["host"] = json!(ctx.host);
            out["from_frontend"] = json!(from_frontend);
            out["tokens"] = carriers_json(carriers);
        }
        GuardEvent::Bypassed { reason, .. } => {
            out["reason"] = json!(reason.as_str());
        }
        GuardEvent::Accepted { carrier, .. } => {
            out["carrier"] = json!(carrier.as_str());
        }
        GuardEvent::Rejected {
            mismatch, carriers, ..
        } => {
            out["reason"] = json!(mismatch.to_string());
            out["tokens"] = carriers_json(carriers);
        }
        GuardEvent::Response {
            status,
            sets_xsrf_cookie,
            ..
        } => {
            out["status"] = json!(status);
            out["sets_xsrf_cookie"] = json!(sets_xsrf_cookie);
        }
    }

    out
}
