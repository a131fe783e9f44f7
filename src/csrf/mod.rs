//! CSRF double-submit guard.
//!
//! The session owns the token. The bootstrap route copies it into a
//! script-readable `XSRF-TOKEN` cookie; clients echo it back in a header or
//! a `_token` field; [`guard::require_csrf`] compares the echo against the
//! session copy with [`token::validate`] and rejects with 419 on mismatch.

pub mod context;
pub mod guard;
pub mod policy;
pub mod token;

use axum::http::HeaderName;

/// Script-readable cookie carrying the token to the client.
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

/// Primary header (`X-CSRF-TOKEN`), typically set from a `<meta>` tag.
pub const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");

/// Secondary header (`X-XSRF-TOKEN`), set by HTTP clients from the cookie.
pub const XSRF_HEADER: HeaderName = HeaderName::from_static("x-xsrf-token");

/// Body field carrying the token in form and JSON submissions.
pub const FORM_FIELD: &str = "_token";

pub use context::RequestContext;
pub use guard::{CsrfGuard, require_csrf, trace_csrf};
pub use policy::{BypassReason, CsrfPolicy, Requirement};
pub use token::{Accepted, Carrier, Mismatch, TokenCandidates, validate};
