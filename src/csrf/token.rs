//! Token candidates and the pure validation step.

use axum::http::{HeaderMap, HeaderName};
use std::fmt;
use subtle::ConstantTimeEq;

use super::{CSRF_HEADER, FORM_FIELD, XSRF_COOKIE, XSRF_HEADER};

/// Where a token was carried on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Carrier {
    /// `_token` in a form or JSON body.
    Field,
    /// `X-CSRF-TOKEN` header.
    PrimaryHeader,
    /// `X-XSRF-TOKEN` header, set by HTTP clients from the cookie.
    SecondaryHeader,
    /// `XSRF-TOKEN` cookie. Diagnostic only, never a proof on its own.
    Cookie,
}

impl Carrier {
    pub fn as_str(self) -> &'static str {
        match self {
            Carrier::Field => FORM_FIELD,
            Carrier::PrimaryHeader => "X-CSRF-TOKEN",
            Carrier::SecondaryHeader => "X-XSRF-TOKEN",
            Carrier::Cookie => XSRF_COOKIE,
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-supplied tokens that may prove the request, in precedence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenCandidates {
    pub field: Option<String>,
    pub primary_header: Option<String>,
    pub secondary_header: Option<String>,
}

impl TokenCandidates {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            field: None,
            primary_header: header_str(headers, &CSRF_HEADER),
            secondary_header: header_str(headers, &XSRF_HEADER),
        }
    }

    /// First non-empty candidate: field, then primary header, then secondary.
    pub fn preferred(&self) -> Option<(Carrier, &str)> {
        [
            (Carrier::Field, &self.field),
            (Carrier::PrimaryHeader, &self.primary_header),
            (Carrier::SecondaryHeader, &self.secondary_header),
        ]
        .into_iter()
        .find_map(|(carrier, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (carrier, v))
        })
    }
}

/// Proof that a request carried the session's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub carrier: Carrier,
}

/// Why a request failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Mismatch {
    #[error("no CSRF token was supplied")]
    MissingCandidate,

    #[error("the session has no CSRF token")]
    MissingSessionToken,

    #[error("CSRF token from {0} does not match the session")]
    Different(Carrier),
}

/// Compare the preferred candidate against the session token.
///
/// Only the first non-empty candidate is considered; a stale field is not
/// rescued by a correct header.
pub fn validate(
    candidates: &TokenCandidates,
    session_token: Option<&str>,
) -> Result<Accepted, Mismatch> {
    let (carrier, supplied) = candidates.preferred().ok_or(Mismatch::MissingCandidate)?;
    let expected = session_token
        .filter(|t| !t.is_empty())
        .ok_or(Mismatch::MissingSessionToken)?;

    if tokens_equal(expected, supplied) {
        Ok(Accepted { carrier })
    } else {
        Err(Mismatch::Different(carrier))
    }
}

/// Timing-safe byte equality. Lengths are not secret.
pub fn tokens_equal(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

fn header_str(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
