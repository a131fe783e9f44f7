//! Per-request snapshot of everything the guard and its observers look at.

use axum::http::{HeaderMap, Method, header};
use sha2::{Digest, Sha256};

use super::XSRF_COOKIE;
use super::token::{Carrier, TokenCandidates, tokens_equal};
use crate::session::cookie::find_cookie;

/// Method, path, origin hints and every token carrier found on one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub origin: Option<String>,
    pub referer: Option<String>,
    pub host: Option<String>,
    pub cookie_token: Option<String>,
    pub candidates: TokenCandidates,
}

impl RequestContext {
    pub fn capture(method: &Method, path: &str, headers: &HeaderMap) -> Self {
        let text = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };

        Self {
            method: method.clone(),
            path: path.to_string(),
            origin: text(header::ORIGIN),
            referer: text(header::REFERER),
            host: text(header::HOST),
            cookie_token: find_cookie(headers, XSRF_COOKIE).map(decode_cookie_value),
            candidates: TokenCandidates::from_headers(headers),
        }
    }

    pub fn with_field(mut self, field: Option<String>) -> Self {
        self.candidates.field = field;
        self
    }

    /// Whether the referer (or, failing that, origin) names a stateful
    /// frontend domain. Entries may carry a port (`localhost:3000`).
    pub fn from_frontend(&self, stateful_domains: &[String]) -> bool {
        let Some(source) = self.referer.as_deref().or(self.origin.as_deref()) else {
            return false;
        };
        let Some(authority) = authority_of(source) else {
            return false;
        };
        let host = host_of(authority);
        let bare_host = host.trim_start_matches('[').trim_end_matches(']');

        stateful_domains
            .iter()
            .any(|d| d == authority || d == host || d == bare_host)
    }

    /// Presence and match status of each carrier against the session token.
    pub fn carrier_report(&self, session_token: Option<&str>) -> CarrierReport {
        let carriers = [
            (Carrier::Field, self.candidates.field.as_deref()),
            (Carrier::PrimaryHeader, self.candidates.primary_header.as_deref()),
            (Carrier::SecondaryHeader, self.candidates.secondary_header.as_deref()),
            (Carrier::Cookie, self.cookie_token.as_deref()),
        ];

        CarrierReport {
            session_token: session_token.map(TokenSummary::of),
            carriers: carriers
                .into_iter()
                .filter_map(|(carrier, value)| {
                    let value = value?;
                    Some(CarrierStatus {
                        carrier,
                        token: TokenSummary::of(value),
                        matches_session: session_token
                            .is_some_and(|expected| tokens_equal(expected, value)),
                    })
                })
                .collect(),
        }
    }
}

/// Loggable description of a token: never the token itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSummary {
    pub length: usize,
    pub fingerprint: String,
}

impl TokenSummary {
    pub fn of(token: &str) -> Self {
        let digest = format!("{:x}", Sha256::digest(token.as_bytes()));
        Self {
            length: token.len(),
            fingerprint: digest[..8].to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierStatus {
    pub carrier: Carrier,
    pub token: TokenSummary,
    pub matches_session: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarrierReport {
    pub session_token: Option<TokenSummary>,
    pub carriers: Vec<CarrierStatus>,
}

impl CarrierReport {
    pub fn any_match(&self) -> bool {
        self.carriers.iter().any(|c| c.matches_session)
    }
}

/// Cookie values may be percent-encoded by whoever set them.
pub fn decode_cookie_value(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn authority_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, r)| r)?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit('@').next()?;
    (!authority.is_empty()).then_some(authority)
}

/// Host part of an authority; IPv6 literals keep their brackets.
fn host_of(authority: &str) -> &str {
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    authority.split(':').next().unwrap_or(authority)
}
