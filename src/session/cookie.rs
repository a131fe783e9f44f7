//! Cookie plumbing: HMAC-SHA256 session id signing, `Cookie` header lookup,
//! and `Set-Cookie` formatting.
//!
//! Signed value format: `base64url(session_id).base64url(hmac_signature)`.
//! The HMAC covers only the session id; session data lives server-side.

use axum::http::{HeaderMap, header};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies session id cookies with a keyed HMAC.
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl CookieSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            mac: HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length"),
        }
    }

    pub fn sign(&self, session_id: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(session_id.as_bytes());
        let signature = mac.finalize().into_bytes();

        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(session_id.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Returns the session id if the signature checks out.
    pub fn verify(&self, cookie_value: &str) -> Option<String> {
        let (id_part, sig_part) = cookie_value.split_once('.')?;
        let session_id = String::from_utf8(URL_SAFE_NO_PAD.decode(id_part).ok()?).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(sig_part).ok()?;

        let mut mac = self.mac.clone();
        mac.update(session_id.as_bytes());
        mac.verify_slice(&signature).ok()?;

        Some(session_id)
    }
}

/// Find a cookie by name across every `Cookie` header on the request.
pub fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}

/// Names of all cookies sent with the request. Values are never exposed.
pub fn cookie_names(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('=').map(|(k, _)| k.to_string()))
        .collect()
}

/// Whether the response already sets cookie `name`.
pub fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split_once('=').is_some_and(|(k, _)| k.trim() == name))
}

/// Attributes shared by every cookie this service sets.
#[derive(Debug, Clone, Copy)]
pub struct CookieAttrs<'a> {
    pub max_age_secs: u64,
    pub http_only: bool,
    pub secure: bool,
    pub domain: Option<&'a str>,
}

/// Format a `Set-Cookie` header value.
pub fn set_cookie(name: &str, value: &str, attrs: CookieAttrs<'_>) -> String {
    let mut parts = vec![
        format!("{name}={value}"),
        format!("Max-Age={}", attrs.max_age_secs),
        "Path=/".into(),
    ];
    if attrs.http_only {
        parts.push("HttpOnly".into());
    }
    parts.push("SameSite=Lax".into());
    if attrs.secure {
        parts.push("Secure".into());
    }
    if let Some(domain) = attrs.domain {
        parts.push(format!("Domain={domain}"));
    }
    parts.join("; ")
}
