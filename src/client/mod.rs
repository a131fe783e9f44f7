//! HTTP client for CSRF-protected backends.
//!
//! [`CsrfClient`] wraps a `reqwest::Client` with its own cookie jar and a
//! [`TokenCache`]. Before the first mutating request it calls the bootstrap
//! endpoint so the server sets `XSRF-TOKEN`, then echoes that cookie in
//! `X-XSRF-TOKEN`. A 419 answer clears the cache, re-primes and resends the
//! original request once; a second 419 is returned as
//! [`ClientError::TokenMismatch`].

pub mod token_cache;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::{Method, Request, RequestBuilder, Response, Url};
use std::sync::Arc;

pub use token_cache::TokenCache;

use crate::config::DEFAULT_BOOTSTRAP_PATH;
use crate::csrf::context::decode_cookie_value;
use crate::csrf::{XSRF_COOKIE, XSRF_HEADER};
use crate::error::TOKEN_MISMATCH_STATUS;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSRF bootstrap failed: {0}")]
    Bootstrap(#[source] reqwest::Error),

    #[error("CSRF token mismatch ({status}) on {url}")]
    TokenMismatch {
        url: String,
        status: u16,
        body: String,
    },
}

impl ClientError {
    async fn mismatch(response: Response) -> Self {
        let url = response.url().to_string();
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(error = %e, url = %url, "failed to read mismatch response body");
                String::new()
            }
        };
        ClientError::TokenMismatch { url, status, body }
    }
}

/// A CSRF-aware client. Clones share the cookie jar and token cache.
#[derive(Clone)]
pub struct CsrfClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    bootstrap_url: Url,
    cache: Arc<TokenCache>,
}

impl CsrfClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_bootstrap_path(base_url, DEFAULT_BOOTSTRAP_PATH)
    }

    pub fn with_bootstrap_path(base_url: &str, bootstrap_path: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        let bootstrap_url = Url::parse(&endpoint(&base_url, bootstrap_path))
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .build()?;

        Ok(Self {
            http,
            jar,
            base_url,
            bootstrap_url,
            cache: Arc::new(TokenCache::new()),
        })
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Start a request to `path`, relative to the base URL.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, endpoint(&self.base_url, path))
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }

    /// Build and [`execute`](Self::execute) a request.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        self.execute(builder.build()?).await
    }

    /// Call the bootstrap endpoint so the server (re)sets `XSRF-TOKEN`.
    pub async fn prime(&self) -> Result<(), ClientError> {
        tracing::debug!(url = %self.bootstrap_url, "priming CSRF cookie");
        self.http
            .get(self.bootstrap_url.clone())
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(ClientError::Bootstrap)?;
        self.cache.mark_primed();
        Ok(())
    }

    /// Current `XSRF-TOKEN` cookie value for the base URL, decoded.
    pub fn xsrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        token_from_cookie_header(header.to_str().ok()?)
    }

    /// Send a request, handling priming, token attachment and one retry.
    ///
    /// Read-only requests pass through untouched. Responses other than the
    /// mismatch status are returned as-is, whatever their status.
    pub async fn execute(&self, request: Request) -> Result<Response, ClientError> {
        if !is_mutating(request.method()) {
            return Ok(self.http.execute(request).await?);
        }

        let replay = request.try_clone();
        let response = self.send_with_token(request, false).await?;
        if !is_mismatch(&response) {
            return Ok(response);
        }

        self.cache.invalidate();
        let Some(replay) = replay else {
            tracing::warn!(url = %response.url(), "CSRF mismatch on a streaming body; not retrying");
            return Err(ClientError::mismatch(response).await);
        };

        tracing::warn!(
            method = %replay.method(),
            url = %replay.url(),
            "CSRF token mismatch; re-priming and retrying once"
        );
        self.prime().await?;

        let response = self.send_with_token(replay, true).await?;
        if is_mismatch(&response) {
            self.cache.invalidate();
            tracing::error!(url = %response.url(), "CSRF token mismatch after retry; giving up");
            return Err(ClientError::mismatch(response).await);
        }
        Ok(response)
    }

    async fn send_with_token(&self, mut request: Request, replace: bool) -> Result<Response, ClientError> {
        if !self.cache.is_primed() {
            self.prime().await?;
        }
        self.attach_token(&mut request, replace);
        Ok(self.http.execute(request).await?)
    }

    /// Set `X-XSRF-TOKEN` from the jar. A caller-supplied header is kept on
    /// the first attempt and replaced on the retry.
    fn attach_token(&self, request: &mut Request, replace: bool) {
        if !replace && request.headers().contains_key(XSRF_HEADER) {
            return;
        }
        match self.xsrf_token().and_then(|t| HeaderValue::from_str(&t).ok()) {
            Some(value) => {
                request.headers_mut().insert(XSRF_HEADER, value);
            }
            None => tracing::warn!("no XSRF-TOKEN cookie to attach"),
        }
    }
}

/// `path` appended to the base URL, keeping any path the base carries.
fn endpoint(base_url: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn is_mismatch(response: &Response) -> bool {
    response.status().as_u16() == TOKEN_MISMATCH_STATUS
}

fn token_from_cookie_header(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == XSRF_COOKIE)
        .map(|(_, value)| decode_cookie_value(value))
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_cookie_header() {
        assert_eq!(
            token_from_cookie_header("csrf_session=abc; XSRF-TOKEN=tok%3D%3D"),
            Some("tok==".to_string())
        );
        assert_eq!(token_from_cookie_header("csrf_session=abc"), None);
        assert_eq!(token_from_cookie_header("XSRF-TOKEN="), None);
    }

    #[test]
    fn test_is_mutating() {
        assert!(is_mutating(&Method::POST));
        assert!(is_mutating(&Method::DELETE));
        assert!(!is_mutating(&Method::GET));
        assert!(!is_mutating(&Method::OPTIONS));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            CsrfClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_request_joins_base_url() {
        let client = CsrfClient::new("http://localhost:5000/").unwrap();
        let req = client.post("/api/users").build().unwrap();
        assert_eq!(req.url().as_str(), "http://localhost:5000/api/users");
        assert_eq!(
            client.bootstrap_url.as_str(),
            "http://localhost:5000/sanctum/csrf-cookie"
        );
    }

    #[test]
    fn test_base_path_is_kept_for_requests_and_bootstrap() {
        let client = CsrfClient::new("http://localhost:5000/backend").unwrap();
        let req = client.post("/api/echo").build().unwrap();
        assert_eq!(req.url().as_str(), "http://localhost:5000/backend/api/echo");
        assert_eq!(
            client.bootstrap_url.as_str(),
            "http://localhost:5000/backend/sanctum/csrf-cookie"
        );

        let client =
            CsrfClient::with_bootstrap_path("http://localhost:5000/backend/", "csrf").unwrap();
        assert_eq!(
            client.bootstrap_url.as_str(),
            "http://localhost:5000/backend/csrf"
        );
    }

    #[test]
    fn test_new_client_is_unprimed_without_token() {
        let client = CsrfClient::new("http://localhost:5000").unwrap();
        assert!(!client.token_cache().is_primed());
        assert!(client.xsrf_token().is_none());
    }
}
