//! Application configuration via environment variables.

use std::env;
use std::str::FromStr;

/// Default path of the token bootstrap endpoint.
pub const DEFAULT_BOOTSTRAP_PATH: &str = "/sanctum/csrf-cookie";

/// Default login path, exempt from CSRF validation.
pub const DEFAULT_LOGIN_PATH: &str = "/api/login";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub session_secret: String,
    pub frontend_url: String,
    pub port: u16,
    pub session_https_only: bool,
    pub cookie_domain: Option<String>,
    pub bootstrap_path: String,
    pub exempt_paths: Vec<String>,
    pub stateful_domains: Vec<String>,
    pub max_body_bytes: usize,
    pub csrf_trace: bool,
    pub debug_routes: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required: `SESSION_SECRET`. Everything else has a default suited to
    /// local development against a frontend on `localhost:3000`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bootstrap_path =
            env::var("CSRF_BOOTSTRAP_PATH").unwrap_or_else(|_| DEFAULT_BOOTSTRAP_PATH.into());

        let exempt_paths = match env::var("CSRF_EXEMPT_PATHS") {
            Ok(raw) => split_list(&raw),
            Err(_) => vec![bootstrap_path.clone(), DEFAULT_LOGIN_PATH.into()],
        };

        Ok(Self {
            session_secret: required_env("SESSION_SECRET")?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            port: parse_or("PORT", env::var("PORT").ok(), 5000)?,
            session_https_only: env_flag("SESSION_HTTPS_ONLY"),
            cookie_domain: env::var("COOKIE_DOMAIN").ok().filter(|d| !d.is_empty()),
            bootstrap_path,
            exempt_paths,
            stateful_domains: env::var("STATEFUL_DOMAINS")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(|_| vec!["localhost".into(), "localhost:3000".into()]),
            max_body_bytes: parse_or(
                "CSRF_MAX_BODY_BYTES",
                env::var("CSRF_MAX_BODY_BYTES").ok(),
                2 * 1024 * 1024,
            )?,
            csrf_trace: env_flag("CSRF_TRACE"),
            debug_routes: env_flag("DEBUG_ROUTES"),
        })
    }

    /// Configuration for tests: all fields settable directly.
    pub fn test_default() -> Self {
        Self {
            session_secret: "test-secret-key".into(),
            frontend_url: "http://localhost:3000".into(),
            port: 5000,
            session_https_only: false,
            cookie_domain: None,
            bootstrap_path: DEFAULT_BOOTSTRAP_PATH.into(),
            exempt_paths: vec![DEFAULT_BOOTSTRAP_PATH.into(), DEFAULT_LOGIN_PATH.into()],
            stateful_domains: vec!["localhost".into(), "localhost:3000".into()],
            max_body_bytes: 64 * 1024,
            csrf_trace: false,
            debug_routes: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for {0}: {1:?}")]
    Invalid(String, String),
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(key.into()))
}

/// Parse `raw` if present; a present but unparsable value is an error.
fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key.into(), raw)),
        None => Ok(default),
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| v == "true" || v == "1" || v == "True")
        .unwrap_or(false)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_creates_valid_config() {
        let cfg = Config::test_default();
        assert_eq!(cfg.bootstrap_path, "/sanctum/csrf-cookie");
        assert_eq!(cfg.port, 5000);
        assert!(!cfg.session_https_only);
        assert!(!cfg.debug_routes);
        assert!(cfg.exempt_paths.contains(&"/api/login".to_string()));
    }

    #[test]
    fn test_split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(" /a, /b/* ,,"),
            vec!["/a".to_string(), "/b/*".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_required_env_missing() {
        let err = required_env("CSRF_GUARD_UNSET_FOR_TESTS").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ref key) if key == "CSRF_GUARD_UNSET_FOR_TESTS"));
        assert!(err.to_string().contains("CSRF_GUARD_UNSET_FOR_TESTS"));
    }

    #[test]
    fn test_parse_or_rejects_invalid_values() {
        assert_eq!(parse_or::<u16>("PORT", None, 5000).unwrap(), 5000);
        assert_eq!(parse_or::<u16>("PORT", Some(" 8080 ".into()), 5000).unwrap(), 8080);

        let err = parse_or::<u16>("PORT", Some("eighty".into()), 5000).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref key, ref raw) if key == "PORT" && raw == "eighty"));

        let err = parse_or::<usize>("CSRF_MAX_BODY_BYTES", Some("-1".into()), 1024).unwrap_err();
        assert!(err.to_string().contains("CSRF_MAX_BODY_BYTES"));
    }
}
