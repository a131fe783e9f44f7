//! Which requests need a token at all.

use axum::http::Method;

/// Why a request skipped validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    ReadOnlyMethod,
    ExemptPath,
}

impl BypassReason {
    pub fn as_str(self) -> &'static str {
        match self {
            BypassReason::ReadOnlyMethod => "read_only_method",
            BypassReason::ExemptPath => "exempt_path",
        }
    }
}

/// Outcome of [`CsrfPolicy::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Bypass(BypassReason),
    Validate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    fn parse(raw: &str) -> Self {
        match raw.strip_suffix('*') {
            Some(prefix) => PathPattern::Prefix(normalize(prefix, false)),
            None => PathPattern::Exact(normalize(raw, true)),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => p == path,
            PathPattern::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

/// Exempt paths plus the read-only method rule.
///
/// Patterns are exact paths (`/api/login`) or prefixes ending in `*`
/// (`/webhooks/*`). Leading and trailing slashes are normalized, so
/// `api/login/` and `/api/login` are the same entry.
#[derive(Debug, Clone, Default)]
pub struct CsrfPolicy {
    exempt: Vec<PathPattern>,
}

impl CsrfPolicy {
    pub fn new<I, P>(exempt_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Self {
            exempt: exempt_paths
                .into_iter()
                .map(|p| PathPattern::parse(p.as_ref()))
                .collect(),
        }
    }

    /// `GET`, `HEAD` and `OPTIONS` never change state.
    pub fn is_reading(method: &Method) -> bool {
        matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        let path = normalize(path, true);
        self.exempt.iter().any(|p| p.matches(&path))
    }

    pub fn check(&self, method: &Method, path: &str) -> Requirement {
        if Self::is_reading(method) {
            Requirement::Bypass(BypassReason::ReadOnlyMethod)
        } else if self.is_exempt(path) {
            Requirement::Bypass(BypassReason::ExemptPath)
        } else {
            Requirement::Validate
        }
    }
}

fn normalize(path: &str, trim_trailing: bool) -> String {
    let path = path.trim();
    let path = if trim_trailing {
        path.trim_end_matches('/')
    } else {
        path
    };
    format!("/{}", path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CsrfPolicy {
        CsrfPolicy::new(["/sanctum/csrf-cookie", "api/login", "/webhooks/*"])
    }

    #[test]
    fn test_reading_methods_bypass_everywhere() {
        let policy = policy();
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            assert_eq!(
                policy.check(&method, "/api/users/1"),
                Requirement::Bypass(BypassReason::ReadOnlyMethod)
            );
        }
    }

    #[test]
    fn test_mutating_methods_validate() {
        let policy = policy();
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert_eq!(policy.check(&method, "/api/users/1"), Requirement::Validate);
        }
    }

    #[test]
    fn test_exempt_exact_paths() {
        let policy = policy();
        assert_eq!(
            policy.check(&Method::POST, "/api/login"),
            Requirement::Bypass(BypassReason::ExemptPath)
        );
        assert!(policy.is_exempt("/api/login/"));
        assert!(policy.is_exempt("/sanctum/csrf-cookie"));
        assert!(!policy.is_exempt("/api/login/extra"));
        assert!(!policy.is_exempt("/api/logins"));
    }

    #[test]
    fn test_exempt_prefix_paths() {
        let policy = policy();
        assert!(policy.is_exempt("/webhooks/stripe"));
        assert!(!policy.is_exempt("/webhook"));
    }

    #[test]
    fn test_empty_policy_exempts_nothing() {
        let policy = CsrfPolicy::default();
        assert_eq!(policy.check(&Method::POST, "/api/login"), Requirement::Validate);
    }
}
