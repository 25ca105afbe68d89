//! Route guard middleware
//!
//! A coarse presence check on the credential cookie. The token itself is not
//! inspected here; it is validated when used against the task API.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::headers::{Cookie, HeaderMapExt};
use client::{CredentialPort, credentials::session_cookie};
use common::AppConfig;
use tracing::debug;

use crate::state::AppState;

/// Which paths require a persisted token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPolicy {
    pub login_path: String,
    pub protected: Vec<String>,
    pub public: Vec<String>,
}

/// Outcome of evaluating a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    Redirect(String),
}

impl GuardPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            login_path: config.login_path.clone(),
            protected: config.protected_routes.clone(),
            public: config.public_routes.clone(),
        }
    }

    /// Decide whether `path` may be served given the cookie token
    ///
    /// The login path and public routes always pass, otherwise a protected
    /// prefix would redirect to itself.
    pub fn evaluate(&self, path: &str, token: Option<&str>) -> GuardDecision {
        if matches_prefix(path, &self.login_path)
            || self.public.iter().any(|prefix| matches_prefix(path, prefix))
        {
            return GuardDecision::Pass;
        }

        let protected = self.protected.iter().any(|prefix| matches_prefix(path, prefix));
        let has_token = token.is_some_and(|t| !t.is_empty());

        if protected && !has_token {
            GuardDecision::Redirect(self.login_path.clone())
        } else {
            GuardDecision::Pass
        }
    }
}

/// Prefix match on segment boundaries: `/tasks` covers `/tasks/5` but not `/tasksx`
fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }

    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Credential port seeded with the token cookie of a request
pub fn request_credentials(key: &str, headers: &HeaderMap) -> CredentialPort {
    let credentials = CredentialPort::in_memory(key);
    let token = headers
        .typed_get::<Cookie>()
        .and_then(|c| c.get(key).map(str::to_string));

    if let Some(token) = token {
        credentials.cookies().assign(&session_cookie(key, &token));
        // the browser already holds this cookie
        credentials.cookies().take_writes();
    }
    credentials
}

/// Redirect protected requests without a credential cookie to the login path
pub async fn route_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let token = request_credentials(&state.config.token_key, req.headers()).token();

    match state.policy.evaluate(req.uri().path(), token.as_deref()) {
        GuardDecision::Pass => next.run(req).await,
        GuardDecision::Redirect(to) => {
            debug!("No credential for {}, redirecting to {}", req.uri().path(), to);
            Redirect::temporary(&to).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(protected: &[&str]) -> GuardPolicy {
        GuardPolicy {
            login_path: "/login".to_string(),
            protected: protected.iter().map(|p| p.to_string()).collect(),
            public: vec!["/health".to_string(), "/signup".to_string()],
        }
    }

    #[test]
    fn test_root_protects_everything() {
        let policy = policy(&["/"]);

        assert_eq!(
            policy.evaluate("/", None),
            GuardDecision::Redirect("/login".to_string())
        );
        assert_eq!(
            policy.evaluate("/settings/profile", None),
            GuardDecision::Redirect("/login".to_string())
        );
        assert_eq!(policy.evaluate("/", Some("t1")), GuardDecision::Pass);
    }

    #[test]
    fn test_login_and_public_routes_always_pass() {
        let policy = policy(&["/"]);

        assert_eq!(policy.evaluate("/login", None), GuardDecision::Pass);
        assert_eq!(policy.evaluate("/health", None), GuardDecision::Pass);
        assert_eq!(policy.evaluate("/signup", None), GuardDecision::Pass);
    }

    #[test]
    fn test_prefix_matches_on_segment_boundary() {
        let policy = policy(&["/tasks"]);

        assert_ne!(policy.evaluate("/tasks", None), GuardDecision::Pass);
        assert_ne!(policy.evaluate("/tasks/5", None), GuardDecision::Pass);
        assert_eq!(policy.evaluate("/tasksx", None), GuardDecision::Pass);
        assert_eq!(policy.evaluate("/about", None), GuardDecision::Pass);
    }

    #[test]
    fn test_empty_token_counts_as_absent() {
        let policy = policy(&["/"]);

        assert_eq!(
            policy.evaluate("/", Some("")),
            GuardDecision::Redirect("/login".to_string())
        );
    }

    #[test]
    fn test_token_is_not_inspected() {
        let policy = policy(&["/"]);
        assert_eq!(policy.evaluate("/", Some("garbage")), GuardDecision::Pass);
    }

    #[test]
    fn test_request_credentials_reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            "theme=dark; authToken=t1".parse().unwrap(),
        );

        assert_eq!(
            request_credentials("authToken", &headers).token().as_deref(),
            Some("t1")
        );
        assert_eq!(request_credentials("other", &headers).token(), None);
        assert_eq!(request_credentials("authToken", &HeaderMap::new()).token(), None);
    }

    #[test]
    fn test_request_credentials_start_without_writes() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::COOKIE, "authToken=t1".parse().unwrap());

        let credentials = request_credentials("authToken", &headers);
        assert!(credentials.cookies().take_writes().is_empty());

        credentials.clear().unwrap();
        assert_eq!(
            credentials.cookies().take_writes(),
            vec!["authToken=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/"]
        );
    }
}
