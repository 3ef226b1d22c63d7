//! Request admission by path.
//!
//! An [`AccessPolicy`] is an ordered, immutable table of
//! `path pattern -> requirement` rules built once at startup. [`AccessGuard`]
//! applies it to every request in front of the handlers.
//!
//! "Authenticated" means only that the session cookie is present and
//! non-empty. The token itself is not checked against anything, and there is
//! no CSRF protection.

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;
use tracing::warn;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRequirement {
    Public,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    /// Matches the prefix itself and anything below it, e.g. `/api/admin`
    /// matches `/api/admin` and `/api/admin/users` but not `/api/administer`.
    Prefix(String),
}

impl PathPattern {
    /// `"/foo/*"` is a prefix pattern, anything else is exact.
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/*") {
            Some(prefix) => PathPattern::Prefix(prefix.to_string()),
            None => PathPattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Prefix(prefix) => path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<(PathPattern, AccessRequirement)>,
    fallback: AccessRequirement,
    session_cookie: String,
}

impl AccessPolicy {
    pub fn builder(session_cookie: impl Into<String>) -> AccessPolicyBuilder {
        AccessPolicyBuilder {
            rules: Vec::new(),
            fallback: AccessRequirement::Authenticated,
            session_cookie: session_cookie.into(),
        }
    }

    /// The auth endpoints and the health check are open; everything else
    /// needs a session cookie.
    pub fn standard(session_cookie: impl Into<String>) -> Self {
        Self::builder(session_cookie)
            .rule("/api/auth/register", AccessRequirement::Public)
            .rule("/api/auth/login", AccessRequirement::Public)
            .rule("/api/auth/logout", AccessRequirement::Public)
            .rule("/health", AccessRequirement::Public)
            .build()
    }

    /// First matching rule wins; unmatched paths get the fallback.
    pub fn requirement_for(&self, path: &str) -> AccessRequirement {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, requirement)| *requirement)
            .unwrap_or(self.fallback)
    }

    pub fn admits(&self, path: &str, session_token: Option<&str>) -> bool {
        match self.requirement_for(path) {
            AccessRequirement::Public => true,
            AccessRequirement::Authenticated => session_token.is_some_and(|t| !t.is_empty()),
        }
    }

    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }
}

pub struct AccessPolicyBuilder {
    rules: Vec<(PathPattern, AccessRequirement)>,
    fallback: AccessRequirement,
    session_cookie: String,
}

impl AccessPolicyBuilder {
    pub fn rule(mut self, pattern: &str, requirement: AccessRequirement) -> Self {
        self.rules.push((PathPattern::parse(pattern), requirement));
        self
    }

    pub fn fallback(mut self, requirement: AccessRequirement) -> Self {
        self.fallback = requirement;
        self
    }

    pub fn build(self) -> AccessPolicy {
        AccessPolicy {
            rules: self.rules,
            fallback: self.fallback,
            session_cookie: self.session_cookie,
        }
    }
}

/// Middleware factory enforcing an [`AccessPolicy`].
#[derive(Clone)]
pub struct AccessGuard {
    policy: Arc<AccessPolicy>,
}

impl AccessGuard {
    pub fn new(policy: Arc<AccessPolicy>) -> Self {
        Self { policy }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AccessGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessGuardMiddleware {
            service,
            policy: self.policy.clone(),
        }))
    }
}

pub struct AccessGuardMiddleware<S> {
    service: S,
    policy: Arc<AccessPolicy>,
}

impl<S, B> Service<ServiceRequest> for AccessGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .request()
            .cookie(self.policy.session_cookie())
            .map(|cookie| cookie.value().to_string());

        if self.policy.admits(req.path(), token.as_deref()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        warn!("Rejected unauthenticated request to {}", req.path());
        let response = AppError::Unauthenticated.error_response();
        Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_patterns() {
        let exact = PathPattern::parse("/api/auth/login");
        assert!(exact.matches("/api/auth/login"));
        assert!(!exact.matches("/api/auth/login/extra"));

        let prefix = PathPattern::parse("/api/admin/*");
        assert_eq!(prefix, PathPattern::Prefix("/api/admin".into()));
        assert!(prefix.matches("/api/admin"));
        assert!(prefix.matches("/api/admin/users"));
        assert!(!prefix.matches("/api/administer"));
    }

    #[test]
    fn test_standard_policy() {
        let policy = AccessPolicy::standard("JSESSIONID");

        for path in ["/api/auth/register", "/api/auth/login", "/api/auth/logout", "/health"] {
            assert_eq!(policy.requirement_for(path), AccessRequirement::Public, "{}", path);
            assert!(policy.admits(path, None));
        }

        assert_eq!(policy.requirement_for("/api/reports"), AccessRequirement::Authenticated);
        assert!(!policy.admits("/api/reports", None));
        assert!(!policy.admits("/api/reports", Some("")));
    }

    #[test]
    fn test_any_non_empty_cookie_is_trusted() {
        let policy = AccessPolicy::standard("JSESSIONID");
        assert!(policy.admits("/api/reports", Some("never-issued-by-this-server")));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let policy = AccessPolicy::builder("sid")
            .rule("/docs/private", AccessRequirement::Authenticated)
            .rule("/docs/*", AccessRequirement::Public)
            .fallback(AccessRequirement::Public)
            .build();

        assert_eq!(policy.requirement_for("/docs/private"), AccessRequirement::Authenticated);
        assert_eq!(policy.requirement_for("/docs/intro"), AccessRequirement::Public);
        assert_eq!(policy.requirement_for("/elsewhere"), AccessRequirement::Public);
        assert_eq!(policy.session_cookie(), "sid");
    }
}
