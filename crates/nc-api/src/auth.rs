//! Bearer-token auth (§4.6: "Auth is a bearer token validated against a
//! shared secret; admin endpoints require it, health does not").
//!
//! Simpler than the teacher's JWT/session-cookie/authorization-service
//! stack, since there is exactly one admin principal here: a single
//! shared secret configured via `AuthConfig::admin_token`. An empty
//! token (dev mode) disables the check entirely.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use subtle::ConstantTimeEq;
use tower::{Layer, Service};

#[derive(Clone)]
pub struct AuthState {
    /// Empty means auth is disabled (dev mode).
    admin_token: Arc<String>,
}

impl AuthState {
    pub fn new(admin_token: String) -> Self {
        Self { admin_token: Arc::new(admin_token) }
    }

    fn accepts(&self, presented: &str) -> bool {
        if self.admin_token.is_empty() {
            return true;
        }
        presented.as_bytes().ct_eq(self.admin_token.as_bytes()).into()
    }
}

pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = crate::error::ErrorResponse { error: "UNAUTHORIZED".to_string(), message: self.message.to_string() };
        (self.status, Json(body)).into_response()
    }
}

/// Marker extractor. Route handlers take `_auth: Authenticated` purely to
/// document (and enforce at the type level) that the route requires the
/// `AuthLayer` to have run. The actual check happens in the layer.
pub struct Authenticated;

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if parts.extensions.get::<Authenticated>().is_some() {
            Ok(Authenticated)
        } else {
            Err(AuthRejection {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "auth layer not installed",
            })
        }
    }
}

fn extract_bearer(parts: &Parts) -> Option<&str> {
    parts.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

#[derive(Clone)]
pub struct AuthLayer {
    state: AuthState,
}

impl AuthLayer {
    pub fn new(state: AuthState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware { inner, state: self.state.clone() }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    state: AuthState,
}

impl<S, B> Service<axum::http::Request<B>> for AuthMiddleware<S>
where
    S: Service<axum::http::Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let (parts, body) = req.into_parts();
        let presented = extract_bearer(&parts);
        let ok = presented.map(|t| self.state.accepts(t)).unwrap_or_else(|| self.state.accepts(""));

        if ok {
            let mut parts = parts;
            parts.extensions.insert(Authenticated);
            req = axum::http::Request::from_parts(parts, body);
            let future = self.inner.call(req);
            Box::pin(async move { future.await })
        } else {
            Box::pin(async move {
                Ok(AuthRejection { status: StatusCode::UNAUTHORIZED, message: "missing or invalid bearer token" }
                    .into_response())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_admin_token_accepts_anything() {
        let state = AuthState::new(String::new());
        assert!(state.accepts(""));
        assert!(state.accepts("whatever"));
    }

    #[test]
    fn configured_token_requires_exact_match() {
        let state = AuthState::new("s3cret".to_string());
        assert!(state.accepts("s3cret"));
        assert!(!state.accepts("wrong"));
        assert!(!state.accepts(""));
    }
}
