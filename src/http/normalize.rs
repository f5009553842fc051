//! Request normalization middleware.
//!
//! # Responsibilities
//! - Make inbound requests pass transport-level validation despite identity
//!   headers (`host`, `origin`, `referer`) mutated by the fronting proxy
//! - Apply exactly one configured strategy: rewrite to the known public
//!   domain, or strip the identity headers entirely
//!
//! # Design Decisions
//! - Runs as the outermost layer, before routing and any validation
//! - Touches only the identity headers; method, path, and body untouched
//! - Idempotent: reapplying to a normalized request changes nothing

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{HeaderMap, HeaderValue, HOST, ORIGIN, REFERER},
        Request, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::{NormalizeStrategy, ProxyCompatConfig};

/// Process-wide header rewrite policy, fixed at startup.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    strategy: NormalizeStrategy,
    public_domain: String,
}

/// The configured domain cannot be expressed as a header value.
///
/// Config validation rejects such domains at startup, so this is only
/// reachable with a hand-built policy.
#[derive(Debug, thiserror::Error)]
#[error("public domain {0:?} is not a valid header value")]
pub struct NormalizeError(String);

impl HeaderPolicy {
    pub fn from_config(proxy: &ProxyCompatConfig) -> Self {
        Self {
            strategy: proxy.strategy,
            public_domain: proxy.public_domain.clone(),
        }
    }

    /// Rewrite or strip the identity headers in place.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), NormalizeError> {
        match self.strategy {
            NormalizeStrategy::Rewrite => {
                let host = HeaderValue::from_str(&self.public_domain)
                    .map_err(|_| NormalizeError(self.public_domain.clone()))?;
                let origin = HeaderValue::from_str(&format!("https://{}", self.public_domain))
                    .map_err(|_| NormalizeError(self.public_domain.clone()))?;

                // insert() drops any extra values a multi-valued header had.
                headers.insert(HOST, host);
                if headers.contains_key(ORIGIN) {
                    headers.insert(ORIGIN, origin);
                }
                headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
            }
            NormalizeStrategy::Strip => {
                headers.remove(HOST);
                headers.remove(ORIGIN);
                headers.remove(REFERER);
            }
        }
        Ok(())
    }
}

/// Axum middleware wrapping [`HeaderPolicy::apply`].
pub async fn normalize_middleware(
    State(policy): State<Arc<HeaderPolicy>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Err(e) = policy.apply(req.headers_mut()) {
        tracing::warn!(error = %e, "request normalization failed");
        return (StatusCode::BAD_REQUEST, "unacceptable identity headers").into_response();
    }
    next.run(req).await
}
