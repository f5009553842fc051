//! Method/path reconciliation middleware.
//!
//! # Responsibilities
//! - Map known non-conformant client requests (wrong verb or path) onto the
//!   canonical message-submission route
//! - Pass everything else through untouched
//!
//! # Design Decisions
//! - The mapping is a static table built at startup, not inferred; add
//!   entries as new client quirks are discovered
//! - Only the path is rewritten; method, query string, and body survive
//! - Unmapped combinations fall through to standard 404/405 handling

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{uri::PathAndQuery, Method, Request, Uri},
    middleware::Next,
    response::Response,
};

use crate::config::PathsConfig;

/// Static table of `(method, path) → canonical path` corrections.
#[derive(Debug, Clone)]
pub struct ReconcileTable {
    entries: Vec<(Method, String, String)>,
}

impl ReconcileTable {
    /// Build the table for the configured routes.
    ///
    /// Known quirk: some clients POST their messages to the stream path
    /// (with or without a trailing slash) instead of the message path.
    pub fn from_paths(paths: &PathsConfig) -> Self {
        let entries = vec![
            (
                Method::POST,
                paths.stream_path.clone(),
                paths.message_path.clone(),
            ),
            (
                Method::POST,
                format!("{}/", paths.stream_path.trim_end_matches('/')),
                paths.message_path.clone(),
            ),
        ];
        Self { entries }
    }

    /// Canonical path for a non-conformant `(method, path)`, if mapped.
    pub fn reconcile(&self, method: &Method, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(m, p, _)| m == method && p == path)
            .map(|(_, _, canonical)| canonical.as_str())
    }
}

/// Rebuild a URI with the path swapped and the query preserved.
fn with_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => PathAndQuery::try_from(format!("{}?{}", path, query)).ok()?,
        None => PathAndQuery::try_from(path).ok()?,
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts).ok()
}

/// Axum middleware applying the reconcile table before routing.
pub async fn reconcile_middleware(
    State(table): State<Arc<ReconcileTable>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(canonical) = table.reconcile(req.method(), req.uri().path()) {
        if let Some(uri) = with_path(req.uri(), canonical) {
            tracing::debug!(
                method = %req.method(),
                from = %req.uri().path(),
                to = %canonical,
                "reconciled non-conformant request"
            );
            *req.uri_mut() = uri;
        }
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ReconcileTable {
        ReconcileTable::from_paths(&PathsConfig::default())
    }

    #[test]
    fn post_to_stream_path_maps_to_message_path() {
        let t = table();
        assert_eq!(t.reconcile(&Method::POST, "/sse"), Some("/messages"));
        assert_eq!(t.reconcile(&Method::POST, "/sse/"), Some("/messages"));
    }

    #[test]
    fn conformant_requests_pass_through() {
        let t = table();
        assert_eq!(t.reconcile(&Method::GET, "/sse"), None);
        assert_eq!(t.reconcile(&Method::POST, "/messages"), None);
        assert_eq!(t.reconcile(&Method::GET, "/health"), None);
    }

    #[test]
    fn unmapped_combinations_are_untouched() {
        let t = table();
        assert_eq!(t.reconcile(&Method::DELETE, "/sse"), None);
        assert_eq!(t.reconcile(&Method::POST, "/unknown"), None);
    }

    #[test]
    fn uri_rewrite_preserves_query() {
        let uri: Uri = "/sse?session_id=abc".parse().unwrap();
        let rewritten = with_path(&uri, "/messages").unwrap();
        assert_eq!(rewritten.path(), "/messages");
        assert_eq!(rewritten.query(), Some("session_id=abc"));
    }

    #[test]
    fn uri_rewrite_without_query() {
        let uri: Uri = "/sse".parse().unwrap();
        let rewritten = with_path(&uri, "/messages").unwrap();
        assert_eq!(rewritten.path(), "/messages");
        assert_eq!(rewritten.query(), None);
    }
}
