//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Create Axum Router with the stream, message, and health routes
//! - Wire up middleware (normalize, reconcile, request ID, trace, limits)
//! - Open event streams and hand posted messages to the dispatcher
//! - Serve with graceful shutdown and a bounded session drain

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, Request, State},
    http::{header::HeaderMap, StatusCode},
    middleware,
    response::{sse::Sse, IntoResponse, Response},
    routing::{get, post},
    Json, Router, ServiceExt,
};
use axum::body::Bytes;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_stream::wrappers::ReceiverStream;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::normalize::{normalize_middleware, HeaderPolicy};
use crate::http::reconcile::{reconcile_middleware, ReconcileTable};
use crate::lifecycle::Shutdown;
use crate::rpc::{Dispatcher, OperationRegistry};
use crate::session::{SessionError, SessionManager};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub dispatcher: Arc<Dispatcher>,
    pub service_name: String,
}

/// HTTP server fronting the session gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    sessions: Arc<SessionManager>,
}

impl GatewayServer {
    /// Construct the gateway from its configuration and the full operation
    /// registry. No ambient globals: everything the handlers need lives in
    /// the state they are given.
    pub fn new(config: GatewayConfig, registry: OperationRegistry) -> Self {
        let sessions = Arc::new(SessionManager::new(
            config.session.clone(),
            config.paths.message_path.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(registry),
            Arc::clone(&sessions),
        ));

        let state = AppState {
            sessions: Arc::clone(&sessions),
            dispatcher,
            service_name: config.gateway.service_name.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            sessions,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.message_request_secs,
            )));

        // The body-limit layer sits innermost in its own `layer` call so the
        // router coerces its response body back to `Body` before the timeout
        // layer sees it; the nesting order is unchanged.
        Router::new()
            .route(&config.paths.stream_path, get(stream_handler))
            .route(&config.paths.message_path, post(message_handler))
            .route(&config.paths.health_path, get(health_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(layers)
    }

    /// Run the server until the shutdown coordinator fires, then drain
    /// sessions within the configured grace period.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "gateway starting");

        tokio::spawn(Arc::clone(&self.sessions).run_sweeper(shutdown.subscribe()));

        let mut serve_rx = shutdown.subscribe();
        // Normalization must see the request before reconciliation, and both
        // must run before routing, so these wrap the router rather than
        // living inside it. ServiceBuilder order: first layer listed runs
        // first.
        let policy = Arc::new(HeaderPolicy::from_config(&self.config.proxy));
        let table = Arc::new(ReconcileTable::from_paths(&self.config.paths));
        let app = ServiceBuilder::new()
            .layer(middleware::from_fn_with_state(policy, normalize_middleware))
            .layer(middleware::from_fn_with_state(table, reconcile_middleware))
            .service(self.router.clone());
        let serve = async move {
            axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
                .with_graceful_shutdown(async move {
                    let _ = serve_rx.recv().await;
                })
                .await
        };

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let sessions = Arc::clone(&self.sessions);
        let mut drain_rx = shutdown.subscribe();

        tokio::select! {
            result = serve => result?,
            _ = async {
                let _ = drain_rx.recv().await;
                // Closing every session ends the open streams, which lets the
                // graceful-shutdown branch finish; the sleep bounds the wait.
                sessions.close_all();
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(grace = ?grace, "shutdown grace period elapsed with connections still open");
            }
        }

        self.sessions.close_all();
        tracing::info!("gateway stopped");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    session_id: Option<String>,
}

/// `GET <stream_path>`: open (or supersede per policy) a session and return
/// its event stream.
async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Response {
    match state.sessions.open(query.session_id) {
        Ok(opened) => {
            tracing::info!(session_id = %opened.session_id, "event stream opened");
            let stream = ReceiverStream::new(opened.events)
                .map(|event| Ok::<_, Infallible>(event.into_sse()));
            Sse::new(stream).into_response()
        }
        Err(SessionError::Collision(id)) => {
            tracing::warn!(session_id = %id, "stream open rejected: id collision");
            (
                StatusCode::CONFLICT,
                "session id already has an active stream",
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "stream open failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "stream open failed").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

/// `POST <message_path>`: submit one message for an existing session.
///
/// The session id travels in the query string or the `x-session-id` header.
/// The outcome travels on the session's stream; the POST itself only
/// acknowledges receipt.
async fn message_handler(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = query.session_id.or_else(|| {
        headers
            .get("x-session-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    });

    let session_id = match session_id {
        Some(id) => id,
        None => {
            return (StatusCode::BAD_REQUEST, "missing session_id").into_response();
        }
    };

    if !state.sessions.is_active(&session_id) {
        tracing::debug!(session_id = %session_id, "message for unknown session");
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    }

    // Dispatch on its own task: a slow operation must not hold the POST
    // open, and no session's handling blocks another's.
    let dispatcher = Arc::clone(&state.dispatcher);
    tokio::spawn(async move {
        dispatcher.handle(&session_id, &body).await;
    });

    (StatusCode::ACCEPTED, "Accepted").into_response()
}

/// `GET <health_path>`: stateless liveness probe.
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": state.service_name,
    }))
}
