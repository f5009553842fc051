//! Transport-normalizing streaming-session gateway.
//!
//! Fronts a long-lived RPC service exposed as a server-to-client SSE stream
//! plus client-to-server message posts, and adapts it to run behind an
//! opaque reverse proxy that rewrites `Host`, terminates TLS, and sends
//! requests with unexpected methods or paths.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rpc;
pub mod session;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use rpc::{OperationError, OperationRegistry};
