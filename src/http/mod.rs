//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! Proxied connection
//!     → normalize.rs (fix identity headers per configured strategy)
//!     → reconcile.rs (map non-conformant verb/path onto canonical route)
//!     → server.rs (route: open stream | submit message | liveness)
//!     → session / rpc subsystems
//! ```
//!
//! # Design Decisions
//! - Normalization runs before anything that could validate headers
//! - Malformed input degrades that one connection or session, never the
//!   process

pub mod normalize;
pub mod reconcile;
pub mod server;

pub use normalize::HeaderPolicy;
pub use reconcile::ReconcileTable;
pub use server::{AppState, GatewayServer};
