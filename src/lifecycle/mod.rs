//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build gateway → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain sessions → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast at startup: a bad config never serves traffic
//! - Shutdown drain is bounded by a grace period; after that, remaining
//!   connections are dropped

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
