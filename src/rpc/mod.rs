//! RPC subsystem.
//!
//! # Data Flow
//! ```text
//! POST <message_path> body
//!     → envelope.rs (decode { id?, operation, parameters })
//!     → registry.rs (name → callable lookup)
//!     → dispatch.rs (invoke once, frame outcome)
//!     → session queue (result | error event)
//! ```
//!
//! # Design Decisions
//! - The registry is supplied in full at startup and read-only afterwards
//! - Dispatch never raises out of `handle`; failures become error events
//! - No automatic retry: operations may have side effects downstream

pub mod dispatch;
pub mod envelope;
pub mod registry;

pub use dispatch::Dispatcher;
pub use envelope::{InboundMessage, MessageId};
pub use registry::{Operation, OperationError, OperationRegistry};
