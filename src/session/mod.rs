//! Session streaming subsystem.
//!
//! # Data Flow
//! ```text
//! GET <stream_path>
//!     → manager.rs open() (collision policy, ack enqueued)
//!     → per-session bounded queue
//!     → http layer drains queue as the SSE response
//!
//! Writers (dispatcher, sweeper):
//!     push(session_id, event) → queue (FIFO) → stream
//!
//! Background:
//!     sweeper closes idle sessions, heartbeats the rest
//! ```
//!
//! # Design Decisions
//! - At most one active stream per identifier; collisions resolve by policy
//! - Writers only enqueue; queue order is the sole ordering guarantee
//! - A failing session is closed and cleaned up, never fatal to the process

pub mod event;
pub mod manager;

pub use event::OutboundEvent;
pub use manager::{OpenedSession, SessionError, SessionManager};
