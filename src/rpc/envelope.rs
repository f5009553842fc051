//! Inbound message envelope.
//!
//! # Responsibilities
//! - Define the wire shape of a posted message
//! - Decode raw bytes into a typed envelope
//! - Distinguish requests (with id) from fire-and-forget notifications
//!
//! # Design Decisions
//! - Invalid bytes never become a message; decoding failure is reported
//!   to the dispatcher, which folds it into an error event
//! - Message ids may be strings or integers (clients differ); preserved
//!   verbatim in result/error events for correlation

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlation identifier supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(i64),
    String(String),
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageId::Number(n) => write!(f, "{}", n),
            MessageId::String(s) => write!(f, "{}", s),
        }
    }
}

/// A decoded client message, correlated to a session by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Absent for notifications: no result or error event is expected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,

    /// Name of the operation to invoke.
    pub operation: String,

    /// Operation parameters; schema is owned by the operation itself.
    #[serde(default)]
    pub parameters: Value,
}

impl InboundMessage {
    /// Decode a posted body into an envelope.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// True when the client expects no reply.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}
