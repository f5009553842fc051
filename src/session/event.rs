//! Outbound event framing.
//!
//! Each event is one discrete, independently-parseable SSE frame: the frame's
//! `event:` field carries the kind tag, `data:` the JSON payload. Events are
//! immutable after creation; ordering is whatever the session queue delivers.

use axum::response::sse;
use serde_json::json;

use crate::rpc::envelope::MessageId;
use crate::rpc::registry::OperationError;

/// A unit pushed down a session's stream.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// Session established; carries the identifier the client must use to
    /// correlate subsequent posted messages, and where to post them.
    ConnectionAck {
        session_id: String,
        message_path: String,
    },
    /// Successful operation result.
    Result {
        id: MessageId,
        payload: serde_json::Value,
    },
    /// Parse, lookup, or domain failure; `id` is absent when the failing
    /// bytes never decoded into an envelope.
    Error {
        id: Option<MessageId>,
        error: OperationError,
    },
    /// Keep-alive with no payload semantics.
    Heartbeat,
}

impl OutboundEvent {
    /// Event kind tag used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEvent::ConnectionAck { .. } => "connection-ack",
            OutboundEvent::Result { .. } => "result",
            OutboundEvent::Error { .. } => "error",
            OutboundEvent::Heartbeat => "heartbeat",
        }
    }

    /// JSON payload carried in the frame's data field.
    pub fn payload_json(&self) -> serde_json::Value {
        match self {
            OutboundEvent::ConnectionAck {
                session_id,
                message_path,
            } => json!({
                "session_id": session_id,
                "message_path": message_path,
            }),
            OutboundEvent::Result { id, payload } => json!({
                "id": id,
                "payload": payload,
            }),
            OutboundEvent::Error { id, error } => match id {
                Some(id) => json!({ "id": id, "error": error }),
                None => json!({ "error": error }),
            },
            OutboundEvent::Heartbeat => json!({}),
        }
    }

    /// Encode as an SSE frame.
    pub fn into_sse(self) -> sse::Event {
        let data = self.payload_json().to_string();
        sse::Event::default().event(self.kind()).data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_carries_session_id_and_message_path() {
        let event = OutboundEvent::ConnectionAck {
            session_id: "abc".into(),
            message_path: "/messages?session_id=abc".into(),
        };
        assert_eq!(event.kind(), "connection-ack");
        let payload = event.payload_json();
        assert_eq!(payload["session_id"], "abc");
        assert_eq!(payload["message_path"], "/messages?session_id=abc");
    }

    #[test]
    fn result_round_trips_string_id() {
        let event = OutboundEvent::Result {
            id: MessageId::String("1".into()),
            payload: json!({"courses": []}),
        };
        let payload = event.payload_json();
        assert_eq!(payload["id"], "1");
        assert_eq!(payload["payload"]["courses"], json!([]));
    }

    #[test]
    fn error_without_id_omits_the_field() {
        let event = OutboundEvent::Error {
            id: None,
            error: OperationError::new("parse_error", "invalid envelope"),
        };
        let payload = event.payload_json();
        assert!(payload.get("id").is_none());
        assert_eq!(payload["error"]["kind"], "parse_error");
    }

    #[test]
    fn error_with_numeric_id_preserves_it() {
        let event = OutboundEvent::Error {
            id: Some(MessageId::Number(42)),
            error: OperationError::new("unknown_operation", "no such operation"),
        };
        assert_eq!(event.payload_json()["id"], 42);
    }

    #[test]
    fn heartbeat_has_empty_payload() {
        assert_eq!(OutboundEvent::Heartbeat.kind(), "heartbeat");
        assert_eq!(OutboundEvent::Heartbeat.payload_json(), json!({}));
    }
}
