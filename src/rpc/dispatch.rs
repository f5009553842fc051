//! Dispatcher bridge between posted bytes and the operation registry.
//!
//! # Responsibilities
//! - Decode posted bytes into a message envelope
//! - Look up and invoke the named operation (at most once, no retries)
//! - Frame the outcome as a result or error event on the session's stream
//!
//! # Design Decisions
//! - `handle` never returns an error: every failure becomes an error event
//!   or, when the session is gone, a log line
//! - Notifications (no id) run the operation but produce no reply event
//! - Operations may have side effects against the external LMS, so a
//!   failed call is reported, never re-run

use std::sync::Arc;

use crate::observability::metrics;
use crate::rpc::envelope::InboundMessage;
use crate::rpc::registry::{OperationError, OperationRegistry};
use crate::session::event::OutboundEvent;
use crate::session::manager::SessionManager;

/// Converts inbound messages into registry calls and frames the outcomes.
pub struct Dispatcher {
    registry: Arc<OperationRegistry>,
    sessions: Arc<SessionManager>,
}

impl Dispatcher {
    pub fn new(registry: Arc<OperationRegistry>, sessions: Arc<SessionManager>) -> Self {
        Self { registry, sessions }
    }

    /// Handle one posted message for a session.
    ///
    /// All outcomes travel on the session's stream; pushing to a session
    /// that went away mid-flight is reported to the log and dropped.
    pub async fn handle(&self, session_id: &str, raw: &[u8]) {
        let message = match InboundMessage::decode(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "message failed to parse");
                metrics::record_rpc("parse_error");
                self.push_event(
                    session_id,
                    OutboundEvent::Error {
                        id: None,
                        error: OperationError::new("parse_error", format!("invalid message envelope: {}", e)),
                    },
                );
                return;
            }
        };

        let _ = self.sessions.touch(session_id);

        let operation = match self.registry.get(&message.operation) {
            Some(operation) => operation,
            None => {
                tracing::debug!(
                    session_id = %session_id,
                    operation = %message.operation,
                    "unknown operation"
                );
                metrics::record_rpc("unknown_operation");
                if !message.is_notification() {
                    self.push_event(
                        session_id,
                        OutboundEvent::Error {
                            id: message.id,
                            error: OperationError::new(
                                "unknown_operation",
                                format!("no operation named {:?}", message.operation),
                            ),
                        },
                    );
                }
                return;
            }
        };

        // At-most-once: the call happens exactly here, outcome or not.
        let outcome = operation.call(message.parameters).await;
        metrics::record_rpc(if outcome.is_ok() { "ok" } else { "failed" });

        let id = match message.id {
            Some(id) => id,
            None => {
                // Notification: no reply event is expected or sent.
                if let Err(e) = outcome {
                    tracing::debug!(
                        session_id = %session_id,
                        operation = %message.operation,
                        error = %e,
                        "notification operation failed"
                    );
                }
                return;
            }
        };

        let event = match outcome {
            Ok(payload) => OutboundEvent::Result { id, payload },
            Err(error) => OutboundEvent::Error { id: Some(id), error },
        };
        self.push_event(session_id, event);
    }

    fn push_event(&self, session_id: &str, event: OutboundEvent) {
        if let Err(e) = self.sessions.push(session_id, event) {
            tracing::debug!(session_id = %session_id, error = %e, "dropping event for gone session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::rpc::envelope::MessageId;
    use serde_json::json;

    fn setup(registry: OperationRegistry) -> (Dispatcher, Arc<SessionManager>) {
        let sessions = Arc::new(SessionManager::new(
            SessionConfig::default(),
            "/messages".to_string(),
        ));
        let dispatcher = Dispatcher::new(Arc::new(registry), Arc::clone(&sessions));
        (dispatcher, sessions)
    }

    fn course_registry() -> OperationRegistry {
        let mut registry = OperationRegistry::new();
        registry.register_fn("listCourses", |_| async { Ok(json!({"courses": []})) });
        registry.register_fn("failCourse", |_| async {
            Err(OperationError::new("lms_error", "course 9 not found"))
        });
        registry
    }

    #[tokio::test]
    async fn success_yields_one_result_event() {
        let (dispatcher, sessions) = setup(course_registry());
        let mut opened = sessions.open(Some("s1".into())).unwrap();
        let _ack = opened.events.recv().await.unwrap();

        dispatcher
            .handle("s1", br#"{"id":"1","operation":"listCourses","parameters":{}}"#)
            .await;

        match opened.events.recv().await.unwrap() {
            OutboundEvent::Result { id, payload } => {
                assert_eq!(id, MessageId::String("1".into()));
                assert_eq!(payload, json!({"courses": []}));
            }
            other => panic!("expected result, got {:?}", other),
        }
        assert!(opened.events.try_recv().is_err(), "exactly one event expected");
    }

    #[tokio::test]
    async fn unknown_operation_yields_one_error_with_id() {
        let (dispatcher, sessions) = setup(course_registry());
        let mut opened = sessions.open(Some("s1".into())).unwrap();
        let _ack = opened.events.recv().await.unwrap();

        dispatcher
            .handle("s1", br#"{"id":"7","operation":"noSuchOp","parameters":{}}"#)
            .await;

        match opened.events.recv().await.unwrap() {
            OutboundEvent::Error { id, error } => {
                assert_eq!(id, Some(MessageId::String("7".into())));
                assert_eq!(error.kind, "unknown_operation");
            }
            other => panic!("expected error, got {:?}", other),
        }
        assert!(opened.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_bytes_yield_error_without_id() {
        let (dispatcher, sessions) = setup(course_registry());
        let mut opened = sessions.open(Some("s1".into())).unwrap();
        let _ack = opened.events.recv().await.unwrap();

        dispatcher.handle("s1", b"{{{ nope").await;

        match opened.events.recv().await.unwrap() {
            OutboundEvent::Error { id, error } => {
                assert_eq!(id, None);
                assert_eq!(error.kind, "parse_error");
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn domain_failure_is_forwarded_unmodified() {
        let (dispatcher, sessions) = setup(course_registry());
        let mut opened = sessions.open(Some("s1".into())).unwrap();
        let _ack = opened.events.recv().await.unwrap();

        dispatcher
            .handle("s1", br#"{"id":2,"operation":"failCourse","parameters":{"course":9}}"#)
            .await;

        match opened.events.recv().await.unwrap() {
            OutboundEvent::Error { id, error } => {
                assert_eq!(id, Some(MessageId::Number(2)));
                assert_eq!(error.kind, "lms_error");
                assert_eq!(error.message, "course 9 not found");
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn notification_produces_no_reply_event() {
        let (dispatcher, sessions) = setup(course_registry());
        let mut opened = sessions.open(Some("s1".into())).unwrap();
        let _ack = opened.events.recv().await.unwrap();

        dispatcher
            .handle("s1", br#"{"operation":"listCourses","parameters":{}}"#)
            .await;
        dispatcher
            .handle("s1", br#"{"operation":"failCourse","parameters":{}}"#)
            .await;

        assert!(opened.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn gone_session_does_not_raise() {
        let (dispatcher, _sessions) = setup(course_registry());
        // No session opened; handle must absorb the miss.
        dispatcher
            .handle("ghost", br#"{"id":"1","operation":"listCourses"}"#)
            .await;
    }
}
