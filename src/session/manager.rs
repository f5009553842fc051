//! Session table and stream lifecycle.
//!
//! # Responsibilities
//! - Own the table of active sessions and their outbound event queues
//! - Resolve identifier collisions deterministically (configured policy)
//! - Enqueue events FIFO per session; writers never touch the transport
//! - Sweep idle sessions and emit heartbeats in the background
//!
//! # Design Decisions
//! - One bounded mpsc queue per session is the only ordering guarantee
//! - A full or disconnected queue closes that session; others are unaffected
//! - Table mutations are serialized per identifier by the map's entry lock,
//!   so concurrent opens with the same id resolve by policy, not by race

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::{CollisionPolicy, SessionConfig};
use crate::observability::metrics;
use crate::session::event::OutboundEvent;

/// Pushing to or opening a session can fail without being fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The identifier already has an active stream (reject policy).
    #[error("session {0} already has an active stream")]
    Collision(String),
    /// The session is closed or was never opened.
    #[error("session {0} is gone")]
    Gone(String),
}

/// A logical client conversation layered over the transport.
pub struct Session {
    pub id: String,
    created_at: Instant,
    last_activity: Mutex<Instant>,
    tx: mpsc::Sender<OutboundEvent>,
    closed: AtomicBool,
}

impl Session {
    fn new(id: String, tx: mpsc::Sender<OutboundEvent>) -> Self {
        let now = Instant::now();
        Self {
            id,
            created_at: now,
            last_activity: Mutex::new(now),
            tx,
            closed: AtomicBool::new(false),
        }
    }

    fn touch(&self) {
        if let Ok(mut at) = self.last_activity.lock() {
            *at = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .map(|at| at.elapsed())
            .unwrap_or_default()
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Result of opening a session: the identifier plus the queue end the
/// transport adapter turns into the event stream.
#[derive(Debug)]
pub struct OpenedSession {
    pub session_id: String,
    pub events: mpsc::Receiver<OutboundEvent>,
}

/// Owns every session's lifecycle and outbound queue.
pub struct SessionManager {
    sessions: DashMap<String, Arc<Session>>,
    config: SessionConfig,
    message_path: String,
}

impl SessionManager {
    pub fn new(config: SessionConfig, message_path: String) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
            message_path,
        }
    }

    /// Open a session, generating an identifier when none is supplied.
    ///
    /// The first event on the returned queue is always the connection ack
    /// carrying the identifier, so the client can correlate its posts.
    pub fn open(&self, session_id: Option<String>) -> Result<OpenedSession, SessionError> {
        let id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let session = Arc::new(Session::new(id.clone(), tx.clone()));

        match self.sessions.entry(id.clone()) {
            Entry::Occupied(mut occupied) => match self.config.collision_policy {
                CollisionPolicy::Reject => {
                    tracing::warn!(session_id = %id, "rejected stream open for active session");
                    return Err(SessionError::Collision(id));
                }
                CollisionPolicy::Supersede => {
                    let old = occupied.insert(session);
                    old.mark_closed();
                    tracing::info!(session_id = %id, "superseded existing stream");
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(session);
            }
        }

        let ack = OutboundEvent::ConnectionAck {
            session_id: id.clone(),
            message_path: format!("{}?session_id={}", self.message_path, id),
        };
        // Fresh queue with capacity >= 1; the ack cannot be rejected.
        let _ = tx.try_send(ack);

        metrics::record_session_opened();
        tracing::debug!(session_id = %id, active = self.active_count(), "session opened");

        Ok(OpenedSession {
            session_id: id,
            events: rx,
        })
    }

    /// Enqueue an event for FIFO delivery on a session's stream.
    ///
    /// Unknown or closed sessions report `Gone` to the caller; a queue that
    /// is full or whose stream went away closes that one session.
    pub fn push(&self, session_id: &str, event: OutboundEvent) -> Result<(), SessionError> {
        let session = match self.sessions.get(session_id) {
            Some(entry) => Arc::clone(entry.value()),
            None => return Err(SessionError::Gone(session_id.to_string())),
        };
        if session.is_closed() {
            return Err(SessionError::Gone(session_id.to_string()));
        }
        self.push_to(&session, event)
    }

    /// Enqueue on a specific session instance; a failed write closes that
    /// instance only.
    fn push_to(&self, session: &Arc<Session>, event: OutboundEvent) -> Result<(), SessionError> {
        match session.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(e) => {
                metrics::record_event_dropped();
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "queue full",
                    mpsc::error::TrySendError::Closed(_) => "stream gone",
                };
                tracing::warn!(
                    session_id = %session.id,
                    reason,
                    "closing session after stream-write failure"
                );
                self.close_instance(session);
                Err(SessionError::Gone(session.id.clone()))
            }
        }
    }

    /// Remove a session only while the table still holds this exact
    /// instance. A writer that looked the session up before a supersede
    /// holds a stale `Arc`; its failure must never remove the successor
    /// that reused the identifier.
    fn close_instance(&self, session: &Arc<Session>) {
        session.mark_closed();
        if self
            .sessions
            .remove_if(&session.id, |_, current| Arc::ptr_eq(current, session))
            .is_some()
        {
            metrics::record_session_closed();
            tracing::debug!(session_id = %session.id, age = ?session.age(), "session closed");
        }
    }

    /// Refresh a session's last-activity time (inbound message seen).
    pub fn touch(&self, session_id: &str) -> Result<(), SessionError> {
        match self.sessions.get(session_id) {
            Some(entry) => {
                entry.value().touch();
                Ok(())
            }
            None => Err(SessionError::Gone(session_id.to_string())),
        }
    }

    /// Terminate a session. Safe to call more than once.
    pub fn close(&self, session_id: &str) {
        if let Some((_, session)) = self.sessions.remove(session_id) {
            session.mark_closed();
            metrics::record_session_closed();
            tracing::debug!(session_id = %session.id, age = ?session.age(), "session closed");
        }
    }

    /// Whether a session is currently open.
    pub fn is_active(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .map(|s| !s.is_closed())
            .unwrap_or(false)
    }

    /// Number of open sessions.
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Close every session (graceful shutdown drain).
    pub fn close_all(&self) {
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.close(&id);
        }
    }

    /// Periodic sweep: close idle sessions, heartbeat the rest.
    ///
    /// A successful heartbeat counts as activity, so a connected but quiet
    /// client stays alive; a client whose stream is gone fails the push and
    /// is cleaned up.
    pub async fn run_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let idle_timeout = Duration::from_secs(self.config.idle_timeout_secs);
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.heartbeat_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            idle_timeout_secs = self.config.idle_timeout_secs,
            heartbeat_secs = self.config.heartbeat_secs,
            "session sweeper starting"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once(idle_timeout);
                }
                _ = shutdown.recv() => {
                    tracing::info!("session sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One sweep pass, separated out for tests.
    pub fn sweep_once(&self, idle_timeout: Duration) {
        // Snapshot instances first: removal mutates the map and must not
        // run under the map's shard locks. Operating on instances (not ids)
        // means a session superseded mid-sweep is never mistaken for its
        // successor under the same identifier.
        let snapshot: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();

        for session in snapshot {
            if session.is_closed() {
                continue;
            }
            let idle = session.idle_for();
            if idle > idle_timeout {
                // Successful heartbeats below refresh activity, so a live
                // receiver normally never ages past the threshold; this
                // branch fires when delivery has stalled without failing
                // outright. Dead streams exit via the failed push.
                tracing::info!(session_id = %session.id, idle = ?idle, "closing idle session");
                self.close_instance(&session);
            } else if self.push_to(&session, OutboundEvent::Heartbeat).is_ok() {
                session.touch();
            }
        }
    }
}
