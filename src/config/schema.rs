//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Service identity (name reported by the liveness endpoint).
    pub gateway: ServiceConfig,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Proxy-compatibility settings (identity header normalization).
    pub proxy: ProxyCompatConfig,

    /// Route paths for the stream, message, and health endpoints.
    pub paths: PathsConfig,

    /// Session lifecycle settings.
    pub session: SessionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Human-readable service name.
    pub service_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "canvas-gateway".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How identity headers mutated by the fronting proxy are normalized
/// before any downstream validation sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeStrategy {
    /// Replace `host`/`origin` with the known public domain and force the
    /// secure scheme.
    Rewrite,
    /// Remove `host`/`origin`/`referer` entirely.
    Strip,
}

/// Proxy-compatibility configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyCompatConfig {
    /// Normalization strategy applied to every inbound connection.
    pub strategy: NormalizeStrategy,

    /// Public-facing domain the platform serves this gateway under
    /// (e.g., "gateway.example.com"). Required for the rewrite strategy.
    pub public_domain: String,
}

impl Default for ProxyCompatConfig {
    fn default() -> Self {
        Self {
            strategy: NormalizeStrategy::Rewrite,
            public_domain: String::new(),
        }
    }
}

/// Route path configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Path clients GET to open the event stream.
    pub stream_path: String,

    /// Path clients POST messages to.
    pub message_path: String,

    /// Liveness probe path.
    pub health_path: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            stream_path: "/sse".to_string(),
            message_path: "/messages".to_string(),
            health_path: "/health".to_string(),
        }
    }
}

/// Policy for a stream open that reuses an identifier with an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Refuse the new stream; the client must retry with a fresh identifier.
    Reject,
    /// Close the existing stream and adopt the new one (last writer wins).
    Supersede,
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds without activity before a session is closed by the sweep.
    pub idle_timeout_secs: u64,

    /// Interval in seconds between heartbeat events / idle sweeps.
    pub heartbeat_secs: u64,

    /// What to do when a stream open collides with an active session id.
    pub collision_policy: CollisionPolicy,

    /// Bounded per-session outbound event queue depth.
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            heartbeat_secs: 30,
            collision_policy: CollisionPolicy::Supersede,
            event_buffer: 64,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for handling a posted message request, in seconds.
    pub message_request_secs: u64,

    /// Grace period for draining sessions on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            message_request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum posted message body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
