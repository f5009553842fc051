//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no runtime reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The PORT environment variable overrides the configured port at the
//!   binary's edge (platform deployments inject it); the library never
//!   reads the environment itself

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CollisionPolicy, GatewayConfig, ListenerConfig, NormalizeStrategy, PathsConfig,
    ProxyCompatConfig, SessionConfig,
};
