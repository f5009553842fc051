//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the rewrite strategy has a usable public domain
//! - Validate value ranges (timeouts > 0, buffer > 0)
//! - Detect conflicting endpoint paths
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{GatewayConfig, NormalizeStrategy};

/// A single semantic configuration error.
#[derive(Debug)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., "proxy.public_domain").
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field,
        message: message.into(),
    }
}

/// Whether a domain string can be used verbatim as a `host` header value.
fn is_valid_header_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b':'))
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(err(
            "listener.bind_address",
            format!("not a valid socket address: {:?}", config.listener.bind_address),
        ));
    }

    if config.proxy.strategy == NormalizeStrategy::Rewrite
        && !is_valid_header_domain(&config.proxy.public_domain)
    {
        errors.push(err(
            "proxy.public_domain",
            "rewrite strategy requires a non-empty domain usable as a host header",
        ));
    }

    for (field, path) in [
        ("paths.stream_path", &config.paths.stream_path),
        ("paths.message_path", &config.paths.message_path),
        ("paths.health_path", &config.paths.health_path),
    ] {
        if !path.starts_with('/') {
            errors.push(err(field, format!("must start with '/': {:?}", path)));
        }
    }
    if config.paths.stream_path == config.paths.message_path {
        errors.push(err(
            "paths.message_path",
            "stream and message paths must be distinct",
        ));
    }

    if config.session.idle_timeout_secs == 0 {
        errors.push(err("session.idle_timeout_secs", "must be greater than zero"));
    }
    if config.session.heartbeat_secs == 0 {
        errors.push(err("session.heartbeat_secs", "must be greater than zero"));
    }
    if config.session.event_buffer == 0 {
        errors.push(err("session.event_buffer", "must be greater than zero"));
    }
    if config.timeouts.message_request_secs == 0 {
        errors.push(err("timeouts.message_request_secs", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::GatewayConfig;

    fn valid_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.proxy.public_domain = "gateway.example.com".to_string();
        config
    }

    #[test]
    fn default_with_domain_is_valid() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn rewrite_requires_public_domain() {
        let mut config = valid_config();
        config.proxy.public_domain = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "proxy.public_domain"));
    }

    #[test]
    fn strip_allows_empty_domain() {
        let mut config = valid_config();
        config.proxy.strategy = NormalizeStrategy::Strip;
        config.proxy.public_domain = String::new();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_domain_with_header_invalid_bytes() {
        let mut config = valid_config();
        config.proxy.public_domain = "bad domain\r\n".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = valid_config();
        config.listener.bind_address = "not-an-addr".to_string();
        config.session.idle_timeout_secs = 0;
        config.paths.message_path = config.paths.stream_path.clone();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }

    #[test]
    fn paths_must_start_with_slash() {
        let mut config = valid_config();
        config.paths.health_path = "health".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "paths.health_path"));
    }
}
