//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: GatewayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{CollisionPolicy, NormalizeStrategy};

    #[test]
    fn parses_minimal_toml() {
        let toml = r#"
            [proxy]
            strategy = "strip"

            [session]
            collision_policy = "reject"
            idle_timeout_secs = 60
        "#;
        let config: GatewayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.proxy.strategy, NormalizeStrategy::Strip);
        assert_eq!(config.session.collision_policy, CollisionPolicy::Reject);
        assert_eq!(config.session.idle_timeout_secs, 60);
        // Untouched sections keep their defaults.
        assert_eq!(config.paths.stream_path, "/sse");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn rejects_unknown_strategy() {
        let toml = r#"
            [proxy]
            strategy = "passthrough"
        "#;
        assert!(toml::from_str::<GatewayConfig>(toml).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_config(Path::new("/nonexistent/gateway.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
