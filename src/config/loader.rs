//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable selecting the listening port.
pub const PORT_VAR: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file was not valid TOML for the schema.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// `PORT` was set but is not a valid port number.
    #[error("invalid {PORT_VAR} value {0:?}: expected a number between 1 and 65535")]
    Port(String),

    /// The configuration parsed but fails semantic checks.
    #[error("Validation failed: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Validation(Vec<ValidationError>),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Produce the effective configuration: the file at `path` when given,
/// defaults otherwise, with the environment overlaid on top.
pub fn resolve_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    overlay_env(&mut config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides. `PORT` selects the listening port; when
/// absent or empty the configured (default 5000) port stands.
fn overlay_env(config: &mut GatewayConfig) -> Result<(), ConfigError> {
    if let Ok(raw) = std::env::var(PORT_VAR) {
        if raw.is_empty() {
            return Ok(());
        }
        let port = raw.parse::<u16>().map_err(|_| ConfigError::Port(raw))?;
        if port == 0 {
            return Err(ConfigError::Port("0".to_string()));
        }
        config.listener.port = port;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // PORT is process-global state, so the env cases run inside one test to
    // keep them off each other's toes under the parallel test runner.
    #[test]
    fn port_env_overlay() {
        std::env::remove_var(PORT_VAR);
        let config = resolve_config(None).unwrap();
        assert_eq!(config.listener.port, 5000, "absent PORT keeps the default");

        std::env::set_var(PORT_VAR, "8123");
        let config = resolve_config(None).unwrap();
        assert_eq!(config.listener.port, 8123, "PORT overrides the listener");

        std::env::set_var(PORT_VAR, "");
        let config = resolve_config(None).unwrap();
        assert_eq!(config.listener.port, 5000, "empty PORT behaves like absent");

        std::env::set_var(PORT_VAR, "not-a-port");
        let mut config = GatewayConfig::default();
        assert!(matches!(
            overlay_env(&mut config),
            Err(ConfigError::Port(_))
        ));

        std::env::remove_var(PORT_VAR);
    }

    #[test]
    fn file_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        fs::write(&path, "[listener]\nport = 7000\n[rate_limit]\nmax_requests = 5\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.port, 7000);
        assert_eq!(config.rate_limit.max_requests, 5);
    }

    #[test]
    fn invalid_file_surfaces_validation_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        fs::write(&path, "[compression]\nlevel = 99\n").unwrap();

        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }
}
