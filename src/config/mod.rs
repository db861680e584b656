//! Configuration management

use secrecy::SecretString;
use std::{str::FromStr, time::Duration};
use thiserror::Error;

use crate::security::SecurityConfig;

/// Signing secret used when none is configured outside production.
pub const DEVELOPMENT_JWT_SECRET: &str = "gymstudio-development-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT secret must be configured in production (set JWT_SECRET)")]
    MissingSecret,
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidValue {
                field: "environment",
                value: other.to_string(),
            }),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host (default: 127.0.0.1)
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Log level (default: info)
    pub log_level: String,
    /// Allowed CORS origins, `*` for any
    pub cors_origins: Vec<String>,
    pub security: SecurityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            cors_origins: vec!["*".to_string()],
            security: SecurityConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl SecurityConfig {
    /// The configured secret, or the development default outside production.
    ///
    /// Returns whether the fallback was used so the caller can warn operators.
    pub fn resolve_jwt_secret(&self) -> Result<(SecretString, bool), ConfigError> {
        match &self.jwt_secret {
            Some(secret) => Ok((secret.clone(), false)),
            None if self.environment.is_production() => Err(ConfigError::MissingSecret),
            None => Ok((SecretString::from(DEVELOPMENT_JWT_SECRET.to_string()), true)),
        }
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_environment_parsing() {
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("DEV".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_development_falls_back_to_default_secret() {
        let config = SecurityConfig::default();
        let (secret, fallback) = config.resolve_jwt_secret().unwrap();
        assert!(fallback);
        assert_eq!(secret.expose_secret(), DEVELOPMENT_JWT_SECRET);
    }

    #[test]
    fn test_production_requires_secret() {
        let config = SecurityConfig {
            environment: Environment::Production,
            ..SecurityConfig::default()
        };
        assert!(matches!(config.resolve_jwt_secret(), Err(ConfigError::MissingSecret)));

        let config = SecurityConfig {
            environment: Environment::Production,
            jwt_secret: Some(SecretString::from("prod-secret".to_string())),
            ..SecurityConfig::default()
        };
        let (secret, fallback) = config.resolve_jwt_secret().unwrap();
        assert!(!fallback);
        assert_eq!(secret.expose_secret(), "prod-secret");
    }

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.security.auth_timeout(), Duration::from_millis(5000));
    }
}
