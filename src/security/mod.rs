//! Security and authentication implementations

pub mod auth;
pub mod crypto;
pub mod permissions;
pub mod validation;

use auth::{Authenticator, DEFAULT_TOKEN_TTL_HOURS, TokenService};
use permissions::{AllowAllPermissions, PermissionPolicy};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::{ConfigError, Environment};

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub environment: Environment,
    pub jwt_secret: Option<SecretString>,
    pub token_ttl_hours: i64,
    /// Upper bound on password hashing/verification work per request
    pub auth_timeout_ms: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            jwt_secret: None,
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            auth_timeout_ms: 5000,
        }
    }
}

/// Everything the access-control middleware needs, built once at start-up.
pub struct SecurityProvider {
    authenticator: Authenticator,
    permissions: Arc<dyn PermissionPolicy>,
    auth_timeout: Duration,
}

impl SecurityProvider {
    pub fn new(config: SecurityConfig) -> Result<Self, ConfigError> {
        if config.token_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "token_ttl_hours",
                value: config.token_ttl_hours.to_string(),
            });
        }

        let (secret, fallback) = config.resolve_jwt_secret()?;
        if fallback {
            warn!(
                "JWT_SECRET is not set; signing tokens with the insecure development secret. \
                 Never run a production deployment like this."
            );
        }

        let tokens = TokenService::new(&secret, chrono::Duration::hours(config.token_ttl_hours));

        Ok(Self {
            authenticator: Authenticator::new(tokens),
            permissions: Arc::new(AllowAllPermissions),
            auth_timeout: config.auth_timeout(),
        })
    }

    /// Provider around an already-built token service, mostly for tests.
    pub fn from_token_service(tokens: TokenService) -> Self {
        Self {
            authenticator: Authenticator::new(tokens),
            permissions: Arc::new(AllowAllPermissions),
            auth_timeout: SecurityConfig::default().auth_timeout(),
        }
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn with_permission_policy(mut self, policy: Arc<dyn PermissionPolicy>) -> Self {
        self.permissions = policy;
        self
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn tokens(&self) -> &TokenService {
        self.authenticator.tokens()
    }

    pub fn permissions(&self) -> &dyn PermissionPolicy {
        self.permissions.as_ref()
    }

    pub fn auth_timeout(&self) -> Duration {
        self.auth_timeout
    }
}

pub use auth::{AuthError, AuthenticatedRequest, Identity};
pub use validation::RequestSanitizer;
