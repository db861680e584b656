//! # GymStudio API
//!
//! Security core of the gym and fitness-studio management API: bearer-token
//! authentication, role and permission gating, password hashing, symmetric
//! encryption and the format validators used for member records.

pub mod accounts;
pub mod config;
pub mod http;
pub mod security;

// Re-export commonly used types
pub use accounts::{AccountDirectory, MemoryAccountDirectory};
pub use config::{ConfigError, Environment, ServerConfig};
pub use http::HttpServer;
pub use security::{AuthError, AuthenticatedRequest, Identity, SecurityConfig, SecurityProvider};

/// Current version of the API server
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
