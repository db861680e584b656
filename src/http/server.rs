//! HTTP server wiring

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::handlers;
use super::middleware::{AccessRule, authorize, optional_auth, require_auth};
use crate::accounts::AccountDirectory;
use crate::config::ServerConfig;
use crate::security::SecurityProvider;

/// Roles allowed onto the studio administration routes.
pub const ADMIN_ROLES: [&str; 2] = ["owner", "admin"];
pub const MANAGE_STUDIO_PERMISSION: &str = "studio:manage";

/// Application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub security: Arc<SecurityProvider>,
    pub accounts: Arc<dyn AccountDirectory>,
}

#[derive(Clone)]
pub struct HttpServer {
    host: String,
    port: u16,
    cors_origins: Vec<String>,
    state: AppState,
}

impl HttpServer {
    pub fn new(
        config: &ServerConfig,
        security: Arc<SecurityProvider>,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            cors_origins: config.cors_origins.clone(),
            state: AppState { security, accounts },
        }
    }

    fn cors_layer(&self) -> CorsLayer {
        let mut cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

        if self.cors_origins.iter().any(|origin| origin == "*") {
            return cors.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        cors = cors.allow_origin(origins);
        cors
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(&self) -> Router {
        let security = self.state.security.clone();

        let admin_rule = AccessRule::new(security.clone())
            .with_roles(ADMIN_ROLES)
            .with_permission(MANAGE_STUDIO_PERMISSION);

        // `authorize` is added first so it runs after `require_auth`
        let admin = Router::new()
            .route("/api/admin/overview", get(handlers::admin_overview))
            .route_layer(middleware::from_fn_with_state(admin_rule, authorize))
            .route_layer(middleware::from_fn_with_state(security.clone(), require_auth));

        let protected = Router::new()
            .route("/api/auth/me", get(handlers::me))
            .route_layer(middleware::from_fn_with_state(security.clone(), require_auth));

        let optional = Router::new()
            .route("/api/auth/session", get(handlers::session))
            .route_layer(middleware::from_fn_with_state(security, optional_auth));

        let public = Router::new()
            .route("/health", get(handlers::health))
            .route("/api/auth/register", post(handlers::register))
            .route("/api/auth/login", post(handlers::login));

        Router::new()
            .merge(public)
            .merge(optional)
            .merge(protected)
            .merge(admin)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(self.cors_layer()),
            )
            .with_state(self.state.clone())
    }

    /// Serves until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.create_router();
        let addr = format!("{}:{}", self.host, self.port);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;

        info!("HTTP server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server error")?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::MemoryAccountDirectory;
    use crate::security::SecurityConfig;

    fn server(cors_origins: Vec<String>) -> HttpServer {
        let config = ServerConfig {
            cors_origins,
            ..ServerConfig::default()
        };
        let security = Arc::new(SecurityProvider::new(SecurityConfig::default()).unwrap());
        HttpServer::new(&config, security, Arc::new(MemoryAccountDirectory::new()))
    }

    #[test]
    fn test_server_takes_bind_address_from_config() {
        let server = server(vec!["*".to_string()]);
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.port, 3000);
    }

    #[test]
    fn test_router_creation_with_explicit_origins() {
        let server = server(vec![
            "http://localhost:5173".to_string(),
            "not a header\n".to_string(),
        ]);
        let _router = server.create_router();
    }
}
