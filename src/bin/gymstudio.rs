//! GymStudio API server - Main binary

use anyhow::{Context, Result};
use clap::Parser;
use gymstudio_api::{
    Environment, HttpServer, MemoryAccountDirectory, SecurityConfig, SecurityProvider,
    ServerConfig,
};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gymstudio")]
#[command(about = "GymStudio management API server")]
#[command(version)]
struct Cli {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Deployment environment
    #[arg(long, env = "APP_ENV", default_value = "development", value_parser = ["development", "production"])]
    environment: String,

    /// Token signing secret
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Token validity in hours
    #[arg(long, env = "TOKEN_TTL_HOURS", default_value = "24")]
    token_ttl_hours: i64,

    /// Allowed CORS origins, `*` for any
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,

    /// Upper bound for password hashing work per request, in milliseconds
    #[arg(long, env = "AUTH_TIMEOUT_MS", default_value = "5000")]
    auth_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::EnvFilter::new(&cli.log_level))
        .init();

    info!("Starting GymStudio API v{}", gymstudio_api::VERSION);

    let environment: Environment = cli.environment.parse()?;
    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        log_level: cli.log_level,
        cors_origins: cli.cors_origins,
        security: SecurityConfig {
            environment,
            jwt_secret: cli.jwt_secret.map(SecretString::from),
            token_ttl_hours: cli.token_ttl_hours,
            auth_timeout_ms: cli.auth_timeout_ms,
        },
    };

    let security = SecurityProvider::new(config.security.clone())
        .context("Invalid security configuration")?;
    let accounts = Arc::new(MemoryAccountDirectory::new());
    let server = HttpServer::new(&config, Arc::new(security), accounts);

    let shutdown_signal = async {
        match signal::ctrl_c().await {
            Ok(_) => info!("Received Ctrl+C, shutting down..."),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
    };

    info!("Starting HTTP server on {} ({:?})", config.bind_address(), environment);
    if let Err(e) = server.start(shutdown_signal).await {
        error!("HTTP server error: {:#}", e);
        return Err(e);
    }

    info!("GymStudio API shutdown complete");
    Ok(())
}
