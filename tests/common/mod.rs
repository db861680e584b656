#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use gymstudio_api::security::auth::TokenService;
use gymstudio_api::{AccountDirectory, HttpServer, Identity, MemoryAccountDirectory, SecurityProvider, ServerConfig};
use secrecy::SecretString;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Test utilities for integration testing
pub mod test_utils {
    use super::*;

    pub fn token_service(ttl: chrono::Duration) -> TokenService {
        TokenService::new(&SecretString::from(TEST_SECRET.to_string()), ttl)
    }

    pub fn identity(role_id: &str) -> Identity {
        Identity {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            role_id: role_id.to_string(),
            full_name: "A B".to_string(),
        }
    }

    pub fn valid_token(role_id: &str) -> String {
        token_service(chrono::Duration::hours(24))
            .issue(&identity(role_id))
            .expect("token should be issued")
    }

    pub fn expired_token(role_id: &str) -> String {
        token_service(chrono::Duration::hours(-1))
            .issue(&identity(role_id))
            .expect("token should be issued")
    }

    pub fn test_security() -> Arc<SecurityProvider> {
        Arc::new(
            SecurityProvider::from_token_service(token_service(chrono::Duration::hours(24)))
                .with_auth_timeout(Duration::from_secs(60)),
        )
    }

    pub fn test_router_with(security: Arc<SecurityProvider>) -> Router {
        test_router_with_accounts(security, Arc::new(MemoryAccountDirectory::new()))
    }

    pub fn test_router_with_accounts(
        security: Arc<SecurityProvider>,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Router {
        HttpServer::new(&ServerConfig::default(), security, accounts).create_router()
    }

    pub fn test_router() -> Router {
        test_router_with(test_security())
    }
}

/// In-process client that drives a router without binding a socket
pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub async fn get(&self, path: &str, auth_header: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(value) = auth_header {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send(builder.body(Body::empty())?).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?;
        self.send(request).await
    }

    pub async fn post_raw(&self, path: &str, body: &str) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?;
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, json))
    }
}

/// Assertion helpers for response bodies
pub mod assertions {
    use super::*;

    pub fn assert_failure(body: &Value, message: &str) {
        assert_eq!(body["success"], Value::Bool(false), "body: {body}");
        assert_eq!(body["error"], Value::String(message.to_string()), "body: {body}");
    }

    pub fn assert_success(body: &Value) {
        assert_eq!(body["success"], Value::Bool(true), "body: {body}");
    }
}
