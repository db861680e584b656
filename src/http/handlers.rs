use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{future::Future, sync::LazyLock, time::Duration};
use tracing::{error, info, warn};

use super::{ApiResponse, AppState, failure_response};
use crate::accounts::NewAccount;
use crate::security::crypto;
use crate::security::validation::sanitize_email;
use crate::security::{AuthError, AuthenticatedRequest, Identity};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: i64,
    pub user: Identity,
}

/// Client-facing message for request bodies that fail to parse.
pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";

/// Hash checked for unknown emails so that login costs the same either way.
static UNKNOWN_ACCOUNT_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| crypto::hash_password(&crypto::generate_token(16)).ok());

fn verify_unknown_account(password: &str) -> bool {
    if let Some(hash) = UNKNOWN_ACCOUNT_HASH.as_deref() {
        let _ = crypto::verify_password(password, hash);
    }
    false
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            Err(failure_response(StatusCode::BAD_REQUEST, INVALID_BODY_MESSAGE))
        }
    }
}

/// Runs blocking password work off the async runtime, bounded by `limit`.
async fn run_bounded<T, F>(limit: Duration, work: F) -> Result<T, AuthError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    bounded(limit, tokio::task::spawn_blocking(work)).await
}

async fn bounded<T, E, Fut>(limit: Duration, future: Fut) -> Result<T, AuthError>
where
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(limit, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!("Password worker failed: {}", e);
            Err(AuthError::Internal(e.to_string()))
        }
        Err(_) => {
            warn!("Password work exceeded {}ms", limit.as_millis());
            Err(AuthError::Timeout)
        }
    }
}

fn token_response(state: &AppState, identity: Identity) -> Result<TokenResponse, AuthError> {
    let tokens = state.security.tokens();
    Ok(TokenResponse {
        token: tokens.issue(&identity)?,
        expires_in: tokens.ttl().num_seconds(),
        user: identity,
    })
}

pub async fn health() -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
        timestamp: chrono::Utc::now(),
    };
    (StatusCode::OK, Json(response))
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewAccount>, JsonRejection>,
) -> Response {
    let input = match parse_body(payload) {
        Ok(input) => input,
        Err(response) => return response,
    };

    let input = match input.normalized() {
        Ok(input) => input,
        Err(e) => return e.into_response(),
    };

    let account = match run_bounded(state.security.auth_timeout(), move || input.into_account()).await
    {
        Ok(Ok(account)) => account,
        Ok(Err(e)) => return e.into_response(),
        Err(e) => return e.into_response(),
    };

    let account = match state.accounts.insert(account).await {
        Ok(account) => account,
        Err(e) => return e.into_response(),
    };

    info!("Registered account {} ({})", account.id, account.role_id);

    match token_response(&state, account.identity()) {
        Ok(body) => (StatusCode::CREATED, Json(ApiResponse::ok(body))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let input = match parse_body(payload) {
        Ok(input) => input,
        Err(response) => return response,
    };

    let email = sanitize_email(&input.email);

    let account = match state.accounts.find_by_email(&email).await {
        Ok(account) => account,
        Err(e) => return e.into_response(),
    };

    let Some(account) = account else {
        warn!("Login attempt for unknown account");
        let password = input.password;
        if let Err(e) =
            run_bounded(state.security.auth_timeout(), move || verify_unknown_account(&password))
                .await
        {
            return e.into_response();
        }
        return failure_response(StatusCode::UNAUTHORIZED, "Invalid email or password");
    };

    let hash = account.password_hash.clone();
    let password = input.password;
    let verified = match run_bounded(state.security.auth_timeout(), move || {
        crypto::verify_password(&password, &hash)
    })
    .await
    {
        Ok(verified) => verified,
        Err(e) => return e.into_response(),
    };

    if !verified {
        warn!("Failed login for account {}", account.id);
        return failure_response(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }

    info!("Account {} logged in", account.id);

    match token_response(&state, account.identity()) {
        Ok(body) => (StatusCode::OK, Json(ApiResponse::ok(body))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Identity attached by the auth middleware.
pub async fn me(Extension(authenticated): Extension<AuthenticatedRequest>) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::ok(authenticated.identity)))
}

pub async fn session(
    authenticated: Option<Extension<AuthenticatedRequest>>,
) -> impl IntoResponse {
    let body = match authenticated {
        Some(Extension(authenticated)) => json!({
            "authenticated": true,
            "identity": authenticated.identity,
        }),
        None => json!({ "authenticated": false }),
    };
    (StatusCode::OK, Json(ApiResponse::ok(body)))
}

pub async fn admin_overview(
    State(state): State<AppState>,
    Extension(authenticated): Extension<AuthenticatedRequest>,
) -> Response {
    let accounts = match state.accounts.count().await {
        Ok(accounts) => accounts,
        Err(e) => return e.into_response(),
    };
    (
        StatusCode::OK,
        Json(ApiResponse::ok(json!({
            "viewer": authenticated.identity,
            "requestId": authenticated.request_id,
            "accounts": accounts,
        }))),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, std::io::Error>(1)
        };
        assert!(matches!(
            bounded(Duration::from_millis(10), slow).await,
            Err(AuthError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_panicked_worker_is_internal_error() {
        let result = run_bounded(Duration::from_secs(5), || -> u8 { panic!("bcrypt worker died") }).await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }

    #[test]
    fn test_unknown_account_never_verifies() {
        assert!(UNKNOWN_ACCOUNT_HASH.is_some());
        assert!(!verify_unknown_account("reformer-pilates"));
        assert!(!verify_unknown_account(""));
    }

    #[tokio::test]
    async fn test_run_bounded_returns_value() {
        let value = run_bounded(Duration::from_secs(1), || 21 * 2).await.unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "1.0.0".to_string(),
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&response).expect("Should serialize");
        assert!(json.contains("healthy"));
        assert!(json.contains("1.0.0"));
    }
}
