//! HTTP surface: JSON response envelope, access-control middleware, handlers
//! and the axum server.

pub mod handlers;
pub mod middleware;
pub mod server;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::accounts::AccountError;
use crate::security::{AuthError, RequestSanitizer};

pub use server::{AppState, HttpServer};

/// `{ "success": bool, "data"?: ..., "error"?: "..." }`
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            success: true,
            data: Some(serde_json::to_value(data).unwrap_or(Value::Null)),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

pub fn failure_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::failure(message))).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Signing(ref e) = self {
            error!("Token signing failed: {}", e);
        }
        failure_response(self.status_code(), self.public_message())
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        match self {
            AccountError::DuplicateEmail => failure_response(StatusCode::CONFLICT, self.to_string()),
            AccountError::InvalidInput(message) => {
                warn!("Rejected account input: {}", message);
                failure_response(StatusCode::BAD_REQUEST, message)
            }
            AccountError::Crypto(e) => {
                error!("Account crypto failure: {}", e);
                failure_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    RequestSanitizer::GENERIC_ERROR_MESSAGE,
                )
            }
            AccountError::Storage(detail) => {
                error!("Account store failure: {}", detail);
                failure_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    RequestSanitizer::GENERIC_ERROR_MESSAGE,
                )
            }
        }
    }
}
