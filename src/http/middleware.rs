//! Access-control middleware.
//!
//! [`require_auth`] and [`optional_auth`] resolve the bearer token into an
//! [`AuthenticatedRequest`] extension; [`authorize`] then applies an
//! [`AccessRule`]. Layer `authorize` inside `require_auth` so the identity is
//! present when the rule runs.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info, warn};

use crate::security::{AuthError, AuthenticatedRequest, RequestSanitizer, SecurityProvider};

fn authorization_header(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

fn attach_correlation_id(request: &mut Request) -> String {
    let correlation_id = RequestSanitizer::create_correlation_id();
    if let Ok(header_value) = correlation_id.parse() {
        request.headers_mut().insert("X-Correlation-ID", header_value);
    }
    correlation_id
}

/// 401 without a bearer token, 403 when the token does not verify.
pub async fn require_auth(
    State(security): State<Arc<SecurityProvider>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let path = request.uri().path().to_string();

    let authenticated = security
        .authenticator()
        .parse_authorization_header(authorization_header(&request))
        .map_err(|e| {
            warn!("Authentication failed for {}: {}", path, e);
            e
        })?;

    let correlation_id = attach_correlation_id(&mut request);
    info!(
        "Request authenticated for {} ({}) with correlation ID: {}",
        authenticated.identity.id, authenticated.identity.role_id, correlation_id
    );

    request.extensions_mut().insert(authenticated);
    Ok(next.run(request).await)
}

/// Attaches the identity when a valid token is present and otherwise lets the
/// request through untouched.
pub async fn optional_auth(
    State(security): State<Arc<SecurityProvider>>,
    mut request: Request,
    next: Next,
) -> Response {
    match security
        .authenticator()
        .parse_authorization_header(authorization_header(&request))
    {
        Ok(authenticated) => {
            attach_correlation_id(&mut request);
            request.extensions_mut().insert(authenticated);
        }
        Err(AuthError::MissingCredential) => {}
        Err(e) => debug!("Ignoring unusable token on optional route: {}", e),
    }

    next.run(request).await
}

/// Role and permission requirements for a group of routes.
#[derive(Clone)]
pub struct AccessRule {
    security: Arc<SecurityProvider>,
    roles: Arc<HashSet<String>>,
    permission: Option<String>,
}

impl AccessRule {
    /// A rule with no role restriction and no permission requirement.
    pub fn new(security: Arc<SecurityProvider>) -> Self {
        Self {
            security,
            roles: Arc::new(HashSet::new()),
            permission: None,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Arc::new(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn check(&self, authenticated: &AuthenticatedRequest) -> Result<(), AuthError> {
        let identity = &authenticated.identity;

        if !self.roles.is_empty() && !self.roles.contains(&identity.role_id) {
            return Err(AuthError::InsufficientAuthorization);
        }

        if let Some(permission) = &self.permission {
            if !self.security.permissions().has_permission(identity, permission) {
                return Err(AuthError::InsufficientAuthorization);
            }
        }

        Ok(())
    }
}

/// 401 when no identity was attached upstream, 403 when the rule denies it.
pub async fn authorize(
    State(rule): State<AccessRule>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let authenticated = request
        .extensions()
        .get::<AuthenticatedRequest>()
        .ok_or(AuthError::MissingCredential)?;

    if let Err(e) = rule.check(authenticated) {
        warn!(
            "Access denied for {} with role {} on {}",
            authenticated.identity.id,
            authenticated.identity.role_id,
            request.uri().path()
        );
        return Err(e);
    }

    Ok(next.run(request).await)
}
