use axum::http::StatusCode;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Tokens stay valid for a day after issuance.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingCredential,
    #[error("Invalid or expired token")]
    InvalidCredential,
    #[error("Insufficient permissions")]
    InsufficientAuthorization,
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("authentication backend timed out")]
    Timeout,
    #[error("authentication backend failed: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential => StatusCode::UNAUTHORIZED,
            AuthError::InvalidCredential | AuthError::InsufficientAuthorization => {
                StatusCode::FORBIDDEN
            }
            AuthError::Signing(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Text that is safe to put in a response body.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Signing(_) => "Could not issue token".to_string(),
            AuthError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Who the bearer of a token is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role_id: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role_id: String,
    pub full_name: String,
    pub iat: i64,
    pub exp: i64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role_id: claims.role_id,
            full_name: claims.full_name,
        }
    }
}

/// Identity attached to a request once its bearer token has verified.
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    pub request_id: Uuid,
    pub identity: Identity,
}

/// Signs and verifies HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let secret = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.id.clone(),
            email: identity.email.clone(),
            role_id: identity.role_id.clone(),
            full_name: identity.full_name.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Bad signatures, malformed tokens and expired tokens all come back as
    /// [`AuthError::InvalidCredential`].
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.into())
            .map_err(|e| {
                debug!("Token verification failed: {}", e);
                AuthError::InvalidCredential
            })
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<&str> {
    auth_header
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub struct Authenticator {
    tokens: TokenService,
}

impl Authenticator {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn authenticate_jwt(&self, token: &str) -> Result<AuthenticatedRequest, AuthError> {
        let identity = self.tokens.verify(token)?;
        Ok(AuthenticatedRequest {
            request_id: Uuid::new_v4(),
            identity,
        })
    }

    /// A missing header, a non-Bearer scheme and an empty token are all a
    /// missing credential; a token that fails verification is invalid.
    pub fn parse_authorization_header(
        &self,
        auth_header: Option<&str>,
    ) -> Result<AuthenticatedRequest, AuthError> {
        let token = extract_bearer_token(auth_header).ok_or(AuthError::MissingCredential)?;
        self.authenticate_jwt(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            role_id: "admin".to_string(),
            full_name: "A B".to_string(),
        }
    }

    fn service(secret: &str) -> TokenService {
        TokenService::new(
            &SecretString::from(secret.to_string()),
            Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        )
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let tokens = service("test-secret");
        let token = tokens.issue(&identity()).expect("token should be issued");
        assert_eq!(tokens.verify(&token).expect("token should verify"), identity());
    }

    #[test]
    fn test_expiry_is_one_day_after_issuance() {
        let tokens = service("test-secret");
        let token = tokens.issue(&identity()).expect("token should be issued");

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        let claims = decode::<Claims>(&token, &DecodingKey::from_secret(b""), &validation)
            .expect("claims should decode")
            .claims;
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_any_mutation_is_rejected() {
        let tokens = service("test-secret");
        let token = tokens.issue(&identity()).expect("token should be issued");

        for index in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
            let mutated = String::from_utf8(bytes).expect("ascii stays utf-8");
            assert!(
                matches!(tokens.verify(&mutated), Err(AuthError::InvalidCredential)),
                "mutation at byte {index} was accepted"
            );
        }
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = service("secret-a").issue(&identity()).expect("token should be issued");
        assert!(matches!(
            service("secret-b").verify(&token),
            Err(AuthError::InvalidCredential)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let expired = TokenService::new(
            &SecretString::from("test-secret".to_string()),
            Duration::hours(-1),
        );
        let token = expired.issue(&identity()).expect("token should be issued");
        assert!(matches!(expired.verify(&token), Err(AuthError::InvalidCredential)));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer_token(Some("Bearer ")), None);
        assert_eq!(extract_bearer_token(Some("Basic dXNlcg==")), None);
        assert_eq!(extract_bearer_token(None), None);
    }

    #[test]
    fn test_authorization_header_failures() {
        let auth = Authenticator::new(service("test-secret"));

        assert!(matches!(
            auth.parse_authorization_header(None),
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            auth.parse_authorization_header(Some("Bearer not-a-token")),
            Err(AuthError::InvalidCredential)
        ));

        let token = auth.tokens().issue(&identity()).expect("token should be issued");
        let header = format!("Bearer {token}");
        let request = auth
            .parse_authorization_header(Some(&header))
            .expect("valid header should authenticate");
        assert_eq!(request.identity.role_id, "admin");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::MissingCredential.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidCredential.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::InsufficientAuthorization.status_code(),
            StatusCode::FORBIDDEN
        );

        let internal = AuthError::Internal("task 12 panicked".to_string());
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.public_message(), "Internal server error");
    }
}
