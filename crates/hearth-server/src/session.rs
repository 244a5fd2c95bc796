//! Session management with JWT tokens.
//!
//! A resident exchanges their id for a signed token once, then presents it
//! as `Authorization: Bearer <token>` on every connection route.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use hearth_domain::UserId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handlers::ApiError;

/// Session management error
#[derive(Debug, Error)]
pub enum SessionError {
    /// JWT encoding failed
    #[error("Failed to encode JWT: {0}")]
    JwtEncode(#[from] jsonwebtoken::errors::Error),

    /// No bearer token on the request
    #[error("Missing bearer token")]
    MissingToken,

    /// Token expired
    #[error("Session token expired")]
    TokenExpired,

    /// Invalid token
    #[error("Invalid session token")]
    InvalidToken,
}

/// JWT claims for session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Resident the token was issued to
    pub user_id: String,

    /// Token expiration timestamp (Unix epoch)
    pub exp: u64,

    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
}

/// Session response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    /// JWT session token
    pub token: String,

    /// Resident the token identifies
    pub user_id: String,

    /// Seconds until the token expires
    pub expires_in: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Session manager handles JWT token generation and validation
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_secs: u64,
}

impl SessionManager {
    /// Create a new session manager with the given JWT secret and expiry
    pub fn new(jwt_secret: &str, token_expiry_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_expiry_secs,
        }
    }

    /// Token lifetime in seconds
    pub fn token_expiry_secs(&self) -> u64 {
        self.token_expiry_secs
    }

    /// Generate a new session token for the given user
    pub fn generate_token(&self, user_id: &UserId) -> Result<String, SessionError> {
        let now = now_secs();

        let claims = SessionClaims {
            user_id: user_id.to_string(),
            exp: now + self.token_expiry_secs,
            iat: now,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a session token and extract claims
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let validation = Validation::default();
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::TokenExpired,
                _ => SessionError::InvalidToken,
            })?;

        Ok(token_data.claims)
    }

    /// Resolve a bearer token to the resident it was issued to
    pub fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
        let claims = self.validate_token(token)?;
        UserId::new(claims.user_id).map_err(|_| SessionError::InvalidToken)
    }
}

/// The authenticated resident making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    Arc<SessionManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Arc::<SessionManager>::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized(SessionError::MissingToken))?;

        let user = sessions
            .authenticate(token)
            .map_err(ApiError::Unauthorized)?;
        Ok(Caller(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn test_generate_and_validate_token() {
        let manager = SessionManager::new("test-secret", 3600);
        let token = manager.generate_token(&user("amara")).unwrap();

        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.user_id, "amara");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(manager.authenticate(&token).unwrap(), user("amara"));
    }

    #[test]
    fn test_expired_token() {
        let manager = SessionManager::new("test-secret", 3600);

        // Create a token that's already expired (exp in the past)
        let now = now_secs();
        let claims = SessionClaims {
            user_id: "amara".to_string(),
            exp: now - 100,
            iat: now - 200,
        };

        let token = encode(&Header::default(), &claims, &manager.encoding_key).unwrap();

        let result = manager.validate_token(&token);
        assert!(matches!(result, Err(SessionError::TokenExpired)));
    }

    #[test]
    fn test_invalid_token() {
        let manager = SessionManager::new("test-secret", 3600);
        let result = manager.validate_token("invalid-token");
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let manager1 = SessionManager::new("secret1", 3600);
        let manager2 = SessionManager::new("secret2", 3600);

        let token = manager1.generate_token(&user("amara")).unwrap();
        let result = manager2.authenticate(&token);
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[test]
    fn test_blank_subject_rejected() {
        let manager = SessionManager::new("test-secret", 3600);
        let now = now_secs();
        let claims = SessionClaims {
            user_id: String::new(),
            exp: now + 100,
            iat: now,
        };
        let token = encode(&Header::default(), &claims, &manager.encoding_key).unwrap();

        assert!(matches!(manager.authenticate(&token), Err(SessionError::InvalidToken)));
    }
}
