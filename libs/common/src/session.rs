//! Signed session tokens
//!
//! After a successful OAuth sign-in the caller receives an HS256 JWT carrying
//! their external open id. The token travels in the `app_session_id` cookie
//! or an `Authorization: Bearer` header and is verified on every request.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Cookie holding the session token
pub const SESSION_COOKIE_NAME: &str = "app_session_id";

/// One year, matching the cookie lifetime
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// External open id of the signed-in user
    pub sub: String,
    /// Application the token was issued for
    pub app_id: String,
    /// Display name at sign-in time
    pub name: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("Session token was issued for another application")]
    WrongApplication,

    #[error("System clock error: {0}")]
    Clock(String),
}

/// Issues and verifies session tokens
#[derive(Clone)]
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    app_id: String,
    ttl_seconds: u64,
}

impl SessionService {
    /// Create a session service signing with `secret`
    pub fn new(secret: &str, app_id: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            app_id: app_id.to_string(),
            ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    /// Override the token lifetime
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Issue a token for the given open id
    pub fn issue(&self, open_id: &str, name: &str) -> Result<String, SessionError> {
        self.issue_at(open_id, name, now_seconds()?)
    }

    fn issue_at(&self, open_id: &str, name: &str, now: u64) -> Result<String, SessionError> {
        let claims = SessionClaims {
            sub: open_id.to_string(),
            app_id: self.app_id.clone(),
            name: name.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;

        if data.claims.app_id != self.app_id {
            return Err(SessionError::WrongApplication);
        }

        Ok(data.claims)
    }
}

fn now_seconds() -> Result<u64, SessionError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| SessionError::Clock(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let service = SessionService::new("secret", "app");
        let token = service.issue("open-1", "Alice").unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "open-1");
        assert_eq!(claims.name, "Alice");
        assert_eq!(claims.app_id, "app");
        assert_eq!(claims.exp - claims.iat, DEFAULT_SESSION_TTL_SECONDS);
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let token = SessionService::new("secret", "app")
            .issue("open-1", "Alice")
            .unwrap();

        let other = SessionService::new("another-secret", "app");
        assert!(matches!(other.verify(&token), Err(SessionError::Invalid(_))));
    }

    #[test]
    fn test_other_application_is_rejected() {
        let token = SessionService::new("secret", "app-a")
            .issue("open-1", "Alice")
            .unwrap();

        let service = SessionService::new("secret", "app-b");
        assert!(matches!(
            service.verify(&token),
            Err(SessionError::WrongApplication)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = SessionService::new("secret", "app").with_ttl(10);
        let long_ago = now_seconds().unwrap() - 3600;
        let token = service.issue_at("open-1", "Alice", long_ago).unwrap();

        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let service = SessionService::new("secret", "app");
        assert!(service.verify("not-a-token").is_err());
    }
}
