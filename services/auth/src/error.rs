//! Sign-in errors

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Custom error type for the sign-in service
#[derive(Error, Debug)]
pub enum AuthError {
    /// The callback is missing a parameter or names an unknown sign-in
    #[error("Bad request: {0}")]
    BadRequest(&'static str),

    /// The portal refused the code or returned an unusable identity
    #[error("Portal error: {0}")]
    Portal(anyhow::Error),

    #[error("Session error: {0}")]
    Session(#[from] common::session::SessionError),

    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AuthError::BadRequest(msg) => (StatusCode::BAD_REQUEST, *msg),
            AuthError::Portal(_) => (StatusCode::BAD_GATEWAY, "Sign-in failed, please try again"),
            AuthError::Session(_) | AuthError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ),
        };

        if status.is_server_error() {
            error!("Sign-in failed: {}", self);
        }

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::BadRequest("missing state").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Portal(anyhow::anyhow!("boom"))
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AuthError::Database(common::error::DatabaseError::Migration("x".to_string()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
