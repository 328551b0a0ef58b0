//! Session resolution and the authenticated-caller extractor

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use common::{session::SESSION_COOKIE_NAME, users::User};
use tracing::{debug, warn};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Signed-in caller, resolved from the session token by [`session_middleware`]
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }

    /// Reject callers without the admin role
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            warn!("User {} attempted an admin operation", self.id());
            Err(ApiError::Forbidden("admin only"))
        }
    }
}

/// Pull the session token from the session cookie, falling back to a bearer header
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolve the caller for every request.
///
/// Requests without a valid session continue anonymously; procedures that
/// need a caller reject them through the [`AuthUser`] extractor.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token(req.headers()) {
        match resolve_user(&state, &token).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(AuthUser(user));
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to resolve session: {}", e),
        }
    }

    next.run(req).await
}

/// Map a session token to the stored user, `None` for invalid tokens or unknown users
pub async fn resolve_user(state: &AppState, token: &str) -> ApiResult<Option<User>> {
    let claims = match state.sessions.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Rejected session token: {}", e);
            return Ok(None);
        }
    };

    Ok(state.user_repository.find_by_open_id(&claims.sub).await?)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestApp;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; app_session_id=abc.def.ghi"),
        );

        assert_eq!(session_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer token-123"),
        );

        assert_eq!(session_token(&headers).as_deref(), Some("token-123"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        assert!(session_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert!(session_token(&headers).is_none());
    }

    #[tokio::test]
    async fn test_resolve_user() {
        let app = TestApp::new().await;
        let user = app.user("alice").await;

        let token = app.state.sessions.issue(&user.open_id, "alice").unwrap();
        let resolved = resolve_user(&app.state, &token).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        let stranger = app.state.sessions.issue("unknown", "x").unwrap();
        assert!(resolve_user(&app.state, &stranger).await.unwrap().is_none());
        assert!(resolve_user(&app.state, "garbage").await.unwrap().is_none());
    }

    #[test]
    fn test_require_admin() {
        let plain = TestApp::detached_user(1, common::users::Role::User);
        let admin = TestApp::detached_user(2, common::users::Role::Admin);

        assert!(matches!(
            AuthUser(plain).require_admin(),
            Err(ApiError::Forbidden(_))
        ));
        assert!(AuthUser(admin).require_admin().is_ok());
    }
}
