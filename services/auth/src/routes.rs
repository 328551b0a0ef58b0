//! Sign-in service routes

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use common::{
    session::SESSION_COOKIE_NAME,
    users::{UpsertUser, User},
};
use oauth2::PkceCodeVerifier;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    AppState,
    error::{AuthError, AuthResult},
    oauth::PortalProfile,
    pending::PendingLogin,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Create the router for the sign-in service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/oauth/login", get(login))
        .route("/api/oauth/callback", get(callback))
        .route("/api/oauth/logout", post(logout))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match common::database::health_check(&state.db_pool).await {
        Ok(true) => "ok",
        _ => "unavailable",
    };

    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service",
        "database": database
    }))
}

/// Start a sign-in: remember the verifier and send the browser to the portal
pub async fn login(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Redirect {
    let (auth_url, csrf_token, pkce_verifier) = state.portal.authorize_url();

    state
        .pending
        .insert(
            csrf_token.secret().clone(),
            PendingLogin {
                pkce_verifier: pkce_verifier.secret().clone(),
                return_to: safe_return_to(query.return_to.as_deref()),
            },
        )
        .await;
    debug!("{} sign-ins pending", state.pending.len().await);

    Redirect::to(&auth_url)
}

/// Finish a sign-in: exchange the code, store the user, set the session cookie
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> AuthResult<(CookieJar, Redirect)> {
    if let Some(error) = &query.error {
        warn!("Portal reported a sign-in error: {}", error);
    }

    let csrf_state = query
        .state
        .ok_or(AuthError::BadRequest("Missing sign-in state"))?;

    let Some(pending) = state.pending.take(&csrf_state).await else {
        warn!("Rejected unknown or expired sign-in state");
        return Err(AuthError::BadRequest("Sign-in expired, please try again"));
    };

    let code = query
        .code
        .ok_or(AuthError::BadRequest("Missing authorization code"))?;

    let access_token = state
        .portal
        .exchange_code(code, PkceCodeVerifier::new(pending.pkce_verifier))
        .await
        .map_err(AuthError::Portal)?;

    let profile = state
        .portal
        .user_profile(&access_token)
        .await
        .map_err(AuthError::Portal)?;

    let (user, token) = sign_in(&state, profile).await?;
    info!("User {} signed in", user.id);

    let jar = jar.add(session_cookie(&state, token));
    Ok((jar, Redirect::to(&pending.return_to)))
}

/// Drop the session cookie
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    let mut removal = session_cookie(&state, String::new());
    removal.make_removal();

    (
        jar.add(removal),
        Json(serde_json::json!({ "success": true })),
    )
}

/// Store the portal identity and issue a session token for it
pub async fn sign_in(state: &AppState, profile: PortalProfile) -> AuthResult<(User, String)> {
    let promote_to_admin = state.settings.is_owner(&profile.open_id);

    let user = state
        .user_repository
        .upsert(&UpsertUser {
            open_id: profile.open_id,
            name: profile.name,
            email: profile.email,
            avatar_url: profile.avatar_url,
            login_method: profile.login_method,
            promote_to_admin,
        })
        .await?;

    if promote_to_admin {
        info!("User {} is on the owner allow-list", user.id);
    }

    let token = state
        .sessions
        .issue(&user.open_id, user.name.as_deref().unwrap_or_default())?;

    Ok((user, token))
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let max_age = i64::try_from(state.sessions.ttl_seconds()).unwrap_or(i64::MAX);

    Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.settings.oauth_redirect_url.starts_with("https://"))
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// Only same-site relative paths are followed after sign-in
pub fn safe_return_to(return_to: Option<&str>) -> String {
    match return_to {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
