//! `auth.*` procedures

use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use common::{session::SESSION_COOKIE_NAME, users::User};

use crate::{middleware::AuthUser, models::SuccessResponse};

/// `auth.me`: the signed-in user, `null` for anonymous callers
pub async fn me(viewer: Option<AuthUser>) -> Json<Option<User>> {
    Json(viewer.map(|AuthUser(user)| user))
}

/// `auth.logout`: expire the session cookie, whether or not it was sent
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<SuccessResponse>) {
    let mut removal = Cookie::build(SESSION_COOKIE_NAME).path("/").build();
    removal.make_removal();

    (jar.add(removal), Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestApp, caller};
    use axum::{http::header, response::IntoResponse};

    #[tokio::test]
    async fn test_me() {
        let app = TestApp::new().await;
        let user = app.user("alice").await;

        let Json(anonymous) = me(None).await;
        assert!(anonymous.is_none());

        let Json(signed_in) = me(Some(caller(&user))).await;
        assert_eq!(signed_in.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn test_logout_expires_cookie() {
        let response = logout(CookieJar::new()).await.into_response();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();

        assert!(set_cookie.starts_with(&format!("{}=", SESSION_COOKIE_NAME)));
        assert!(set_cookie.contains("Max-Age=0"));
    }
}
