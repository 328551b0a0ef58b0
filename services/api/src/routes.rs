//! API service routes
//!
//! Procedures are mounted under `/api/rpc/<namespace>.<procedure>`. Queries
//! take their input from the query string, mutations from a JSON body.

use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tracing::warn;

use crate::{middleware::session_middleware, state::AppState};

pub mod admin;
pub mod auth;
pub mod case_studies;
pub mod profile;
pub mod quests;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let rpc = Router::new()
        .route("/auth.me", get(auth::me))
        .route("/auth.logout", post(auth::logout))
        .route("/caseStudies.list", get(case_studies::list))
        .route("/caseStudies.getById", get(case_studies::get_by_id))
        .route("/caseStudies.favorites", get(case_studies::favorites))
        .route("/caseStudies.create", post(case_studies::create))
        .route("/caseStudies.update", post(case_studies::update))
        .route("/caseStudies.delete", post(case_studies::delete))
        .route(
            "/caseStudies.toggleFavorite",
            post(case_studies::toggle_favorite),
        )
        .route("/caseStudies.report", post(case_studies::report))
        .route("/quests.list", get(quests::list))
        .route("/quests.getById", get(quests::get_by_id))
        .route("/quests.create", post(quests::create))
        .route("/quests.answer", post(quests::answer))
        .route("/quests.close", post(quests::close))
        .route("/profile.byUserId", get(profile::by_user_id))
        .route("/profile.myPosts", get(profile::my_posts))
        .route("/profile.updateName", post(profile::update_name))
        .route("/admin.posts", get(admin::posts))
        .route("/admin.deletePost", post(admin::delete_post))
        .route("/admin.setRecommended", post(admin::set_recommended));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/rpc", rpc)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match common::database::health_check(&state.db_pool).await {
        Ok(true) => "ok",
        Ok(false) => "unavailable",
        Err(e) => {
            warn!("Health check could not reach the store: {}", e);
            "unavailable"
        }
    };

    Json(json!({
        "status": "ok",
        "service": "api-service",
        "database": database
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestApp;
    use reqwest::{StatusCode, header};
    use serde_json::Value;
    use tokio::net::TcpListener;

    /// Serve the router on an ephemeral port and return its base URL
    async fn spawn(app: &TestApp) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = create_router(app.state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn read(response: reqwest::Response) -> (StatusCode, Value) {
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new().await;
        let base = spawn(&app).await;

        let (status, body) = read(reqwest::get(format!("{}/health", base)).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn test_mutation_requires_session() {
        let app = TestApp::new().await;
        let base = spawn(&app).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/rpc/quests.create", base))
            .json(&json!({ "title": "t", "content": "c" }))
            .send()
            .await
            .unwrap();
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_session_reaches_procedures() {
        let app = TestApp::new().await;
        let user = app.user("alice").await;
        let token = app.state.sessions.issue(&user.open_id, "alice").unwrap();
        let base = spawn(&app).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/api/rpc/caseStudies.create", base))
            .header(header::COOKIE, format!("app_session_id={}", token))
            .json(&json!({
                "title": "Prompt chaining",
                "description": "Splitting tasks",
                "category": "prompt"
            }))
            .send()
            .await
            .unwrap();
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], user.id);
        assert_eq!(body["category"], "prompt");

        let response = client
            .get(format!("{}/api/rpc/caseStudies.list?category=prompt", base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["authorName"], "alice");
        assert_eq!(body[0]["isFavorite"], false);

        let response = client
            .get(format!("{}/api/rpc/auth.me", base))
            .send()
            .await
            .unwrap();
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_malformed_input_gets_error_body() {
        let app = TestApp::new().await;
        let user = app.user("alice").await;
        let token = app.state.sessions.issue(&user.open_id, "alice").unwrap();
        let base = spawn(&app).await;
        let client = reqwest::Client::new();

        let bad_status = client
            .post(format!("{}/api/rpc/quests.close", base))
            .bearer_auth(&token)
            .json(&json!({ "questId": 1, "status": "closed" }))
            .send()
            .await
            .unwrap();
        let not_json = client
            .post(format!("{}/api/rpc/quests.create", base))
            .bearer_auth(&token)
            .body("title=t")
            .send()
            .await
            .unwrap();
        let bad_category = client
            .get(format!("{}/api/rpc/caseStudies.list?category=marketing", base))
            .send()
            .await
            .unwrap();

        for response in [bad_status, not_json, bad_category] {
            assert!(
                response.headers()[header::CONTENT_TYPE]
                    .to_str()
                    .unwrap()
                    .starts_with("application/json")
            );
            let (status, body) = read(response).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            let message = body["error"].as_str().unwrap();
            assert!(!message.contains("variant"));
            assert!(!message.contains("deserialize"));
        }
    }
}
