//! Shared fixtures for the service's tests

use chrono::Utc;
use common::{
    database::init_memory_pool,
    migrations,
    session::SessionService,
    users::{Role, UpsertUser, User},
};

use crate::{
    middleware::AuthUser,
    models::case_study::{CaseStudyDraft, Category},
    state::AppState,
};

/// Application state backed by a fresh, migrated in-memory store
pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = init_memory_pool().await.expect("in-memory store");
        migrations::run(&pool).await.expect("migrations");

        Self {
            state: AppState::new(pool, SessionService::new("test-secret", "test-app")),
        }
    }

    /// Sign in a regular user whose open id and name are both `name`
    pub async fn user(&self, name: &str) -> User {
        self.sign_in(name, false).await
    }

    pub async fn admin(&self, name: &str) -> User {
        self.sign_in(name, true).await
    }

    async fn sign_in(&self, name: &str, admin: bool) -> User {
        self.state
            .user_repository
            .upsert(&UpsertUser {
                open_id: name.to_string(),
                name: Some(name.to_string()),
                avatar_url: Some(format!("https://avatars.example.com/{}.png", name)),
                promote_to_admin: admin,
                ..Default::default()
            })
            .await
            .expect("user upsert")
    }

    /// A user record that was never stored
    pub fn detached_user(id: i64, role: Role) -> User {
        let now = Utc::now();
        User {
            id,
            open_id: format!("detached-{}", id),
            name: None,
            email: None,
            avatar_url: None,
            login_method: None,
            role,
            created_at: now,
            updated_at: now,
            last_signed_in_at: now,
        }
    }
}

pub fn caller(user: &User) -> AuthUser {
    AuthUser(user.clone())
}

pub fn draft(title: &str, category: Category) -> CaseStudyDraft {
    CaseStudyDraft {
        title: title.to_string(),
        description: format!("{} in practice", title),
        category,
        tools: vec!["ChatGPT".to_string()],
        steps: vec!["Write the prompt".to_string()],
        tags: vec![],
        challenge: "Manual work".to_string(),
        solution: "Let the model draft it".to_string(),
        impact: "Saved an hour a day".to_string(),
    }
}
