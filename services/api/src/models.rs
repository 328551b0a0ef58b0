//! API models for request and response payloads

use chrono::{DateTime, Utc};
use common::users::User;
use serde::{Deserialize, Serialize};

pub mod case_study;
pub mod quest;

use case_study::CaseStudyView;

/// Public part of a user record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at: user.created_at,
        }
    }
}

/// Public profile page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user: PublicUser,
    pub posts: Vec<CaseStudyView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdQuery {
    pub user_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNameInput {
    pub name: String,
}

/// Generic acknowledgement for mutations without a richer result
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
