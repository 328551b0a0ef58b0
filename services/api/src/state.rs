//! Application state shared across handlers

use common::{session::SessionService, users::UserRepository};
use sqlx::SqlitePool;

use crate::repositories::{case_study::CaseStudyRepository, quest::QuestRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub sessions: SessionService,
    pub user_repository: UserRepository,
    pub case_study_repository: CaseStudyRepository,
    pub quest_repository: QuestRepository,
}

impl AppState {
    pub fn new(pool: SqlitePool, sessions: SessionService) -> Self {
        Self {
            user_repository: UserRepository::new(pool.clone()),
            case_study_repository: CaseStudyRepository::new(pool.clone()),
            quest_repository: QuestRepository::new(pool.clone()),
            db_pool: pool,
            sessions,
        }
    }
}
