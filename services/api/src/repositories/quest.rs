//! Quest repository for database operations

use chrono::Utc;
use common::error::DatabaseResult;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::parse_column;
use crate::models::quest::{
    CloseOutcome, Quest, QuestAnswer, QuestAnswerView, QuestStatus, QuestView,
};

const QUEST_COLUMNS: &str = "id, user_id, title, content, status, solved_answer_id, \
     solver_user_id, created_at, updated_at, closed_at";

const ANSWER_COLUMNS: &str = "id, quest_id, user_id, content, created_at, updated_at";

const QUEST_VIEW_SELECT: &str = r#"
SELECT q.id, q.user_id, q.title, q.content, q.status, q.solved_answer_id, q.solver_user_id,
       q.created_at, q.updated_at, q.closed_at,
       u.name AS author_name,
       u.avatar_url AS author_avatar,
       (SELECT COUNT(*) FROM quest_answers a WHERE a.quest_id = q.id) AS answer_count
FROM quests q
JOIN users u ON u.id = q.user_id
"#;

/// Quest repository for database operations
#[derive(Clone)]
pub struct QuestRepository {
    pool: SqlitePool,
}

impl QuestRepository {
    /// Create a new quest repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The board, newest quest first, optionally restricted to one status
    pub async fn list(&self, status: Option<QuestStatus>) -> DatabaseResult<Vec<QuestView>> {
        let sql = format!(
            "{QUEST_VIEW_SELECT} WHERE (?1 IS NULL OR q.status = ?1) ORDER BY q.created_at DESC, q.id DESC"
        );

        let rows = sqlx::query(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(quest_view_from_row).collect()
    }

    pub async fn get_view(&self, id: i64) -> DatabaseResult<Option<QuestView>> {
        let sql = format!("{QUEST_VIEW_SELECT} WHERE q.id = ?1");

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(quest_view_from_row).transpose()
    }

    /// Get a quest by ID
    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Quest>> {
        let sql = format!("SELECT {QUEST_COLUMNS} FROM quests WHERE id = ?1");

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(quest_from_row).transpose()
    }

    /// Open a new quest
    pub async fn create(&self, author_id: i64, title: &str, content: &str) -> DatabaseResult<Quest> {
        info!("Creating quest for user {}: {}", author_id, title);

        let sql = format!(
            r#"
            INSERT INTO quests (user_id, title, content, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, 'open', ?4, ?4)
            RETURNING {QUEST_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(author_id)
            .bind(title)
            .bind(content)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        quest_from_row(&row)
    }

    /// Answers of a quest, oldest first
    pub async fn answers(&self, quest_id: i64) -> DatabaseResult<Vec<QuestAnswerView>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.quest_id, a.user_id, a.content, a.created_at, a.updated_at,
                   u.name AS author_name,
                   u.avatar_url AS author_avatar
            FROM quest_answers a
            JOIN users u ON u.id = a.user_id
            WHERE a.quest_id = ?1
            ORDER BY a.created_at ASC, a.id ASC
            "#,
        )
        .bind(quest_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(answer_view_from_row).collect()
    }

    pub async fn answer_count(&self, quest_id: i64) -> DatabaseResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quest_answers WHERE quest_id = ?1")
                .bind(quest_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Get an answer by ID
    pub async fn find_answer(&self, answer_id: i64) -> DatabaseResult<Option<QuestAnswer>> {
        let sql = format!("SELECT {ANSWER_COLUMNS} FROM quest_answers WHERE id = ?1");

        let row = sqlx::query(&sql)
            .bind(answer_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(answer_from_row).transpose()
    }

    /// Post an answer.
    ///
    /// The insert only happens while the quest is still open, checked in the
    /// same statement. `None` means the quest is missing or already closed.
    pub async fn add_answer(
        &self,
        quest_id: i64,
        author_id: i64,
        content: &str,
    ) -> DatabaseResult<Option<QuestAnswer>> {
        let sql = format!(
            r#"
            INSERT INTO quest_answers (quest_id, user_id, content, created_at, updated_at)
            SELECT ?1, ?2, ?3, ?4, ?4
            WHERE EXISTS (SELECT 1 FROM quests WHERE id = ?1 AND status = 'open')
            RETURNING {ANSWER_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(quest_id)
            .bind(author_id)
            .bind(content)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        if row.is_some() {
            info!("User {} answered quest {}", author_id, quest_id);
        }

        row.as_ref().map(answer_from_row).transpose()
    }

    /// Move an open quest to a terminal status.
    ///
    /// Status, solved answer, solver and closed-at are written by one UPDATE
    /// that only matches while the quest is open, so a second close never
    /// overwrites the first outcome.
    pub async fn close(
        &self,
        quest_id: i64,
        status: QuestStatus,
        solved_answer: Option<&QuestAnswer>,
    ) -> DatabaseResult<CloseOutcome> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE quests
            SET status = ?1, solved_answer_id = ?2, solver_user_id = ?3, closed_at = ?4, updated_at = ?4
            WHERE id = ?5 AND status = 'open'
            "#,
        )
        .bind(status.as_str())
        .bind(solved_answer.map(|a| a.id))
        .bind(solved_answer.map(|a| a.user_id))
        .bind(now)
        .bind(quest_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!("Quest {} closed as {}", quest_id, status);
            Ok(CloseOutcome::Closed)
        } else {
            Ok(CloseOutcome::AlreadyClosed)
        }
    }
}

fn quest_from_row(row: &SqliteRow) -> DatabaseResult<Quest> {
    let status: String = row.try_get("status")?;

    Ok(Quest {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        status: parse_column("quests", &status)?,
        solved_answer_id: row.try_get("solved_answer_id")?,
        solver_user_id: row.try_get("solver_user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        closed_at: row.try_get("closed_at")?,
    })
}

fn quest_view_from_row(row: &SqliteRow) -> DatabaseResult<QuestView> {
    Ok(QuestView {
        quest: quest_from_row(row)?,
        author_name: row.try_get("author_name")?,
        author_avatar: row.try_get("author_avatar")?,
        answer_count: row.try_get("answer_count")?,
    })
}

fn answer_view_from_row(row: &SqliteRow) -> DatabaseResult<QuestAnswerView> {
    Ok(QuestAnswerView {
        answer: answer_from_row(row)?,
        author_name: row.try_get("author_name")?,
        author_avatar: row.try_get("author_avatar")?,
    })
}

fn answer_from_row(row: &SqliteRow) -> DatabaseResult<QuestAnswer> {
    Ok(QuestAnswer {
        id: row.try_get("id")?,
        quest_id: row.try_get("quest_id")?,
        user_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
