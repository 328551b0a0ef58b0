//! Case study repository for database operations

use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::parse_column;
use crate::models::case_study::{
    CaseStudy, CaseStudyDraft, CaseStudyView, Category, FavoriteToggle, ReportOutcome,
};

const CASE_STUDY_COLUMNS: &str = "id, user_id, title, description, category, tools, steps, tags, \
     challenge, solution, impact, is_recommended, created_at, updated_at";

// ?1 is the viewer id (NULL for anonymous callers)
const VIEW_SELECT: &str = r#"
SELECT cs.id, cs.user_id, cs.title, cs.description, cs.category, cs.tools, cs.steps, cs.tags,
       cs.challenge, cs.solution, cs.impact, cs.is_recommended, cs.created_at, cs.updated_at,
       u.name AS author_name,
       u.avatar_url AS author_avatar,
       (SELECT COUNT(*) FROM favorites f WHERE f.case_study_id = cs.id) AS favorite_count,
       (SELECT COUNT(*) FROM reports r WHERE r.case_study_id = cs.id) AS report_count,
       EXISTS (SELECT 1 FROM favorites f WHERE f.case_study_id = cs.id AND f.user_id = ?1) AS is_favorite,
       EXISTS (SELECT 1 FROM reports r WHERE r.case_study_id = cs.id AND r.user_id = ?1) AS is_reported
FROM case_studies cs
JOIN users u ON u.id = cs.user_id
"#;

/// Case study repository for database operations
#[derive(Clone)]
pub struct CaseStudyRepository {
    pool: SqlitePool,
}

impl CaseStudyRepository {
    /// Create a new case study repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The feed, newest first, optionally restricted to one category
    pub async fn list(
        &self,
        viewer: Option<i64>,
        category: Option<Category>,
    ) -> DatabaseResult<Vec<CaseStudyView>> {
        let sql = format!(
            "{VIEW_SELECT} WHERE (?2 IS NULL OR cs.category = ?2) ORDER BY cs.created_at DESC, cs.id DESC"
        );

        let rows = sqlx::query(&sql)
            .bind(viewer)
            .bind(category.map(|c| c.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(view_from_row).collect()
    }

    /// Posts written by one author, newest first
    pub async fn list_by_author(
        &self,
        author_id: i64,
        viewer: Option<i64>,
    ) -> DatabaseResult<Vec<CaseStudyView>> {
        let sql =
            format!("{VIEW_SELECT} WHERE cs.user_id = ?2 ORDER BY cs.created_at DESC, cs.id DESC");

        let rows = sqlx::query(&sql)
            .bind(viewer)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(view_from_row).collect()
    }

    /// Posts the user has favorited, most recently favorited first
    pub async fn list_favorites(&self, user_id: i64) -> DatabaseResult<Vec<CaseStudyView>> {
        let sql = format!(
            "{VIEW_SELECT} JOIN favorites mine ON mine.case_study_id = cs.id AND mine.user_id = ?1 \
             ORDER BY mine.created_at DESC, mine.id DESC"
        );

        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(view_from_row).collect()
    }

    /// Every post, most reported first
    pub async fn list_for_moderation(&self, viewer: i64) -> DatabaseResult<Vec<CaseStudyView>> {
        let sql = format!(
            "{VIEW_SELECT} ORDER BY report_count DESC, cs.created_at DESC, cs.id DESC"
        );

        let rows = sqlx::query(&sql)
            .bind(viewer)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(view_from_row).collect()
    }

    /// One post, annotated for the viewer
    pub async fn get_view(
        &self,
        id: i64,
        viewer: Option<i64>,
    ) -> DatabaseResult<Option<CaseStudyView>> {
        let sql = format!("{VIEW_SELECT} WHERE cs.id = ?2");

        let row = sqlx::query(&sql)
            .bind(viewer)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(view_from_row).transpose()
    }

    /// Get a case study by ID
    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<CaseStudy>> {
        let sql = format!("SELECT {CASE_STUDY_COLUMNS} FROM case_studies WHERE id = ?1");

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(case_study_from_row).transpose()
    }

    /// Create a new case study
    pub async fn create(&self, author_id: i64, draft: &CaseStudyDraft) -> DatabaseResult<CaseStudy> {
        info!("Creating case study for user {}: {}", author_id, draft.title);

        let sql = format!(
            r#"
            INSERT INTO case_studies (user_id, title, description, category, tools, steps, tags,
                                      challenge, solution, impact, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            RETURNING {CASE_STUDY_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(author_id)
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(draft.category.as_str())
            .bind(Json(&draft.tools))
            .bind(Json(&draft.steps))
            .bind(Json(&draft.tags))
            .bind(&draft.challenge)
            .bind(&draft.solution)
            .bind(&draft.impact)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        case_study_from_row(&row)
    }

    /// Overwrite the writable fields of a case study
    pub async fn update(&self, id: i64, draft: &CaseStudyDraft) -> DatabaseResult<Option<CaseStudy>> {
        info!("Updating case study {}", id);

        let sql = format!(
            r#"
            UPDATE case_studies
            SET title = ?1, description = ?2, category = ?3, tools = ?4, steps = ?5, tags = ?6,
                challenge = ?7, solution = ?8, impact = ?9, updated_at = ?10
            WHERE id = ?11
            RETURNING {CASE_STUDY_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(draft.category.as_str())
            .bind(Json(&draft.tools))
            .bind(Json(&draft.steps))
            .bind(Json(&draft.tags))
            .bind(&draft.challenge)
            .bind(&draft.solution)
            .bind(&draft.impact)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(case_study_from_row).transpose()
    }

    /// Set or clear the recommended flag
    pub async fn set_recommended(
        &self,
        id: i64,
        recommended: bool,
    ) -> DatabaseResult<Option<CaseStudy>> {
        let sql = format!(
            "UPDATE case_studies SET is_recommended = ?1, updated_at = ?2 WHERE id = ?3 \
             RETURNING {CASE_STUDY_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(recommended)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(case_study_from_row).transpose()
    }

    /// Delete a case study together with its favorites and reports
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        info!("Deleting case study {}", id);

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM favorites WHERE case_study_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM reports WHERE case_study_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM case_studies WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip the user's favorite on a post.
    ///
    /// A concurrent duplicate insert lands on the unique pair and is ignored,
    /// so two racing toggles settle on a single row instead of failing.
    pub async fn toggle_favorite(
        &self,
        user_id: i64,
        case_study_id: i64,
    ) -> DatabaseResult<FavoriteToggle> {
        let removed = sqlx::query("DELETE FROM favorites WHERE user_id = ?1 AND case_study_id = ?2")
            .bind(user_id)
            .bind(case_study_id)
            .execute(&self.pool)
            .await?;

        if removed.rows_affected() > 0 {
            return Ok(FavoriteToggle::Removed);
        }

        sqlx::query(
            r#"
            INSERT INTO favorites (user_id, case_study_id, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id, case_study_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(case_study_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(FavoriteToggle::Added)
    }

    pub async fn favorite_count(&self, case_study_id: i64) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE case_study_id = ?1")
            .bind(case_study_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Record a report; a second report by the same user is a no-op
    pub async fn report(&self, user_id: i64, case_study_id: i64) -> DatabaseResult<ReportOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO reports (user_id, case_study_id, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id, case_study_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(case_study_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!("User {} reported case study {}", user_id, case_study_id);
            Ok(ReportOutcome::Reported)
        } else {
            Ok(ReportOutcome::AlreadyReported)
        }
    }

    pub async fn report_count(&self, case_study_id: i64) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE case_study_id = ?1")
            .bind(case_study_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn case_study_from_row(row: &SqliteRow) -> DatabaseResult<CaseStudy> {
    let category: String = row.try_get("category")?;
    let tools: Json<Vec<String>> = row.try_get("tools")?;
    let steps: Json<Vec<String>> = row.try_get("steps")?;
    let tags: Json<Vec<String>> = row.try_get("tags")?;

    Ok(CaseStudy {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: parse_column("case_studies", &category)?,
        tools: tools.0,
        steps: steps.0,
        tags: tags.0,
        challenge: row.try_get("challenge")?,
        solution: row.try_get("solution")?,
        impact: row.try_get("impact")?,
        is_recommended: row.try_get("is_recommended")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn view_from_row(row: &SqliteRow) -> Result<CaseStudyView, DatabaseError> {
    Ok(CaseStudyView {
        case_study: case_study_from_row(row)?,
        author_name: row.try_get("author_name")?,
        author_avatar: row.try_get("author_avatar")?,
        favorite_count: row.try_get("favorite_count")?,
        report_count: row.try_get("report_count")?,
        is_favorite: row.try_get("is_favorite")?,
        is_reported: row.try_get("is_reported")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestApp, draft};

    #[tokio::test]
    async fn test_create_and_read_back() {
        let app = TestApp::new().await;
        let author = app.user("author").await;
        let repo = &app.state.case_study_repository;

        let mut input = draft("Prompt chaining", Category::Prompt);
        input.tools = vec!["ChatGPT".to_string(), "Zapier".to_string()];
        input.tags = vec!["llm".to_string()];
        let created = repo.create(author.id, &input).await.unwrap();

        let loaded = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.tools, vec!["ChatGPT".to_string(), "Zapier".to_string()]);
        assert_eq!(loaded.category, Category::Prompt);
        assert!(!loaded.is_recommended);

        let view = repo.get_view(created.id, None).await.unwrap().unwrap();
        assert_eq!(view.author_name.as_deref(), Some("author"));
        assert_eq!(view.favorite_count, 0);
        assert!(!view.is_favorite);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_filters_by_category() {
        let app = TestApp::new().await;
        let author = app.user("author").await;
        let repo = &app.state.case_study_repository;

        let first = repo.create(author.id, &draft("first", Category::Prompt)).await.unwrap();
        let second = repo.create(author.id, &draft("second", Category::Business)).await.unwrap();

        let all = repo.list(None, None).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|v| v.case_study.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let prompts = repo.list(None, Some(Category::Prompt)).await.unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].case_study.id, first.id);
    }

    #[tokio::test]
    async fn test_toggle_favorite_flips_state() {
        let app = TestApp::new().await;
        let author = app.user("author").await;
        let reader = app.user("reader").await;
        let repo = &app.state.case_study_repository;
        let post = repo.create(author.id, &draft("x", Category::Tools)).await.unwrap();

        assert_eq!(
            repo.toggle_favorite(reader.id, post.id).await.unwrap(),
            FavoriteToggle::Added
        );
        assert_eq!(repo.favorite_count(post.id).await.unwrap(), 1);

        let favorites = repo.list_favorites(reader.id).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert!(favorites[0].is_favorite);

        assert_eq!(
            repo.toggle_favorite(reader.id, post.id).await.unwrap(),
            FavoriteToggle::Removed
        );
        assert_eq!(repo.favorite_count(post.id).await.unwrap(), 0);
        assert!(repo.list_favorites(reader.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_is_recorded_once() {
        let app = TestApp::new().await;
        let author = app.user("author").await;
        let reader = app.user("reader").await;
        let repo = &app.state.case_study_repository;
        let post = repo.create(author.id, &draft("x", Category::Tools)).await.unwrap();

        assert_eq!(
            repo.report(reader.id, post.id).await.unwrap(),
            ReportOutcome::Reported
        );
        assert_eq!(
            repo.report(reader.id, post.id).await.unwrap(),
            ReportOutcome::AlreadyReported
        );
        assert_eq!(repo.report_count(post.id).await.unwrap(), 1);

        let view = repo.get_view(post.id, Some(reader.id)).await.unwrap().unwrap();
        assert!(view.is_reported);
        assert_eq!(view.report_count, 1);
    }

    #[tokio::test]
    async fn test_delete_removes_favorites_and_reports() {
        let app = TestApp::new().await;
        let author = app.user("author").await;
        let reader = app.user("reader").await;
        let repo = &app.state.case_study_repository;
        let post = repo.create(author.id, &draft("x", Category::Automation)).await.unwrap();

        repo.toggle_favorite(reader.id, post.id).await.unwrap();
        repo.report(reader.id, post.id).await.unwrap();

        assert!(repo.delete(post.id).await.unwrap());
        assert!(!repo.delete(post.id).await.unwrap());

        let orphans: i64 = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM favorites) + (SELECT COUNT(*) FROM reports)",
        )
        .fetch_one(&app.state.db_pool)
        .await
        .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_moderation_list_puts_most_reported_first() {
        let app = TestApp::new().await;
        let author = app.user("author").await;
        let admin = app.admin("admin").await;
        let a = app.user("a").await;
        let b = app.user("b").await;
        let repo = &app.state.case_study_repository;

        let quiet = repo.create(author.id, &draft("quiet", Category::Prompt)).await.unwrap();
        let noisy = repo.create(author.id, &draft("noisy", Category::Prompt)).await.unwrap();
        let older_noisy = repo.create(author.id, &draft("older", Category::Prompt)).await.unwrap();
        repo.report(a.id, noisy.id).await.unwrap();
        repo.report(b.id, noisy.id).await.unwrap();
        repo.report(a.id, older_noisy.id).await.unwrap();

        let ids: Vec<i64> = repo
            .list_for_moderation(admin.id)
            .await
            .unwrap()
            .iter()
            .map(|v| v.case_study.id)
            .collect();
        assert_eq!(ids, vec![noisy.id, older_noisy.id, quiet.id]);
    }

    #[tokio::test]
    async fn test_set_recommended() {
        let app = TestApp::new().await;
        let author = app.user("author").await;
        let repo = &app.state.case_study_repository;
        let post = repo.create(author.id, &draft("x", Category::Prompt)).await.unwrap();

        let flagged = repo.set_recommended(post.id, true).await.unwrap().unwrap();
        assert!(flagged.is_recommended);
        assert!(repo.set_recommended(404, true).await.unwrap().is_none());
    }
}
