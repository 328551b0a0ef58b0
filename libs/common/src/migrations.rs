//! Versioned schema migrations
//!
//! The schema is described as an ordered list of additive steps. Each step
//! is applied at most once, inside its own transaction, and recorded in the
//! `schema_version` table. Running the migrator against an up-to-date store
//! does nothing, so every process calls [`run`] once at startup.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DatabaseError, DatabaseResult};

/// A single schema step.
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All schema steps, oldest first. Never edit a released step; append a new one.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "users, case studies and favorites",
        sql: r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    open_id TEXT NOT NULL UNIQUE,
    name TEXT,
    email TEXT,
    avatar_url TEXT,
    login_method TEXT,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    last_signed_in_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS case_studies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL CHECK (category IN ('prompt', 'automation', 'tools', 'business')),
    tools TEXT NOT NULL DEFAULT '[]',
    steps TEXT NOT NULL DEFAULT '[]',
    tags TEXT NOT NULL DEFAULT '[]',
    challenge TEXT NOT NULL DEFAULT '',
    solution TEXT NOT NULL DEFAULT '',
    impact TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_case_studies_user_id ON case_studies(user_id);
CREATE INDEX IF NOT EXISTS idx_case_studies_category ON case_studies(category);
CREATE INDEX IF NOT EXISTS idx_case_studies_created_at ON case_studies(created_at DESC);

CREATE TABLE IF NOT EXISTS favorites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    case_study_id INTEGER NOT NULL REFERENCES case_studies(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    UNIQUE (user_id, case_study_id)
);

CREATE INDEX IF NOT EXISTS idx_favorites_case_study_id ON favorites(case_study_id);
"#,
    },
    Migration {
        version: 2,
        description: "post reports",
        sql: r#"
CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    case_study_id INTEGER NOT NULL REFERENCES case_studies(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    UNIQUE (user_id, case_study_id)
);

CREATE INDEX IF NOT EXISTS idx_reports_case_study_id ON reports(case_study_id);
"#,
    },
    Migration {
        version: 3,
        description: "recommended flag on case studies",
        sql: r#"
ALTER TABLE case_studies ADD COLUMN is_recommended INTEGER NOT NULL DEFAULT 0;
"#,
    },
    Migration {
        version: 4,
        description: "quest board",
        sql: r#"
CREATE TABLE IF NOT EXISTS quests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'open',
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_quests_created_at ON quests(created_at DESC);

CREATE TABLE IF NOT EXISTS quest_answers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quest_id INTEGER NOT NULL REFERENCES quests(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_quest_answers_quest_id ON quest_answers(quest_id, created_at);
"#,
    },
    Migration {
        version: 5,
        description: "quest outcomes and legacy status backfill",
        sql: r#"
ALTER TABLE quests ADD COLUMN solved_answer_id INTEGER REFERENCES quest_answers(id) ON DELETE SET NULL;
ALTER TABLE quests ADD COLUMN solver_user_id INTEGER REFERENCES users(id) ON DELETE SET NULL;
ALTER TABLE quests ADD COLUMN closed_at TEXT;

UPDATE quests
SET status = 'unsolved',
    closed_at = COALESCE(closed_at, updated_at)
WHERE status = 'closed';

CREATE INDEX IF NOT EXISTS idx_quests_status ON quests(status);
"#,
    },
];

/// Latest schema version known to this build.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Version currently recorded in the store, 0 for a fresh database.
pub async fn current_version(pool: &SqlitePool) -> DatabaseResult<i64> {
    ensure_version_table(pool).await?;

    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::Query)?;

    Ok(version.unwrap_or(0))
}

/// Apply every pending migration.
pub async fn run(pool: &SqlitePool) -> DatabaseResult<i64> {
    run_until(pool, latest_version()).await
}

/// Apply pending migrations up to and including `target`.
///
/// Returns the version the store is at afterwards.
pub async fn run_until(pool: &SqlitePool, target: i64) -> DatabaseResult<i64> {
    let current = current_version(pool).await?;

    if current > latest_version() {
        return Err(DatabaseError::Migration(format!(
            "store is at schema version {} but this build only knows up to {}",
            current,
            latest_version()
        )));
    }

    let mut applied = current;
    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current && m.version <= target)
    {
        info!(
            "Applying schema migration {}: {}",
            migration.version, migration.description
        );

        let mut tx = pool.begin().await.map_err(DatabaseError::Connection)?;

        // Claiming the version first takes the write lock, so a second
        // process starting at the same time sees the step as done.
        let claimed = sqlx::query(
            "INSERT OR IGNORE INTO schema_version (version, description, applied_at) VALUES (?1, ?2, ?3)",
        )
        .bind(migration.version)
        .bind(migration.description)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::Query)?;

        if claimed.rows_affected() == 0 {
            info!(
                "Schema migration {} was applied concurrently",
                migration.version
            );
            tx.rollback().await.map_err(DatabaseError::Query)?;
            applied = migration.version;
            continue;
        }

        sqlx::raw_sql(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DatabaseError::Migration(format!("step {} failed: {}", migration.version, e))
            })?;

        tx.commit().await.map_err(DatabaseError::Query)?;
        applied = migration.version;
    }

    if applied == current {
        info!("Schema is up to date at version {}", current);
    }

    Ok(applied)
}

async fn ensure_version_table(pool: &SqlitePool) -> DatabaseResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(DatabaseError::Query)?;

    Ok(())
}
