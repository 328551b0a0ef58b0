//! User accounts
//!
//! Users are created on their first OAuth sign-in and refreshed on every
//! later one. Both services read this table, so the model and repository
//! live here rather than in either service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::{DatabaseError, DatabaseResult};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub login_method: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_signed_in_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Identity returned by the OAuth portal, upserted on sign-in
#[derive(Debug, Clone, Default)]
pub struct UpsertUser {
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub login_method: Option<String>,
    /// Promote the account to admin (owner allow-list hit)
    pub promote_to_admin: bool,
}

const USER_COLUMNS: &str =
    "id, open_id, name, email, avatar_url, login_method, role, created_at, updated_at, last_signed_in_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a user after sign-in.
    ///
    /// A name the user already has is kept, so a self-chosen display name
    /// survives later sign-ins. The role is only ever raised to admin here,
    /// never lowered.
    pub async fn upsert(&self, user: &UpsertUser) -> DatabaseResult<User> {
        info!("Upserting user: {}", user.open_id);

        let now = Utc::now();
        let initial_role = if user.promote_to_admin {
            Role::Admin
        } else {
            Role::User
        };

        let sql = format!(
            r#"
            INSERT INTO users (open_id, name, email, avatar_url, login_method, role,
                               created_at, updated_at, last_signed_in_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?7)
            ON CONFLICT(open_id) DO UPDATE SET
                name = COALESCE(users.name, excluded.name),
                email = COALESCE(excluded.email, users.email),
                avatar_url = COALESCE(excluded.avatar_url, users.avatar_url),
                login_method = COALESCE(excluded.login_method, users.login_method),
                role = CASE WHEN ?8 THEN 'admin' ELSE users.role END,
                updated_at = excluded.updated_at,
                last_signed_in_at = excluded.last_signed_in_at
            RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(&user.open_id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.avatar_url)
            .bind(&user.login_method)
            .bind(initial_role.as_str())
            .bind(now)
            .bind(user.promote_to_admin)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        user_from_row(&row)
    }

    /// Find a user by external open id
    pub async fn find_by_open_id(&self, open_id: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE open_id = ?1");

        let row = sqlx::query(&sql)
            .bind(open_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Change a user's display name
    pub async fn update_name(&self, id: i64, name: &str) -> DatabaseResult<Option<User>> {
        info!("Updating display name for user {}", id);

        let sql = format!(
            "UPDATE users SET name = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(name)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Delete a user and, through cascades, everything they own
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn user_from_row(row: &SqliteRow) -> DatabaseResult<User> {
    let role: String = row.try_get("role")?;
    let role = role.parse().map_err(|detail| DatabaseError::Corrupt {
        table: "users",
        detail,
    })?;

    Ok(User {
        id: row.try_get("id")?,
        open_id: row.try_get("open_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        avatar_url: row.try_get("avatar_url")?,
        login_method: row.try_get("login_method")?,
        role,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        last_signed_in_at: row.try_get("last_signed_in_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{database::init_memory_pool, migrations};

    async fn repository() -> UserRepository {
        let pool = init_memory_pool().await.unwrap();
        migrations::run(&pool).await.unwrap();
        UserRepository::new(pool)
    }

    fn identity(open_id: &str, name: &str) -> UpsertUser {
        UpsertUser {
            open_id: open_id.to_string(),
            name: Some(name.to_string()),
            email: Some(format!("{}@example.com", open_id)),
            login_method: Some("google".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_refreshes() {
        let repo = repository().await;

        let first = repo.upsert(&identity("open-a", "Alice")).await.unwrap();
        assert_eq!(first.role, Role::User);
        assert_eq!(first.name.as_deref(), Some("Alice"));

        let mut again = identity("open-a", "Portal Name");
        again.avatar_url = Some("https://cdn.example.com/a.png".to_string());
        let second = repo.upsert(&again).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.name.as_deref(), Some("Alice"));
        assert_eq!(
            second.avatar_url.as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert!(second.last_signed_in_at >= first.last_signed_in_at);
    }

    #[tokio::test]
    async fn test_owner_is_promoted_and_never_demoted() {
        let repo = repository().await;

        let mut owner = identity("owner", "Olga");
        owner.promote_to_admin = true;
        let created = repo.upsert(&owner).await.unwrap();
        assert!(created.is_admin());

        owner.promote_to_admin = false;
        let refreshed = repo.upsert(&owner).await.unwrap();
        assert!(refreshed.is_admin());

        let plain = repo.upsert(&identity("plain", "Pat")).await.unwrap();
        let mut promoted = identity("plain", "Pat");
        promoted.promote_to_admin = true;
        assert!(!plain.is_admin());
        assert!(repo.upsert(&promoted).await.unwrap().is_admin());
    }

    #[tokio::test]
    async fn test_find_and_rename() {
        let repo = repository().await;
        let user = repo.upsert(&identity("open-b", "Bob")).await.unwrap();

        let by_open_id = repo.find_by_open_id("open-b").await.unwrap().unwrap();
        assert_eq!(by_open_id.id, user.id);
        assert!(repo.find_by_open_id("missing").await.unwrap().is_none());

        let renamed = repo.update_name(user.id, "Robert").await.unwrap().unwrap();
        assert_eq!(renamed.name.as_deref(), Some("Robert"));
        assert_eq!(
            repo.find_by_id(user.id).await.unwrap().unwrap().name.as_deref(),
            Some("Robert")
        );
        assert!(repo.update_name(9999, "Nobody").await.unwrap().is_none());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("root".parse::<Role>().is_err());
    }
}
