//! Custom error types for the common library
//!
//! This module defines the store error type shared by every repository in the
//! workspace.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A stored value could not be mapped back into its domain type
    #[error("Corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
                DatabaseError::Connection(err)
            }
            other => DatabaseError::Query(other),
        }
    }
}

impl DatabaseError {
    /// True when the store itself could not be reached, as opposed to a bad query
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DatabaseError::Connection(_))
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connection_failures_are_unavailable() {
        assert!(DatabaseError::from(SqlxError::PoolClosed).is_unavailable());
        assert!(DatabaseError::from(SqlxError::PoolTimedOut).is_unavailable());

        assert!(!DatabaseError::from(SqlxError::RowNotFound).is_unavailable());
        assert!(!DatabaseError::from(SqlxError::ColumnNotFound("title".to_string())).is_unavailable());
        assert!(!DatabaseError::Migration("v3".to_string()).is_unavailable());
    }

    #[tokio::test]
    async fn test_malformed_query_is_not_unavailable() {
        let pool = crate::database::init_memory_pool().await.unwrap();

        let err = sqlx::query("SELEC id FROM nowhere")
            .execute(&pool)
            .await
            .unwrap_err();
        let err = DatabaseError::from(err);

        assert!(matches!(err, DatabaseError::Query(_)));
        assert!(!err.is_unavailable());
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let pool = crate::database::init_memory_pool().await.unwrap();
        pool.close().await;

        let err = sqlx::query("SELECT 1").execute(&pool).await.unwrap_err();
        assert!(DatabaseError::from(err).is_unavailable());
    }
}
