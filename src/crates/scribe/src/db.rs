//! Database connection and schema management.
//!
//! Wraps a SQLite connection pool and the embedded migrations under
//! `./migrations`. The workflow registry is the only writer; everything else
//! reaches the pool through it.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::error::{Result, ScribeError};

/// Type alias for the database connection pool.
pub type DatabasePool = SqlitePool;

/// Database connection wrapper.
#[derive(Clone, Debug)]
pub struct Database {
    pool: Arc<DatabasePool>,
}

impl Database {
    /// Open (creating if missing) the SQLite database at the given path.
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let path = database_path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ScribeError::Database(format!("failed to create database directory: {}", e))
                })?;
            }
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| ScribeError::Database("invalid database path".to_string()))?;

        debug!(path = %path.display(), "Connecting to database");
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path_str))
            .map_err(|e| ScribeError::Database(format!("invalid database url: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ScribeError::Database(format!("failed to connect to database: {}", e)))?;

        info!(path = %path.display(), "Database connection established");
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Open the database and run all migrations.
    pub async fn initialize<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let db = Self::new(database_path).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Run the embedded migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
            .map_err(|e| ScribeError::Database(format!("migration failed: {}", e)))?;
        Ok(())
    }

    /// Perform a health check by running a trivial query.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| ScribeError::Database(format!("health check failed: {}", e)))?;
        Ok(())
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// In-memory database with migrations applied, for tests.
    ///
    /// A SQLite in-memory database exists per connection, so the pool is
    /// pinned to a single connection to keep one coherent database.
    pub async fn test_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| ScribeError::Database(format!("failed to open in-memory database: {}", e)))?;

        let db = Self {
            pool: Arc::new(pool),
        };
        db.run_migrations().await?;
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_in_memory_database_health() {
        let db = Database::test_in_memory().await.unwrap();
        db.health_check().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_migrations_create_workflows_table() {
        let db = Database::test_in_memory().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workflows")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);

        db.close().await;
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::test_in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        db.health_check().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_file_database_created_with_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("scribe.db");

        let db = Database::initialize(&path).await.unwrap();
        db.health_check().await.unwrap();
        assert!(path.exists());
        db.close().await;
    }
}
