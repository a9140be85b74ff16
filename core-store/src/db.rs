//! # Database Connection Pool
//!
//! SQLite pool construction for the progress store.
//!
//! ## Features
//!
//! - **WAL Mode**: enabled for better concurrency (multiple readers, one writer)
//! - **Foreign Keys**: enforced for referential integrity
//! - **Busy Timeout**: tuned for concurrent workers committing progress
//! - **Create If Missing**: the database file is created on first run
//!
//! ## Testing
//!
//! Tests use an in-memory database:
//!
//! ```rust,ignore
//! let pool = create_test_pool().await?;
//! ```

use crate::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Database configuration for the SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL, `sqlite:{path}` or `sqlite::memory:`
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,

    /// How long a connection waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    /// Create a configuration for the given database file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();

        Self {
            database_url: format!("sqlite:{}", path.display()),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Create a configuration for an in-memory database (for tests).
    ///
    /// A single connection is used so every query sees the same data.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, count: u32) -> Self {
        self.max_connections = count;
        self
    }
}

/// Create a connection pool from the given configuration.
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool> {
    debug!("Creating database pool for {}", config.database_url);

    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await?;

    info!("Database pool ready ({})", config.database_url);

    Ok(pool)
}

/// Create an in-memory pool for tests.
pub async fn create_test_pool() -> Result<SqlitePool> {
    create_pool(DatabaseConfig::in_memory()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builds_sqlite_url() {
        let config = DatabaseConfig::new("/tmp/progress.db");
        assert_eq!(config.database_url, "sqlite:/tmp/progress.db");
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_in_memory_config_uses_single_connection() {
        let config = DatabaseConfig::in_memory();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, 1);
    }

    #[tokio::test]
    async fn test_create_test_pool() {
        let pool = create_test_pool().await.expect("pool should open");
        let row: (i64,) = sqlx::query_as("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query should run");
        assert_eq!(row.0, 1);
    }
}
