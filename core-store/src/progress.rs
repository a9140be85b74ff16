//! Progress repository trait and implementation
//!
//! One record per fully relocated source file. There is no in-progress
//! marker: a crash mid-file leaves nothing behind and the file is
//! retried from scratch on the next run. A record must only be written
//! after the physical move has succeeded, and a path with a Completed
//! record is never moved again.

use crate::error::{Result, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

/// Processing status of one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    /// The file was moved to its target path and committed.
    Completed,
}

impl ProgressStatus {
    fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::Completed => "completed",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "completed" => Ok(ProgressStatus::Completed),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// Durable record keyed by the original file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRecord {
    /// Original location, the stable identity key across runs
    pub file_path: String,
    pub status: ProgressStatus,
    /// Final location, set only when status is Completed
    pub target_path: Option<String>,
    /// Unix seconds at commit time
    pub completed_at: i64,
}

/// Durable mapping from source file path to processing outcome.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Create the schema if it does not exist.
    async fn initialize(&self) -> Result<()>;

    /// Fetch the record for `file_path`.
    ///
    /// # Returns
    /// - `Ok(Some(record))` when the file completed processing
    /// - `Ok(None)` when it has never completed
    async fn lookup(&self, file_path: &str) -> Result<Option<ProgressRecord>>;

    /// Upsert a Completed record.
    ///
    /// Must be called only after the physical move has succeeded; it is
    /// the last step of processing a file.
    async fn mark_completed(&self, file_path: &str, target_path: &str) -> Result<()>;

    /// Number of Completed records.
    async fn count_completed(&self) -> Result<i64>;
}

/// SQLite implementation of [`ProgressStore`].
pub struct SqliteProgressStore {
    pool: SqlitePool,
}

impl SqliteProgressStore {
    /// Create a new SQLite progress store over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &SqliteRow) -> Result<ProgressRecord> {
        let status: String = row.get("status");

        Ok(ProgressRecord {
            file_path: row.get("file_path"),
            status: ProgressStatus::parse(&status)?,
            target_path: row.get("target_path"),
            completed_at: row.get("completed_at"),
        })
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    #[instrument(skip(self))]
    async fn initialize(&self) -> Result<()> {
        debug!("Initializing progress store");

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS progress (
                file_path TEXT PRIMARY KEY NOT NULL,
                status TEXT NOT NULL,
                target_path TEXT,
                completed_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_progress_status ON progress(status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn lookup(&self, file_path: &str) -> Result<Option<ProgressRecord>> {
        let row = sqlx::query(
            "SELECT file_path, status, target_path, completed_at
             FROM progress WHERE file_path = ?",
        )
        .bind(file_path)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn mark_completed(&self, file_path: &str, target_path: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO progress (file_path, status, target_path, completed_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(file_path) DO UPDATE SET
                 status = excluded.status,
                 target_path = excluded.target_path,
                 completed_at = excluded.completed_at",
        )
        .bind(file_path)
        .bind(ProgressStatus::Completed.as_str())
        .bind(target_path)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        debug!(file_path, target_path, "Marked completed");

        Ok(())
    }

    async fn count_completed(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM progress WHERE status = ?")
            .bind(ProgressStatus::Completed.as_str())
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.get("n");
        Ok(count)
    }
}
