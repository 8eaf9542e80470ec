//! File Tracker using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    tracker::{Claim, FileTracker, TrackState, TrackedFile},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use tracing::debug;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS file_tracker (
        path TEXT PRIMARY KEY,
        media_item_id TEXT,
        state TEXT NOT NULL,
        claimed INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL
    )
"#;

/// SQLite-backed idempotency ledger
///
/// Every operation is a single SQL statement or transaction, so concurrent
/// workers never observe a half-written entry. `claim` hands a path to one
/// caller at a time and `mark_tracked` reports exactly one winner.
///
/// Claims belong to the process that opened the ledger: opening it clears
/// claims left behind by a process that exited mid-upload.
pub struct SqliteFileTracker {
    pool: SqlitePool,
}

impl SqliteFileTracker {
    /// Open (or create) the ledger at `db_path`
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to open tracker: {}", e)))?;

        let tracker = Self { pool };
        tracker.initialize().await?;
        debug!(path = ?db_path, "Initialized file tracker");

        Ok(tracker)
    }

    /// Create an in-memory ledger (for testing)
    pub async fn in_memory() -> Result<Self> {
        // A single connection: every pooled in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to open tracker: {}", e)))?;

        let tracker = Self { pool };
        tracker.initialize().await?;
        Ok(tracker)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to create table: {}", e)))?;

        let stale = self.release_claims(None).await?;
        if stale > 0 {
            debug!(entries = stale, "Released stale claims");
        }
        Ok(())
    }

    /// Drop claims on `path`, or on every path when `None`
    ///
    /// Entries that never got past `Pending` are removed.
    async fn release_claims(&self, path: Option<String>) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            BridgeError::DatabaseError(format!("Failed to begin transaction: {}", e))
        })?;

        let removed = sqlx::query(
            "DELETE FROM file_tracker WHERE claimed = 1 AND state = ?1 AND (?2 IS NULL OR path = ?2)",
        )
        .bind(TrackState::Pending.as_str())
        .bind(path.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| BridgeError::DatabaseError(e.to_string()))?
        .rows_affected();

        let released = sqlx::query(
            "UPDATE file_tracker SET claimed = 0 WHERE claimed = 1 AND (?1 IS NULL OR path = ?1)",
        )
        .bind(path.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| BridgeError::DatabaseError(e.to_string()))?
        .rows_affected();

        tx.commit()
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to commit: {}", e)))?;
        Ok(removed + released)
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[async_trait]
impl FileTracker for SqliteFileTracker {
    async fn lookup(&self, path: &Path) -> Result<Option<TrackedFile>> {
        let row = sqlx::query("SELECT media_item_id, state FROM file_tracker WHERE path = ?")
            .bind(Self::key(path))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(TrackedFile {
                media_item_id: row.get("media_item_id"),
                state: row.get::<String, _>("state").parse()?,
            })),
            None => Ok(None),
        }
    }

    async fn claim(&self, path: &Path) -> Result<Claim> {
        let row = sqlx::query(
            r#"
            INSERT INTO file_tracker (path, media_item_id, state, claimed, updated_at)
            VALUES (?, NULL, ?, 1, ?)
            ON CONFLICT(path) DO UPDATE SET
                claimed = 1,
                updated_at = excluded.updated_at
            WHERE file_tracker.claimed = 0 AND file_tracker.state != 'completed'
            RETURNING media_item_id
            "#,
        )
        .bind(Self::key(path))
        .bind(TrackState::Pending.as_str())
        .bind(Self::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(e.to_string()))?;

        if let Some(row) = row {
            return Ok(Claim::Acquired {
                media_item_id: row.get("media_item_id"),
            });
        }

        match self.lookup(path).await? {
            Some(entry) if entry.state == TrackState::Completed => Ok(Claim::Completed),
            _ => Ok(Claim::Busy),
        }
    }

    async fn release(&self, path: &Path) -> Result<()> {
        self.release_claims(Some(Self::key(path))).await?;
        debug!(path = ?path, "Released claim");
        Ok(())
    }

    async fn record_upload(&self, path: &Path, media_item_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO file_tracker (path, media_item_id, state, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                media_item_id = excluded.media_item_id,
                state = excluded.state,
                updated_at = excluded.updated_at
            WHERE file_tracker.state != 'completed'
            "#,
        )
        .bind(Self::key(path))
        .bind(media_item_id)
        .bind(TrackState::Uploaded.as_str())
        .bind(Self::now())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(e.to_string()))?;

        debug!(path = ?path, media_item_id = media_item_id, "Recorded upload");
        Ok(())
    }

    async fn mark_tracked(&self, path: &Path) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE file_tracker SET state = ?, claimed = 0, updated_at = ? WHERE path = ? AND state != ?",
        )
        .bind(TrackState::Completed.as_str())
        .bind(Self::now())
        .bind(Self::key(path))
        .bind(TrackState::Completed.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        match self.lookup(path).await? {
            Some(_) => Ok(false),
            None => Err(BridgeError::NotFound(format!(
                "No upload recorded for {}",
                path.display()
            ))),
        }
    }
}
