//! File Tracker Abstraction
//!
//! Idempotency ledger for local files. A file moves through these recorded
//! states:
//!
//! ```text
//! (absent) ──claim──> Pending ──record_upload──> Uploaded ──mark_tracked──> Completed
//! ```
//!
//! `Uploaded` remembers the remote media item so that an interrupted run can
//! finish album association without uploading the bytes again.
//!
//! Work on a path is guarded by a claim. [`FileTracker::claim`] is the single
//! atomic check-and-mark: at most one caller holds a path at a time, and a
//! completed path is never handed out again.

use async_trait::async_trait;
use std::path::Path;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Recorded state of a local file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Claimed by a worker; nothing is on the remote service yet
    Pending,
    /// Bytes are on the remote service; later steps have not finished
    Uploaded,
    /// Every step of the upload finished
    Completed,
}

impl TrackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploaded => "uploaded",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for TrackState {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "uploaded" => Ok(Self::Uploaded),
            "completed" => Ok(Self::Completed),
            _ => Err(BridgeError::DatabaseError(format!(
                "Invalid track state: {}",
                s
            ))),
        }
    }
}

/// Ledger entry for one local path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    /// Remote media item, known once the bytes are uploaded
    pub media_item_id: Option<String>,
    pub state: TrackState,
}

/// Answer to [`FileTracker::claim`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The caller now owns the path. `media_item_id` is set when an earlier
    /// run already uploaded the bytes.
    Acquired { media_item_id: Option<String> },
    /// The path finished in an earlier run
    Completed,
    /// Another caller holds the path
    Busy,
}

/// Shared idempotency ledger
///
/// Called concurrently from every upload worker. Each method must be atomic
/// on its own; callers never hold a lock across two calls.
#[async_trait]
pub trait FileTracker: Send + Sync {
    /// Look up the ledger entry for `path`
    async fn lookup(&self, path: &Path) -> Result<Option<TrackedFile>>;

    /// Take exclusive ownership of `path` unless it is completed or held
    async fn claim(&self, path: &Path) -> Result<Claim>;

    /// Give up a claim after a failure
    ///
    /// A `Pending` entry is removed; an `Uploaded` entry keeps its media item
    /// so the next claim resumes from it.
    async fn release(&self, path: &Path) -> Result<()>;

    /// Record that `path` was uploaded as `media_item_id`
    ///
    /// Never downgrades a `Completed` entry.
    async fn record_upload(&self, path: &Path, media_item_id: &str) -> Result<()>;

    /// Mark `path` as fully processed and drop its claim
    ///
    /// Returns `true` when this call performed the transition and `false` when
    /// the entry was already `Completed`. Fails with `NotFound` when nothing
    /// was recorded for `path`.
    async fn mark_tracked(&self, path: &Path) -> Result<bool>;

    /// Check whether `path` is fully processed
    async fn is_tracked(&self, path: &Path) -> Result<bool> {
        Ok(matches!(
            self.lookup(path).await?,
            Some(TrackedFile {
                state: TrackState::Completed,
                ..
            })
        ))
    }
}
