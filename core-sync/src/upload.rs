//! # Upload Job
//!
//! One local file moving to the remote library.
//!
//! ## Steps
//!
//! 1. Claim the path in the [`FileTracker`]. A completed path ends the job
//!    with [`UploadOutcome::AlreadyUploaded`]; a path another job holds ends it
//!    with [`UploadOutcome::ClaimedElsewhere`]. A claim on an `Uploaded`
//!    entry resumes at step 3 with the recorded media item.
//! 2. Upload the bytes and record the media item as `Uploaded`.
//! 3. If an album is configured, resolve it through the account's
//!    [`AlbumResolver`] and add the media item to it.
//! 4. If configured, delete the local file.
//! 5. Mark the file `Completed`.
//!
//! Cancellation is checked before steps 2, 3 and 4. Any failure releases the
//! claim. A failure after step 2 leaves the `Uploaded` entry in place, so the
//! next run neither re-uploads the bytes nor loses the album association.

use async_trait::async_trait;
use bridge_traits::{
    photos::PhotoService,
    storage::FileSystemAccess,
    tracker::{Claim, FileTracker},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::albums::AlbumResolver;
use crate::error::{Result, SyncError};
use crate::pool::{Job, JobId};
use crate::scan::UploadItem;

/// How an upload job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The tracker already had the file as completed; nothing was sent
    AlreadyUploaded,
    /// Another job of this run holds the file; nothing was sent
    ClaimedElsewhere,
    /// Every step finished for this media item
    Uploaded { media_item_id: String },
}

/// Collaborators shared by every job of one target
#[derive(Clone)]
pub struct UploadContext {
    pub photos: Arc<dyn PhotoService>,
    pub albums: Arc<AlbumResolver>,
    pub tracker: Arc<dyn FileTracker>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub delete_after_upload: bool,
}

pub struct UploadJob {
    id: JobId,
    path: PathBuf,
    album_name: Option<String>,
    context: UploadContext,
}

impl UploadJob {
    pub fn new(item: UploadItem, context: UploadContext) -> Self {
        Self {
            id: JobId::new(),
            path: item.path,
            album_name: item.album_name,
            context,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn album_name(&self) -> Option<&str> {
        self.album_name.as_deref()
    }

    // ========================================================================
    // Steps
    // ========================================================================

    async fn upload(&self, cancel: &CancellationToken) -> Result<String> {
        ensure_not_cancelled(cancel)?;

        let media_item = self.context.photos.upload_file(&self.path).await?;
        self.context
            .tracker
            .record_upload(&self.path, &media_item.id)
            .await?;

        debug!(media_item_id = %media_item.id, "Uploaded file");
        Ok(media_item.id)
    }

    async fn add_to_album(&self, media_item_id: &str, cancel: &CancellationToken) -> Result<()> {
        let Some(title) = self.album_name.as_deref() else {
            return Ok(());
        };
        ensure_not_cancelled(cancel)?;

        let album_id = self.context.albums.get_or_create(title).await?;
        self.context
            .photos
            .batch_add_media_items(&album_id, &[media_item_id.to_string()])
            .await?;

        debug!(album = %title, album_id = %album_id, "Added to album");
        Ok(())
    }

    async fn delete_local(&self, cancel: &CancellationToken) -> Result<()> {
        if !self.context.delete_after_upload {
            return Ok(());
        }
        ensure_not_cancelled(cancel)?;

        self.context.file_system.delete_file(&self.path).await?;
        debug!("Deleted local file");
        Ok(())
    }

    /// Steps 2 to 5, run while holding the claim
    async fn process(&self, resumed: Option<String>, cancel: &CancellationToken) -> Result<String> {
        let media_item_id = match resumed {
            Some(id) => {
                debug!(media_item_id = %id, "Resuming previous upload");
                id
            }
            None => self.upload(cancel).await?,
        };

        self.add_to_album(&media_item_id, cancel).await?;
        self.delete_local(cancel).await?;
        self.context.tracker.mark_tracked(&self.path).await?;
        Ok(media_item_id)
    }
}

#[async_trait]
impl Job for UploadJob {
    type Output = UploadOutcome;

    fn id(&self) -> JobId {
        self.id
    }

    fn label(&self) -> String {
        self.path.display().to_string()
    }

    #[instrument(skip(self, cancel), fields(path = %self.path.display()))]
    async fn execute(&self, cancel: &CancellationToken) -> Result<UploadOutcome> {
        let resumed = match self.context.tracker.claim(&self.path).await? {
            Claim::Completed => {
                debug!("Already uploaded");
                return Ok(UploadOutcome::AlreadyUploaded);
            }
            Claim::Busy => {
                debug!("Claimed by another job");
                return Ok(UploadOutcome::ClaimedElsewhere);
            }
            Claim::Acquired { media_item_id } => media_item_id,
        };

        match self.process(resumed, cancel).await {
            Ok(media_item_id) => {
                info!(media_item_id = %media_item_id, "Upload completed");
                Ok(UploadOutcome::Uploaded { media_item_id })
            }
            Err(e) => {
                if let Err(release_error) = self.context.tracker.release(&self.path).await {
                    warn!(error = %release_error, "Failed to release claim");
                }
                Err(e)
            }
        }
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(SyncError::Cancelled)
    } else {
        Ok(())
    }
}
