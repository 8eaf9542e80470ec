//! # Upload Coordinator
//!
//! Drives one `push` run across every configured job.
//!
//! ## Overview
//!
//! The coordinator turns each job's source folder into [`UploadJob`]s and
//! runs them on a single [`WorkerPool`]. Collaborators are shared per
//! account: one [`PhotoService`] session and one [`AlbumResolver`], so album
//! creation stays serialized per account however many workers run.
//!
//! ## Workflow
//!
//! 1. Open a session for every distinct account. A failure here aborts the
//!    run before any upload starts.
//! 2. For each job in turn: scan the folder, submit one upload per file, then
//!    wait for exactly that many results before the next job is scanned. A
//!    scan failure is logged and the remaining jobs still run.
//! 3. Stop the pool and report the totals.
//!
//! Draining each job before the next keeps overlapping source folders safe:
//! a file seen again by a later job is already tracked as completed.
//! Cancellation stops scanning new folders; jobs already queued observe the
//! token themselves and finish as cancelled.

use async_trait::async_trait;
use bridge_traits::{photos::PhotoService, storage::FileSystemAccess, tracker::FileTracker};
use core_runtime::config::JobConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::albums::AlbumResolver;
use crate::error::{Result, SyncError};
use crate::pool::{JobResult, WorkerPool};
use crate::scan::FolderScanner;
use crate::upload::{UploadContext, UploadJob, UploadOutcome};

/// Default number of concurrent uploads
pub const DEFAULT_UPLOAD_WORKERS: usize = 5;

/// Opens an authenticated remote session for an account
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn photo_service(&self, account: &str) -> Result<Arc<dyn PhotoService>>;
}

/// Upload coordinator configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Number of uploads running at the same time
    pub worker_count: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_UPLOAD_WORKERS,
        }
    }
}

/// Totals for one job or one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Uploads handed to the pool
    pub submitted: usize,
    /// Uploads that finished, including files already uploaded earlier
    pub succeeded: usize,
    /// Subset of `succeeded` that needed no work: already completed, or held
    /// by another job of the same run
    pub already_uploaded: usize,
    /// Uploads that ended with an error other than cancellation
    pub failed: usize,
    /// Uploads stopped by cancellation
    pub cancelled: usize,
    /// Jobs whose folder could not be scanned
    pub failed_folders: usize,
}

impl UploadSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.failed_folders > 0
    }

    fn add(&mut self, other: &UploadSummary) {
        self.submitted += other.submitted;
        self.succeeded += other.succeeded;
        self.already_uploaded += other.already_uploaded;
        self.failed += other.failed;
        self.cancelled += other.cancelled;
        self.failed_folders += other.failed_folders;
    }

    fn record(&mut self, result: JobResult<UploadOutcome>) {
        match result.outcome {
            Ok(UploadOutcome::AlreadyUploaded) | Ok(UploadOutcome::ClaimedElsewhere) => {
                self.succeeded += 1;
                self.already_uploaded += 1;
            }
            Ok(UploadOutcome::Uploaded { .. }) => self.succeeded += 1,
            Err(SyncError::Cancelled) => self.cancelled += 1,
            Err(e) => {
                error!(file = %result.label, error = %e, "Upload failed");
                self.failed += 1;
            }
        }
    }
}

struct AccountContext {
    photos: Arc<dyn PhotoService>,
    albums: Arc<AlbumResolver>,
}

pub struct UploadCoordinator {
    sessions: Arc<dyn SessionFactory>,
    scanner: Arc<dyn FolderScanner>,
    tracker: Arc<dyn FileTracker>,
    file_system: Arc<dyn FileSystemAccess>,
    config: UploadConfig,
}

impl UploadCoordinator {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        scanner: Arc<dyn FolderScanner>,
        tracker: Arc<dyn FileTracker>,
        file_system: Arc<dyn FileSystemAccess>,
        config: UploadConfig,
    ) -> Self {
        Self {
            sessions,
            scanner,
            tracker,
            file_system,
            config,
        }
    }

    /// Upload every file selected by `jobs`
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Session`] when an account cannot be opened, or a
    /// pool error if results go missing. Per-file failures are counted in the
    /// summary instead.
    #[instrument(skip_all, fields(jobs = jobs.len(), workers = self.config.worker_count))]
    pub async fn run(&self, jobs: &[JobConfig], cancel: CancellationToken) -> Result<UploadSummary> {
        info!("Phase 1: Opening account sessions");
        let accounts = self.open_accounts(jobs).await?;

        let mut pool = WorkerPool::new(self.config.worker_count, cancel.clone());
        pool.start()?;
        let mut summary = UploadSummary::default();

        info!("Phase 2: Uploading source folders");
        for job in jobs {
            if cancel.is_cancelled() {
                warn!("Cancelled, skipping remaining folders");
                break;
            }
            let Some(account) = accounts.get(&job.account) else {
                continue;
            };

            let target = match self.run_target(job, account, &mut pool).await {
                Ok(target) => target,
                Err(e) => {
                    pool.stop().await?;
                    return Err(e);
                }
            };
            info!(
                folder = ?job.source_folder,
                submitted = target.submitted,
                succeeded = target.succeeded,
                already_uploaded = target.already_uploaded,
                failed = target.failed,
                cancelled = target.cancelled,
                "Folder finished"
            );
            summary.add(&target);
        }

        info!("Phase 3: Stopping workers");
        pool.stop().await?;

        info!(
            submitted = summary.submitted,
            succeeded = summary.succeeded,
            already_uploaded = summary.already_uploaded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            failed_folders = summary.failed_folders,
            "Upload run finished"
        );
        Ok(summary)
    }

    /// Scan one job's folder, submit its uploads and drain their results
    async fn run_target(
        &self,
        job: &JobConfig,
        account: &AccountContext,
        pool: &mut WorkerPool<UploadJob>,
    ) -> Result<UploadSummary> {
        let mut target = UploadSummary::default();

        let items = match self.scanner.scan(job).await {
            Ok(items) => items,
            Err(e) => {
                error!(folder = ?job.source_folder, error = %e, "Failed to scan source folder");
                target.failed_folders = 1;
                return Ok(target);
            }
        };
        info!(folder = ?job.source_folder, files = items.len(), "Submitting uploads");

        let context = UploadContext {
            photos: Arc::clone(&account.photos),
            albums: Arc::clone(&account.albums),
            tracker: Arc::clone(&self.tracker),
            file_system: Arc::clone(&self.file_system),
            delete_after_upload: job.delete_after_upload,
        };

        let mut submitted = 0;
        let mut rejected = 0;
        for item in items {
            match pool.submit(UploadJob::new(item, context.clone())).await {
                Ok(()) => submitted += 1,
                Err(e) => {
                    warn!(error = %e, "Failed to submit upload");
                    rejected += 1;
                }
            }
        }
        let submitted = submitted;

        for result in pool.collect_results(submitted).await? {
            target.record(result);
        }
        target.submitted = submitted;
        target.failed += rejected;
        Ok(target)
    }

    async fn open_accounts(&self, jobs: &[JobConfig]) -> Result<HashMap<String, AccountContext>> {
        let mut accounts = HashMap::new();

        for job in jobs {
            if accounts.contains_key(&job.account) {
                continue;
            }
            let photos = self.sessions.photo_service(&job.account).await?;
            let albums = Arc::new(AlbumResolver::new(Arc::clone(&photos)));
            accounts.insert(job.account.clone(), AccountContext { photos, albums });
        }

        Ok(accounts)
    }
}
