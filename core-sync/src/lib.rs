//! # Photo Sync Core
//!
//! Bounded concurrent uploads and remote album deduplication.
//!
//! ## Overview
//!
//! This crate holds the parts of the tool with real concurrency concerns:
//! - Running many independent jobs with a fixed degree of parallelism
//! - Uploading local files idempotently against a shared tracker
//! - Creating albums exactly once per title under concurrent callers
//! - Detecting and merging remote albums that share a title
//!
//! ## Components
//!
//! - **Worker Pool** (`pool`): Fixed-size executor with lossless result collection
//! - **Upload Job** (`upload`): Tracker-aware upload, album association and cleanup
//! - **Album Resolver** (`albums`): Serialized per-account album get-or-create
//! - **File Filter** (`filter`) and **Folder Scanner** (`scan`): Select files and name albums
//! - **Upload Coordinator** (`coordinator`): Drives a `push` run across configured jobs
//! - **Album Deduplicator** (`dedupe`): Paginated title-collision merging

pub mod albums;
pub mod coordinator;
pub mod dedupe;
pub mod error;
pub mod filter;
pub mod pool;
pub mod scan;
pub mod upload;

pub use albums::{AlbumResolver, ALBUM_PAGE_SIZE};
pub use coordinator::{
    SessionFactory, UploadConfig, UploadCoordinator, UploadSummary, DEFAULT_UPLOAD_WORKERS,
};
pub use dedupe::{
    AlbumDeduplicator, AlbumMerger, DedupeCoordinator, DedupeReport, DedupeSummary, MergeJob,
    MergeOutcome, DEFAULT_DEDUPE_WORKERS, MAX_BATCH_ADD_ITEMS,
};
pub use error::{Result, SyncError};
pub use filter::FileFilter;
pub use pool::{Job, JobId, JobResult, PoolState, WorkerPool};
pub use scan::{FolderScanner, LocalFolderScanner, UploadItem};
pub use upload::{UploadContext, UploadJob, UploadOutcome};
