//! Integration tests for upload jobs and the upload coordinator
//!
//! These tests verify:
//! - The full upload sequence (tracker, upload, album, delete, mark)
//! - Idempotency across runs and resume after partial success
//! - Cancellation between steps
//! - Single album creation under concurrent workers
//! - One upload per file when jobs for the same path race
//! - Coordinator per-folder draining and isolation of failures

mod common;

use async_trait::async_trait;
use bridge_desktop::{SqliteFileTracker, TokioFileSystem};
use bridge_traits::{
    photos::PhotoService,
    tracker::{Claim, FileTracker, TrackState},
};
use common::{FakePhotoService, FakeSessions};
use core_runtime::config::{AlbumNaming, JobConfig, MakeAlbums};
use core_sync::{
    AlbumResolver, FolderScanner, Job, LocalFolderScanner, SyncError, UploadConfig,
    UploadContext, UploadCoordinator, UploadItem, UploadJob, UploadOutcome, WorkerPool,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ACCOUNT: &str = "me@example.com";

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    photos: Arc<FakePhotoService>,
    tracker: Arc<SqliteFileTracker>,
    albums: Arc<AlbumResolver>,
}

impl Harness {
    async fn new(photos: FakePhotoService) -> Self {
        let photos = Arc::new(photos);
        let albums = Arc::new(AlbumResolver::new(Arc::clone(&photos) as Arc<dyn PhotoService>));
        Self {
            photos,
            tracker: Arc::new(SqliteFileTracker::in_memory().await.unwrap()),
            albums,
        }
    }

    fn context(&self, delete_after_upload: bool) -> UploadContext {
        UploadContext {
            photos: Arc::clone(&self.photos) as Arc<dyn PhotoService>,
            albums: Arc::clone(&self.albums),
            tracker: Arc::clone(&self.tracker) as Arc<dyn FileTracker>,
            file_system: Arc::new(TokioFileSystem::new()),
            delete_after_upload,
        }
    }

    fn job(&self, path: &Path, album: Option<&str>, delete: bool) -> UploadJob {
        UploadJob::new(
            UploadItem {
                path: path.to_path_buf(),
                album_name: album.map(str::to_string),
            },
            self.context(delete),
        )
    }
}

fn write_file(dir: &Path, relative: &str) -> PathBuf {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"image-bytes").unwrap();
    path
}

fn job_config(folder: &Path, delete: bool) -> JobConfig {
    JobConfig {
        account: ACCOUNT.to_string(),
        source_folder: folder.to_path_buf(),
        make_albums: MakeAlbums {
            enabled: true,
            naming: AlbumNaming::FolderName,
        },
        delete_after_upload: delete,
        upload_videos: false,
        include_patterns: vec!["_ALL_FILES_".to_string()],
        exclude_patterns: vec![],
    }
}

// ============================================================================
// Upload Job
// ============================================================================

#[tokio::test]
async fn test_upload_adds_to_album_and_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "Rome/a.jpg");
    let harness = Harness::new(FakePhotoService::new()).await;

    let outcome = harness
        .job(&file, Some("Rome"), false)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    let UploadOutcome::Uploaded { media_item_id } = outcome else {
        panic!("expected an upload");
    };
    assert_eq!(harness.photos.uploads(), vec![file.clone()]);
    assert_eq!(harness.photos.created_albums(), vec!["Rome".to_string()]);

    let album = &harness.photos.album_by_title("Rome")[0];
    assert_eq!(harness.photos.items(&album.id), vec![media_item_id]);
    assert!(harness.tracker.is_tracked(&file).await.unwrap());
    assert!(file.exists());
}

#[tokio::test]
async fn test_upload_without_album_skips_association() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.jpg");
    let harness = Harness::new(FakePhotoService::new()).await;

    harness
        .job(&file, None, false)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert!(harness.photos.created_albums().is_empty());
    assert!(harness.photos.batch_add_sizes().is_empty());
    assert!(harness.tracker.is_tracked(&file).await.unwrap());
}

#[tokio::test]
async fn test_upload_deletes_local_file_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.jpg");
    let harness = Harness::new(FakePhotoService::new()).await;

    harness
        .job(&file, None, true)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert!(!file.exists());
    assert!(harness.tracker.is_tracked(&file).await.unwrap());
}

#[tokio::test]
async fn test_tracked_file_is_not_uploaded_again() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.jpg");
    let harness = Harness::new(FakePhotoService::new()).await;
    let cancel = CancellationToken::new();

    harness.job(&file, None, false).execute(&cancel).await.unwrap();
    let second = harness.job(&file, None, false).execute(&cancel).await.unwrap();

    assert_eq!(second, UploadOutcome::AlreadyUploaded);
    assert_eq!(harness.photos.uploads().len(), 1);
}

#[tokio::test]
async fn test_failed_upload_is_not_tracked() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.jpg");
    let harness = Harness::new(FakePhotoService::new()).await;
    harness.photos.fail_upload_of(&file);

    let result = harness
        .job(&file, Some("Rome"), true)
        .execute(&CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SyncError::Bridge(_))));
    assert_eq!(harness.tracker.lookup(&file).await.unwrap(), None);
    assert!(file.exists());
}

#[tokio::test]
async fn test_partial_success_resumes_without_reupload() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "Rome/a.jpg");
    let harness = Harness::new(FakePhotoService::new()).await;
    let cancel = CancellationToken::new();

    // Album association fails after the bytes were uploaded
    harness.photos.set_fail_batch_add(true);
    let first = harness.job(&file, Some("Rome"), false).execute(&cancel).await;
    assert!(first.is_err());

    let entry = harness.tracker.lookup(&file).await.unwrap().unwrap();
    assert_eq!(entry.state, TrackState::Uploaded);

    harness.photos.set_fail_batch_add(false);
    let second = harness
        .job(&file, Some("Rome"), false)
        .execute(&cancel)
        .await
        .unwrap();

    let media_item_id = entry.media_item_id.unwrap();
    assert_eq!(
        second,
        UploadOutcome::Uploaded {
            media_item_id: media_item_id.clone()
        }
    );
    assert_eq!(harness.photos.uploads().len(), 1);

    let album = &harness.photos.album_by_title("Rome")[0];
    assert_eq!(harness.photos.items(&album.id), vec![media_item_id]);
    assert!(harness.tracker.is_tracked(&file).await.unwrap());
}

#[tokio::test]
async fn test_cancelled_job_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "a.jpg");
    let harness = Harness::new(FakePhotoService::new()).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = harness.job(&file, Some("Rome"), true).execute(&cancel).await;

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert!(harness.photos.uploads().is_empty());
    assert!(file.exists());
    assert_eq!(harness.tracker.lookup(&file).await.unwrap(), None);
}

#[tokio::test]
async fn test_cancel_after_upload_skips_album_and_keeps_upload() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "Rome/a.jpg");
    let harness = Harness::new(FakePhotoService::new()).await;

    let cancel = CancellationToken::new();
    harness.photos.cancel_after_upload(cancel.clone());
    let result = harness.job(&file, Some("Rome"), true).execute(&cancel).await;

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert!(harness.photos.created_albums().is_empty());
    assert!(harness.photos.batch_add_sizes().is_empty());
    assert!(file.exists());

    let entry = harness.tracker.lookup(&file).await.unwrap().unwrap();
    assert_eq!(entry.state, TrackState::Uploaded);

    // The claim was released, so the next run resumes from the upload
    assert_eq!(
        harness.tracker.claim(&file).await.unwrap(),
        Claim::Acquired {
            media_item_id: entry.media_item_id
        }
    );
}

#[tokio::test]
async fn test_cancel_before_delete_keeps_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "Rome/a.jpg");
    let harness = Harness::new(FakePhotoService::new()).await;

    let cancel = CancellationToken::new();
    harness.photos.cancel_after_create(cancel.clone());
    let result = harness.job(&file, Some("Rome"), true).execute(&cancel).await;

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert!(file.exists());

    let album = &harness.photos.album_by_title("Rome")[0];
    assert_eq!(harness.photos.items(&album.id).len(), 1);

    let entry = harness.tracker.lookup(&file).await.unwrap().unwrap();
    assert_eq!(entry.state, TrackState::Uploaded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_racing_jobs_for_one_path_upload_once() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "Rome/a.jpg");
    let harness =
        Harness::new(FakePhotoService::new().with_upload_delay(Duration::from_millis(50))).await;

    let mut pool = WorkerPool::new(2, CancellationToken::new());
    pool.start().unwrap();
    pool.submit(harness.job(&file, Some("Rome"), false)).await.unwrap();
    pool.submit(harness.job(&file, Some("Rome"), false)).await.unwrap();

    let results = pool.collect_results(2).await.unwrap();
    pool.stop().await.unwrap();

    let mut uploaded = 0;
    let mut skipped = 0;
    for result in results {
        match result.outcome.unwrap() {
            UploadOutcome::Uploaded { .. } => uploaded += 1,
            UploadOutcome::ClaimedElsewhere => skipped += 1,
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    assert_eq!((uploaded, skipped), (1, 1));
    assert_eq!(harness.photos.uploads(), vec![file.clone()]);
    assert!(harness.tracker.is_tracked(&file).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_create_album_once() {
    let dir = tempfile::tempdir().unwrap();
    let harness =
        Harness::new(FakePhotoService::new().with_create_delay(Duration::from_millis(20))).await;

    let mut pool = WorkerPool::new(4, CancellationToken::new());
    pool.start().unwrap();
    for i in 0..8 {
        let file = write_file(dir.path(), &format!("Rome/{}.jpg", i));
        pool.submit(harness.job(&file, Some("Rome"), false)).await.unwrap();
    }

    let results = pool.collect_results(8).await.unwrap();
    pool.stop().await.unwrap();

    assert!(results.iter().all(|r| r.is_success()));
    assert_eq!(harness.photos.created_albums(), vec!["Rome".to_string()]);

    let albums = harness.photos.album_by_title("Rome");
    assert_eq!(albums.len(), 1);
    assert_eq!(harness.photos.items(&albums[0].id).len(), 8);
}

#[tokio::test]
async fn test_existing_album_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "Rome/a.jpg");
    let photos = FakePhotoService::new();
    photos.add_album("existing-rome", "Rome", &[]);
    let harness = Harness::new(photos).await;

    harness
        .job(&file, Some("Rome"), false)
        .execute(&CancellationToken::new())
        .await
        .unwrap();

    assert!(harness.photos.created_albums().is_empty());
    assert_eq!(harness.photos.items("existing-rome").len(), 1);
}

// ============================================================================
// Upload Coordinator
// ============================================================================

async fn coordinator(
    sessions: FakeSessions,
    tracker: Arc<SqliteFileTracker>,
    workers: usize,
) -> UploadCoordinator {
    UploadCoordinator::new(
        Arc::new(sessions),
        Arc::new(LocalFolderScanner::new()),
        tracker,
        Arc::new(TokioFileSystem::new()),
        UploadConfig {
            worker_count: workers,
        },
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_coordinator_uploads_every_folder() {
    let dir = tempfile::tempdir().unwrap();
    let pictures = dir.path().join("Pictures");
    let phone = dir.path().join("Phone");
    write_file(&pictures, "Rome/a.jpg");
    write_file(&pictures, "Rome/b.jpg");
    write_file(&pictures, "top.jpg");
    write_file(&phone, "c.jpg");

    let photos = Arc::new(FakePhotoService::new());
    let tracker = Arc::new(SqliteFileTracker::in_memory().await.unwrap());
    let sessions = FakeSessions::new().with_account(ACCOUNT, Arc::clone(&photos));
    let coordinator = coordinator(sessions, Arc::clone(&tracker), 3).await;
    let jobs = vec![job_config(&pictures, false), job_config(&phone, false)];

    let summary = coordinator.run(&jobs, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.submitted, 4);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 0);
    assert!(!summary.has_failures());

    let mut created = photos.created_albums();
    created.sort();
    assert_eq!(created, vec!["Phone", "Pictures", "Rome"]);

    // A second run finds everything tracked
    let summary = coordinator.run(&jobs, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.submitted, 4);
    assert_eq!(summary.already_uploaded, 4);
    assert_eq!(photos.uploads().len(), 4);
}

#[tokio::test]
async fn test_coordinator_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let pictures = dir.path().join("Pictures");
    let good = write_file(&pictures, "a.jpg");
    let bad = write_file(&pictures, "b.jpg");

    let photos = Arc::new(FakePhotoService::new());
    photos.fail_upload_of(&bad);
    let tracker = Arc::new(SqliteFileTracker::in_memory().await.unwrap());
    let sessions = FakeSessions::new().with_account(ACCOUNT, Arc::clone(&photos));
    let coordinator = coordinator(sessions, Arc::clone(&tracker), 2).await;

    let jobs = vec![
        job_config(&dir.path().join("missing"), false),
        job_config(&pictures, false),
    ];
    let summary = coordinator.run(&jobs, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.failed_folders, 1);
    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.has_failures());
    assert!(tracker.is_tracked(&good).await.unwrap());
    assert!(!tracker.is_tracked(&bad).await.unwrap());
}

/// Scanner that records how many uploads finished before each scan
struct RecordingScanner {
    inner: LocalFolderScanner,
    photos: Arc<FakePhotoService>,
    uploads_at_scan: Mutex<Vec<usize>>,
}

#[async_trait]
impl FolderScanner for RecordingScanner {
    async fn scan(&self, job: &JobConfig) -> core_sync::Result<Vec<UploadItem>> {
        self.uploads_at_scan
            .lock()
            .unwrap()
            .push(self.photos.uploads().len());
        self.inner.scan(job).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_coordinator_drains_each_folder_before_the_next() {
    let dir = tempfile::tempdir().unwrap();
    let pictures = dir.path().join("Pictures");
    let phone = dir.path().join("Phone");
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        write_file(&pictures, name);
    }
    write_file(&phone, "d.jpg");

    let photos = Arc::new(FakePhotoService::new().with_upload_delay(Duration::from_millis(30)));
    let scanner = Arc::new(RecordingScanner {
        inner: LocalFolderScanner::new(),
        photos: Arc::clone(&photos),
        uploads_at_scan: Mutex::new(Vec::new()),
    });
    let coordinator = UploadCoordinator::new(
        Arc::new(FakeSessions::new().with_account(ACCOUNT, Arc::clone(&photos))),
        Arc::clone(&scanner) as Arc<dyn FolderScanner>,
        Arc::new(SqliteFileTracker::in_memory().await.unwrap()),
        Arc::new(TokioFileSystem::new()),
        UploadConfig { worker_count: 3 },
    );

    let jobs = vec![job_config(&pictures, false), job_config(&phone, false)];
    let summary = coordinator.run(&jobs, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.submitted, 4);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(*scanner.uploads_at_scan.lock().unwrap(), vec![0, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_folders_upload_each_file_once() {
    let dir = tempfile::tempdir().unwrap();
    let pictures = dir.path().join("Pictures");
    let file = write_file(&pictures, "Rome/a.jpg");

    let photos = Arc::new(FakePhotoService::new().with_upload_delay(Duration::from_millis(20)));
    let tracker = Arc::new(SqliteFileTracker::in_memory().await.unwrap());
    let sessions = FakeSessions::new().with_account(ACCOUNT, Arc::clone(&photos));
    let coordinator = coordinator(sessions, Arc::clone(&tracker), 2).await;

    let jobs = vec![
        job_config(&pictures, false),
        job_config(&pictures.join("Rome"), false),
    ];
    let summary = coordinator.run(&jobs, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.already_uploaded, 1);
    assert_eq!(photos.uploads(), vec![file.clone()]);
    assert!(tracker.is_tracked(&file).await.unwrap());
}

#[tokio::test]
async fn test_coordinator_aborts_on_session_failure() {
    let dir = tempfile::tempdir().unwrap();
    let pictures = dir.path().join("Pictures");
    write_file(&pictures, "a.jpg");

    let tracker = Arc::new(SqliteFileTracker::in_memory().await.unwrap());
    let sessions = FakeSessions::new().with_failing_account(ACCOUNT);
    let coordinator = coordinator(sessions, tracker, 2).await;

    let result = coordinator
        .run(&[job_config(&pictures, false)], CancellationToken::new())
        .await;
    assert!(matches!(result, Err(SyncError::Session { .. })));
}

#[tokio::test]
async fn test_coordinator_skips_folders_after_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let pictures = dir.path().join("Pictures");
    write_file(&pictures, "a.jpg");

    let photos = Arc::new(FakePhotoService::new());
    let tracker = Arc::new(SqliteFileTracker::in_memory().await.unwrap());
    let sessions = FakeSessions::new().with_account(ACCOUNT, Arc::clone(&photos));
    let coordinator = coordinator(sessions, tracker, 2).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = coordinator
        .run(&[job_config(&pictures, false)], cancel)
        .await
        .unwrap();

    assert_eq!(summary.submitted, 0);
    assert!(photos.uploads().is_empty());
}

#[tokio::test]
async fn test_coordinator_counts_cancelled_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let pictures = dir.path().join("Pictures");
    write_file(&pictures, "Rome/a.jpg");
    write_file(&pictures, "Rome/b.jpg");

    let cancel = CancellationToken::new();
    let photos = Arc::new(FakePhotoService::new());
    photos.cancel_after_upload(cancel.clone());
    let tracker = Arc::new(SqliteFileTracker::in_memory().await.unwrap());
    let sessions = FakeSessions::new().with_account(ACCOUNT, Arc::clone(&photos));
    let coordinator = coordinator(sessions, tracker, 1).await;

    let summary = coordinator
        .run(&[job_config(&pictures, false)], cancel)
        .await
        .unwrap();

    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.cancelled, 2);
    assert_eq!(photos.uploads().len(), 1);
}
