//! Source folder scanning.
//!
//! Walks a job's source folder, applies its [`FileFilter`] and derives the
//! album each file belongs to.

use async_trait::async_trait;
use core_runtime::config::{AlbumNaming, JobConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, SyncError};
use crate::filter::FileFilter;

/// A file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub path: PathBuf,
    pub album_name: Option<String>,
}

/// Produces the upload items of one job
#[async_trait]
pub trait FolderScanner: Send + Sync {
    async fn scan(&self, job: &JobConfig) -> Result<Vec<UploadItem>>;
}

/// Scanner over the local file system
///
/// Items come back sorted by path. Unreadable entries below the source folder
/// are skipped with a warning; an unreadable source folder fails the scan.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFolderScanner;

impl LocalFolderScanner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FolderScanner for LocalFolderScanner {
    async fn scan(&self, job: &JobConfig) -> Result<Vec<UploadItem>> {
        let job = job.clone();
        let folder = job.source_folder.display().to_string();

        tokio::task::spawn_blocking(move || scan_blocking(&job))
            .await
            .map_err(|e| SyncError::Scan {
                folder,
                message: e.to_string(),
            })?
    }
}

fn scan_blocking(job: &JobConfig) -> Result<Vec<UploadItem>> {
    let root = &job.source_folder;
    let scan_error = |message: String| SyncError::Scan {
        folder: root.display().to_string(),
        message,
    };

    if !root.is_dir() {
        return Err(scan_error("not a directory".to_string()));
    }

    let filter = FileFilter::new(&job.include_patterns, &job.exclude_patterns, job.upload_videos)?;
    let mut items = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(scan_error(e.to_string())),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };

        if !filter.is_allowed(relative) {
            debug!(path = ?entry.path(), "Filtered out");
            continue;
        }

        let album_name = job
            .make_albums
            .enabled
            .then(|| album_name(root, relative, job.make_albums.naming));

        items.push(UploadItem {
            path: entry.path().to_path_buf(),
            album_name,
        });
    }

    debug!(folder = ?root, count = items.len(), "Scanned source folder");
    Ok(items)
}

/// Album title for a file at `relative` inside `root`
///
/// Files directly in `root` use the name of `root` itself.
pub fn album_name(root: &Path, relative: &Path, naming: AlbumNaming) -> String {
    let parent: Vec<String> = relative
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    match (parent.last(), naming) {
        (None, _) => folder_name(root),
        (Some(last), AlbumNaming::FolderName) => last.clone(),
        (Some(_), AlbumNaming::FolderPath) => parent.join("_"),
    }
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
