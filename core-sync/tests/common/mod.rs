//! Shared test doubles for core-sync integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    photos::{Album, MediaItem, Page, PhotoService},
};
use core_sync::{Result, SessionFactory, SyncError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Fake remote library
// ============================================================================

#[derive(Default)]
struct FakeState {
    albums: Vec<Album>,
    items: HashMap<String, Vec<String>>,
    next_id: usize,

    list_page_size: Option<usize>,
    media_page_size: Option<usize>,

    list_calls: Vec<Option<String>>,
    batch_add_calls: Vec<(String, usize)>,
    uploads: Vec<PathBuf>,
    created_albums: Vec<String>,

    failing_uploads: HashSet<PathBuf>,
    failing_batch_targets: HashSet<String>,
    fail_batch_add: bool,
    fail_list: bool,
    fail_list_after: Option<usize>,

    cancel_after_upload: Option<CancellationToken>,
    cancel_after_create: Option<CancellationToken>,
}

/// In-memory stand-in for the remote photo library
#[derive(Default)]
pub struct FakePhotoService {
    state: Mutex<FakeState>,
    create_delay: Option<Duration>,
    upload_delay: Option<Duration>,
    batch_add_delay: Option<Duration>,
}

impl FakePhotoService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay album creation to widen races between concurrent callers
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Delay uploads so several can be in flight at once
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    pub fn with_batch_add_delay(mut self, delay: Duration) -> Self {
        self.batch_add_delay = Some(delay);
        self
    }

    /// Serve album listings in pages of `size`, whatever the caller asks for
    pub fn with_list_page_size(self, size: usize) -> Self {
        self.state.lock().unwrap().list_page_size = Some(size);
        self
    }

    pub fn with_media_page_size(self, size: usize) -> Self {
        self.state.lock().unwrap().media_page_size = Some(size);
        self
    }

    /// Add an album holding `item_ids`; listing order is insertion order
    pub fn add_album(&self, id: &str, title: &str, item_ids: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.albums.push(Album {
            id: id.to_string(),
            title: title.to_string(),
            product_url: format!("https://photos.example.com/album/{}", id),
            media_items_count: Some(item_ids.len() as u64),
        });
        state.items.insert(
            id.to_string(),
            item_ids.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// List an existing album a second time, after everything added so far
    pub fn list_again(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        let album = state
            .albums
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .expect("album to repeat must exist");
        state.albums.push(album);
    }

    pub fn items(&self, album_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut items = state.items.get(album_id).cloned().unwrap_or_default();
        items.sort();
        items
    }

    pub fn fail_upload_of(&self, path: &Path) {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(path.to_path_buf());
    }

    pub fn set_fail_batch_add(&self, fail: bool) {
        self.state.lock().unwrap().fail_batch_add = fail;
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    /// Fail every listing call after the first `calls`
    pub fn fail_list_after(&self, calls: usize) {
        self.state.lock().unwrap().fail_list_after = Some(calls);
    }

    /// Fail batch-add calls that target `album_id`
    pub fn fail_batch_add_into(&self, album_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_batch_targets
            .insert(album_id.to_string());
    }

    /// Cancel `token` once an upload has returned its media item
    pub fn cancel_after_upload(&self, token: CancellationToken) {
        self.state.lock().unwrap().cancel_after_upload = Some(token);
    }

    /// Cancel `token` once an album has been created
    pub fn cancel_after_create(&self, token: CancellationToken) {
        self.state.lock().unwrap().cancel_after_create = Some(token);
    }

    pub fn list_calls(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().list_calls.clone()
    }

    pub fn batch_add_sizes(&self) -> Vec<usize> {
        self.state
            .lock()
            .unwrap()
            .batch_add_calls
            .iter()
            .map(|(_, size)| *size)
            .collect()
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn created_albums(&self) -> Vec<String> {
        self.state.lock().unwrap().created_albums.clone()
    }

    pub fn album_by_title(&self, title: &str) -> Vec<Album> {
        self.state
            .lock()
            .unwrap()
            .albums
            .iter()
            .filter(|a| a.title == title)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PhotoService for FakePhotoService {
    async fn upload_file(&self, path: &Path) -> BridgeResult<MediaItem> {
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.failing_uploads.contains(path) {
            return Err(BridgeError::Remote {
                status: 500,
                message: "upload rejected".to_string(),
            });
        }

        state.next_id += 1;
        let id = format!("media-{}", state.next_id);
        state.uploads.push(path.to_path_buf());
        if let Some(token) = &state.cancel_after_upload {
            token.cancel();
        }
        Ok(MediaItem::new(id))
    }

    async fn list_albums(&self, page_size: u32, page_token: Option<&str>) -> BridgeResult<Page<Album>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls.push(page_token.map(str::to_string));
        let over_limit = state
            .fail_list_after
            .is_some_and(|limit| state.list_calls.len() > limit);
        if state.fail_list || over_limit {
            return Err(BridgeError::Remote {
                status: 503,
                message: "listing unavailable".to_string(),
            });
        }

        let size = state.list_page_size.unwrap_or(page_size as usize).max(1);
        let offset = page_token
            .and_then(|t| t.strip_prefix("offset-"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);
        let end = (offset + size).min(state.albums.len());
        let items = state.albums[offset.min(end)..end].to_vec();
        let next = if end < state.albums.len() {
            format!("offset-{}", end)
        } else {
            String::new()
        };

        Ok(Page::new(items, Some(next)))
    }

    async fn get_album(&self, album_id: &str) -> BridgeResult<Album> {
        let state = self.state.lock().unwrap();
        state
            .albums
            .iter()
            .find(|a| a.id == album_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(album_id.to_string()))
    }

    async fn create_album(&self, title: &str) -> BridgeResult<Album> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let album = Album {
            id: format!("album-{}", state.next_id),
            title: title.to_string(),
            product_url: format!("https://photos.example.com/album/{}", state.next_id),
            media_items_count: Some(0),
        };
        state.albums.push(album.clone());
        state.items.insert(album.id.clone(), Vec::new());
        state.created_albums.push(title.to_string());
        if let Some(token) = &state.cancel_after_create {
            token.cancel();
        }
        Ok(album)
    }

    async fn batch_add_media_items(&self, album_id: &str, media_item_ids: &[String]) -> BridgeResult<()> {
        if let Some(delay) = self.batch_add_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state
            .batch_add_calls
            .push((album_id.to_string(), media_item_ids.len()));
        if state.fail_batch_add || state.failing_batch_targets.contains(album_id) {
            return Err(BridgeError::Remote {
                status: 500,
                message: "batch add failed".to_string(),
            });
        }

        let items = state
            .items
            .get_mut(album_id)
            .ok_or_else(|| BridgeError::NotFound(album_id.to_string()))?;
        for id in media_item_ids {
            if !items.contains(id) {
                items.push(id.clone());
            }
        }
        Ok(())
    }

    async fn search_media_items(
        &self,
        album_id: &str,
        page_token: Option<&str>,
    ) -> BridgeResult<Page<MediaItem>> {
        let state = self.state.lock().unwrap();
        let all = state
            .items
            .get(album_id)
            .ok_or_else(|| BridgeError::NotFound(album_id.to_string()))?;

        let size = state.media_page_size.unwrap_or(100).max(1);
        let offset = page_token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
        let end = (offset + size).min(all.len());
        let items = all[offset.min(end)..end]
            .iter()
            .map(|id| MediaItem::new(id.clone()))
            .collect();
        let next = (end < all.len()).then(|| end.to_string());

        Ok(Page::new(items, next))
    }
}

// ============================================================================
// Fake sessions
// ============================================================================

/// Hands out one fake library per account
#[derive(Default)]
pub struct FakeSessions {
    services: HashMap<String, Arc<FakePhotoService>>,
    failing: HashSet<String>,
}

impl FakeSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: &str, service: Arc<FakePhotoService>) -> Self {
        self.services.insert(account.to_string(), service);
        self
    }

    pub fn with_failing_account(mut self, account: &str) -> Self {
        self.failing.insert(account.to_string());
        self
    }
}

#[async_trait]
impl SessionFactory for FakeSessions {
    async fn photo_service(&self, account: &str) -> Result<Arc<dyn PhotoService>> {
        if self.failing.contains(account) {
            return Err(SyncError::Session {
                account: account.to_string(),
                message: "no stored credentials".to_string(),
            });
        }

        self.services
            .get(account)
            .map(|s| Arc::clone(s) as Arc<dyn PhotoService>)
            .ok_or_else(|| SyncError::Session {
                account: account.to_string(),
                message: "unknown account".to_string(),
            })
    }
}
