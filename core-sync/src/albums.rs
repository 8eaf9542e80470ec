//! Album get-or-create, serialized per account.
//!
//! Concurrent upload workers resolving the same title must end up with a
//! single remote album. The resolver keeps a title → ID map, loaded lazily
//! from the account's existing albums, and holds one lock across the whole
//! lookup-then-create path.

use bridge_traits::photos::PhotoService;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::{Result, SyncError};

/// Page size used when listing albums
pub const ALBUM_PAGE_SIZE: u32 = 50;

pub struct AlbumResolver {
    photos: Arc<dyn PhotoService>,
    albums: Mutex<Option<HashMap<String, String>>>,
}

impl AlbumResolver {
    pub fn new(photos: Arc<dyn PhotoService>) -> Self {
        Self {
            photos,
            albums: Mutex::new(None),
        }
    }

    /// Return the ID of the album titled `title`, creating it if needed
    #[instrument(skip(self))]
    pub async fn get_or_create(&self, title: &str) -> Result<String> {
        let mut guard = self.albums.lock().await;

        if guard.is_none() {
            let existing = self.load_existing(title).await?;
            *guard = Some(existing);
        }
        let albums = guard.get_or_insert_with(HashMap::new);

        if let Some(id) = albums.get(title) {
            return Ok(id.clone());
        }

        let album = self
            .photos
            .create_album(title)
            .await
            .map_err(|e| SyncError::AlbumResolution {
                title: title.to_string(),
                message: e.to_string(),
            })?;

        info!(album_id = %album.id, "Created album");
        albums.insert(title.to_string(), album.id.clone());
        Ok(album.id)
    }

    async fn load_existing(&self, title: &str) -> Result<HashMap<String, String>> {
        let mut albums = HashMap::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .photos
                .list_albums(ALBUM_PAGE_SIZE, page_token.as_deref())
                .await
                .map_err(|e| SyncError::AlbumResolution {
                    title: title.to_string(),
                    message: e.to_string(),
                })?;

            for album in &page.items {
                // First listed album wins when titles collide.
                albums
                    .entry(album.title.clone())
                    .or_insert_with(|| album.id.clone());
            }

            match page.next_cursor() {
                Some(token) => page_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(count = albums.len(), "Loaded existing albums");
        Ok(albums)
    }
}
