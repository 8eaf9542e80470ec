//! Remote Photo Service Abstraction
//!
//! The capability set the sync core consumes from a photo-storage backend:
//! uploading one file, album listing and lookup, album creation, media item
//! search by album and batch association of items with an album.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Remote album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Provider-assigned album ID
    pub id: String,
    /// User-visible title (not unique)
    pub title: String,
    /// User-facing URL of the album
    pub product_url: String,
    /// Item count as reported by the listing, when available
    pub media_items_count: Option<u64>,
}

/// Remote media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Provider-assigned media item ID
    pub id: String,
    /// Original file name, when reported
    pub filename: Option<String>,
}

impl MediaItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: None,
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the next page; `None` or empty means the listing is exhausted
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }

    /// Cursor for the following page, with empty tokens treated as the end
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Remote photo service
///
/// Implementations are shared by every worker of a pool and must be safe to
/// call concurrently. No method retries on its own.
#[async_trait]
pub trait PhotoService: Send + Sync {
    /// Upload one local file and create a media item for it
    async fn upload_file(&self, path: &Path) -> Result<MediaItem>;

    /// List the account's albums, `page_size` at a time
    async fn list_albums(&self, page_size: u32, page_token: Option<&str>) -> Result<Page<Album>>;

    /// Fetch one album by ID
    async fn get_album(&self, album_id: &str) -> Result<Album>;

    /// Create a new album; the service does not enforce unique titles
    async fn create_album(&self, title: &str) -> Result<Album>;

    /// Add existing media items to an album in a single call
    async fn batch_add_media_items(&self, album_id: &str, media_item_ids: &[String]) -> Result<()>;

    /// List one page of the media items contained in an album
    async fn search_media_items(
        &self,
        album_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<MediaItem>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_cursor_treats_empty_token_as_end() {
        let last: Page<Album> = Page::new(vec![], Some(String::new()));
        assert_eq!(last.next_cursor(), None);

        let none: Page<Album> = Page::new(vec![], None);
        assert_eq!(none.next_cursor(), None);

        let more: Page<Album> = Page::new(vec![], Some("B".to_string()));
        assert_eq!(more.next_cursor(), Some("B"));
    }
}
