//! Google Photos Library API request and response types
//!
//! Data structures for (de)serializing Photos Library API v1 payloads.

use bridge_traits::photos::{Album, MediaItem};
use serde::{Deserialize, Serialize};

/// Photos Library album resource
///
/// See: https://developers.google.com/photos/library/reference/rest/v1/albums#Album
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumResource {
    pub id: String,

    /// Missing for untitled albums
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub product_url: String,

    /// int64 encoded as a string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_items_count: Option<String>,
}

impl From<AlbumResource> for Album {
    fn from(resource: AlbumResource) -> Self {
        Album {
            id: resource.id,
            title: resource.title,
            product_url: resource.product_url,
            media_items_count: resource
                .media_items_count
                .and_then(|count| count.parse().ok()),
        }
    }
}

/// Photos Library media item resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItemResource {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
}

impl From<MediaItemResource> for MediaItem {
    fn from(resource: MediaItemResource) -> Self {
        MediaItem {
            id: resource.id,
            filename: resource.filename,
        }
    }
}

/// albums.list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumsListResponse {
    /// Omitted entirely when the page is empty
    #[serde(default)]
    pub albums: Vec<AlbumResource>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// albums.create request body
#[derive(Debug, Serialize)]
pub struct CreateAlbumRequest<'a> {
    pub album: NewAlbum<'a>,
}

#[derive(Debug, Serialize)]
pub struct NewAlbum<'a> {
    pub title: &'a str,
}

/// albums.batchAddMediaItems request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAddMediaItemsRequest<'a> {
    pub media_item_ids: &'a [String],
}

/// mediaItems.search request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMediaItemsRequest<'a> {
    pub album_id: &'a str,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<&'a str>,
}

/// mediaItems.search response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMediaItemsResponse {
    #[serde(default)]
    pub media_items: Vec<MediaItemResource>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// mediaItems.batchCreate request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateRequest<'a> {
    pub new_media_items: Vec<NewMediaItem<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaItem<'a> {
    pub simple_media_item: SimpleMediaItem<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleMediaItem<'a> {
    pub upload_token: &'a str,
    pub file_name: &'a str,
}

/// mediaItems.batchCreate response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResponse {
    #[serde(default)]
    pub new_media_item_results: Vec<NewMediaItemResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaItemResult {
    #[serde(default)]
    pub status: Option<Status>,

    #[serde(default)]
    pub media_item: Option<MediaItemResource>,
}

/// google.rpc.Status; a missing or zero code means OK
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,

    #[serde(default)]
    pub message: String,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Error envelope returned with non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}
