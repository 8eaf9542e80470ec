//! Google Photos Library API connector implementation
//!
//! Implements the `PhotoService` trait for the Photos Library API v1.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::photos::{Album, MediaItem, Page, PhotoService};
use bridge_traits::storage::FileSystemAccess;
use core_auth::AccessTokenProvider;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::GooglePhotosError;
use crate::types::{
    AlbumResource, AlbumsListResponse, BatchAddMediaItemsRequest, BatchCreateRequest,
    BatchCreateResponse, CreateAlbumRequest, ErrorResponse, MediaItemResource, NewAlbum,
    NewMediaItem, SearchMediaItemsRequest, SearchMediaItemsResponse, SimpleMediaItem,
};

/// Photos Library API base URL
const PHOTOS_API_BASE: &str = "https://photoslibrary.googleapis.com/v1";

/// Page size for mediaItems.search (API maximum)
const SEARCH_PAGE_SIZE: u32 = 100;

/// Timeout for metadata calls
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for raw byte uploads
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Google Photos Library API connector
///
/// Implements `PhotoService` for one authenticated account. Every call makes
/// exactly one HTTP request per API operation; nothing is retried here.
///
/// # Example
///
/// ```ignore
/// use provider_google_photos::GooglePhotosConnector;
/// use bridge_traits::photos::PhotoService;
///
/// let connector = GooglePhotosConnector::new(http_client, file_system, session);
/// let page = connector.list_albums(50, None).await?;
/// ```
pub struct GooglePhotosConnector {
    http_client: Arc<dyn HttpClient>,
    file_system: Arc<dyn FileSystemAccess>,
    token_provider: Arc<dyn AccessTokenProvider>,
    base_url: String,
}

impl GooglePhotosConnector {
    /// Create a new Google Photos connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `file_system` - Reads local files for upload
    /// * `token_provider` - Access tokens for the account being synced
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<dyn FileSystemAccess>,
        token_provider: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            http_client,
            file_system,
            token_provider,
            base_url: PHOTOS_API_BASE.to_string(),
        }
    }

    /// Point the connector at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn bearer_token(&self) -> std::result::Result<String, GooglePhotosError> {
        self.token_provider
            .access_token()
            .await
            .map_err(|e| GooglePhotosError::AuthenticationFailed(e.to_string()))
    }

    /// Execute an authorized request and reject non-2xx responses
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, GooglePhotosError> {
        let token = self.bearer_token().await?;
        let request = request.bearer_token(token);

        let response = self.http_client.execute(request).await?;

        if response.is_success() {
            debug!(status = response.status, "API request succeeded");
            return Ok(response);
        }

        let message = Self::error_message(&response);
        warn!(status = response.status, error = %message, "API request failed");

        Err(GooglePhotosError::ApiError {
            status_code: response.status,
            message,
        })
    }

    fn error_message(response: &HttpResponse) -> String {
        match serde_json::from_slice::<ErrorResponse>(&response.body) {
            Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
            _ => String::from_utf8_lossy(&response.body).to_string(),
        }
    }

    fn parse<T: DeserializeOwned>(
        response: &HttpResponse,
        what: &str,
    ) -> std::result::Result<T, GooglePhotosError> {
        serde_json::from_slice(&response.body).map_err(|e| {
            GooglePhotosError::ParseError(format!("Failed to parse {}: {}", what, e))
        })
    }

    fn json_request<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> std::result::Result<HttpRequest, GooglePhotosError> {
        Ok(
            HttpRequest::new(HttpMethod::Post, format!("{}{}", self.base_url, path))
                .json(body)?
                .timeout(API_TIMEOUT),
        )
    }

    fn get_request(&self, path: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
            .timeout(API_TIMEOUT)
    }

    /// Send the raw bytes and return the upload token
    async fn upload_bytes(
        &self,
        path: &Path,
        file_name: &str,
    ) -> std::result::Result<String, GooglePhotosError> {
        let data = self.file_system.read_file(path).await?;
        let size = data.len();

        let request = HttpRequest::new(HttpMethod::Post, format!("{}/uploads", self.base_url))
            .header("Content-Type", "application/octet-stream")
            .header("X-Goog-Upload-Protocol", "raw")
            .header("X-Goog-Upload-File-Name", urlencoding::encode(file_name).into_owned())
            .body(data)
            .timeout(UPLOAD_TIMEOUT);

        let response = self.send(request).await?;
        let upload_token = response
            .text()
            .map_err(|e| GooglePhotosError::ParseError(format!("Invalid upload token: {}", e)))?
            .trim()
            .to_string();

        if upload_token.is_empty() {
            return Err(GooglePhotosError::UploadRejected {
                file: file_name.to_string(),
                message: "empty upload token".to_string(),
            });
        }

        debug!(bytes = size, "Uploaded file bytes");
        Ok(upload_token)
    }

    async fn create_media_item(
        &self,
        upload_token: &str,
        file_name: &str,
    ) -> std::result::Result<MediaItemResource, GooglePhotosError> {
        let body = BatchCreateRequest {
            new_media_items: vec![NewMediaItem {
                simple_media_item: SimpleMediaItem {
                    upload_token,
                    file_name,
                },
            }],
        };

        let response = self
            .send(self.json_request("/mediaItems:batchCreate", &body)?)
            .await?;
        let created: BatchCreateResponse = Self::parse(&response, "batchCreate response")?;

        let result = created
            .new_media_item_results
            .into_iter()
            .next()
            .ok_or_else(|| GooglePhotosError::UploadRejected {
                file: file_name.to_string(),
                message: "no media item result returned".to_string(),
            })?;

        let status = result.status.unwrap_or_default();
        if !status.is_ok() {
            return Err(GooglePhotosError::UploadRejected {
                file: file_name.to_string(),
                message: status.message,
            });
        }

        result
            .media_item
            .ok_or_else(|| GooglePhotosError::UploadRejected {
                file: file_name.to_string(),
                message: "media item missing from result".to_string(),
            })
    }
}

#[async_trait]
impl PhotoService for GooglePhotosConnector {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn upload_file(&self, path: &Path) -> Result<MediaItem> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let upload_token = self.upload_bytes(path, &file_name).await?;
        let media_item = self.create_media_item(&upload_token, &file_name).await?;

        info!(media_item_id = %media_item.id, "Created media item");
        Ok(media_item.into())
    }

    #[instrument(skip(self))]
    async fn list_albums(&self, page_size: u32, page_token: Option<&str>) -> Result<Page<Album>> {
        let mut path = format!("/albums?pageSize={}", page_size);
        if let Some(token) = page_token {
            path.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let response = self.send(self.get_request(&path)).await?;
        let list: AlbumsListResponse = Self::parse(&response, "albums list")?;

        debug!(count = list.albums.len(), "Listed albums");

        Ok(Page::new(
            list.albums.into_iter().map(Album::from).collect(),
            list.next_page_token,
        ))
    }

    #[instrument(skip(self))]
    async fn get_album(&self, album_id: &str) -> Result<Album> {
        let path = format!("/albums/{}", urlencoding::encode(album_id));
        let response = self.send(self.get_request(&path)).await?;
        let album: AlbumResource = Self::parse(&response, "album")?;

        Ok(album.into())
    }

    #[instrument(skip(self))]
    async fn create_album(&self, title: &str) -> Result<Album> {
        let body = CreateAlbumRequest {
            album: NewAlbum { title },
        };

        let response = self.send(self.json_request("/albums", &body)?).await?;
        let album: AlbumResource = Self::parse(&response, "created album")?;

        info!(album_id = %album.id, "Created album");
        Ok(album.into())
    }

    #[instrument(skip(self, media_item_ids), fields(count = media_item_ids.len()))]
    async fn batch_add_media_items(&self, album_id: &str, media_item_ids: &[String]) -> Result<()> {
        let path = format!(
            "/albums/{}:batchAddMediaItems",
            urlencoding::encode(album_id)
        );
        let body = BatchAddMediaItemsRequest { media_item_ids };

        self.send(self.json_request(&path, &body)?).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_media_items(
        &self,
        album_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<MediaItem>> {
        let body = SearchMediaItemsRequest {
            album_id,
            page_size: SEARCH_PAGE_SIZE,
            page_token,
        };

        let response = self
            .send(self.json_request("/mediaItems:search", &body)?)
            .await?;
        let search: SearchMediaItemsResponse = Self::parse(&response, "search response")?;

        Ok(Page::new(
            search.media_items.into_iter().map(MediaItem::from).collect(),
            search.next_page_token,
        ))
    }
}
