//! Local files and credential storage.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::error::Result;

/// Local file operations performed around an upload
///
/// Reads feed the upload body; deletes implement delete-after-upload.
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;
}

/// Per-account refresh token storage
///
/// Implementations keep values in the platform credential store and never
/// log them.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;
}
