//! # Application Configuration
//!
//! Loads and validates the photosync configuration file.
//!
//! ## Overview
//!
//! A configuration directory holds `config.json` and the upload tracker
//! database. The file lists the OAuth application credentials and one job per
//! local folder to mirror:
//!
//! ```json
//! {
//!   "APIAppCredentials": { "ClientID": "...", "ClientSecret": "..." },
//!   "SecretsBackend": "keyring",
//!   "Jobs": [{
//!     "Account": "me@example.com",
//!     "SourceFolder": "~/Pictures",
//!     "MakeAlbums": { "Enabled": true, "Use": "folderName" },
//!     "DeleteAfterUpload": false,
//!     "UploadVideos": true,
//!     "IncludePatterns": ["_ALL_FILES_"],
//!     "ExcludePatterns": ["**/.DS_Store"]
//!   }]
//! }
//! ```
//!
//! ## Validation
//!
//! [`AppConfig::load`] fails fast on anything that would only surface halfway
//! through a run: empty credentials, no jobs, a job without an account, or a
//! source folder that is missing or not a directory. `~` in `SourceFolder` is
//! expanded to the user's home directory before the check.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file name inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Upload tracker database name inside the configuration directory
pub const TRACKER_DB_NAME: &str = "file_tracker.db";

/// Pattern tag matching every file
pub const ALL_FILES_TAG: &str = "_ALL_FILES_";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppConfig {
    /// OAuth application credentials shared by every account
    #[serde(rename = "APIAppCredentials")]
    pub api_app_credentials: ApiAppCredentials,

    /// Where refresh tokens are stored
    #[serde(default)]
    pub secrets_backend: SecretsBackend,

    /// One entry per local folder to upload
    pub jobs: Vec<JobConfig>,
}

/// OAuth client registration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiAppCredentials {
    #[serde(rename = "ClientID")]
    pub client_id: String,
    #[serde(rename = "ClientSecret")]
    pub client_secret: String,
}

impl std::fmt::Debug for ApiAppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiAppCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Secret storage backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretsBackend {
    /// OS keychain (macOS Keychain, Windows Credential Manager, Secret Service)
    #[default]
    Keyring,
}

/// One folder-to-account upload job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobConfig {
    /// Remote account identifier (usually the account email)
    pub account: String,

    /// Local folder to scan; `~` is expanded on load
    pub source_folder: PathBuf,

    #[serde(default)]
    pub make_albums: MakeAlbums,

    /// Remove the local file once it is uploaded and tracked
    #[serde(default)]
    pub delete_after_upload: bool,

    /// Include video files
    #[serde(default)]
    pub upload_videos: bool,

    #[serde(default = "default_include_patterns")]
    pub include_patterns: Vec<String>,

    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Album creation policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MakeAlbums {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, rename = "Use")]
    pub naming: AlbumNaming,
}

/// How an album title is derived from a file's location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlbumNaming {
    /// Name of the file's parent directory
    #[default]
    FolderName,
    /// Parent path relative to the source folder, components joined with `_`
    FolderPath,
}

fn default_include_patterns() -> Vec<String> {
    vec![ALL_FILES_TAG.to_string()]
}

impl AppConfig {
    /// Read, parse and validate `<config_dir>/config.json`
    pub fn load(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        let raw = std::fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;

        let mut config = Self::from_json(&raw).map_err(|source| Error::Parse { path, source })?;
        config.expand_paths(dirs::home_dir().as_deref());
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration JSON without validating it
    pub fn from_json(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Path of the upload tracker database for `config_dir`
    pub fn tracker_db_path(config_dir: &Path) -> PathBuf {
        config_dir.join(TRACKER_DB_NAME)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Client ID and secret are not empty
    /// - At least one job is configured
    /// - Every job names an account
    /// - Every source folder exists and is a directory
    pub fn validate(&self) -> Result<()> {
        if self.api_app_credentials.client_id.trim().is_empty() {
            return Err(Error::Config(
                "APIAppCredentials.ClientID cannot be empty".to_string(),
            ));
        }

        if self.api_app_credentials.client_secret.trim().is_empty() {
            return Err(Error::Config(
                "APIAppCredentials.ClientSecret cannot be empty".to_string(),
            ));
        }

        if self.jobs.is_empty() {
            return Err(Error::Config(
                "At least one job must be configured in Jobs".to_string(),
            ));
        }

        for (index, job) in self.jobs.iter().enumerate() {
            job.validate()
                .map_err(|e| Error::Config(format!("Jobs[{}]: {}", index, e)))?;
        }

        Ok(())
    }

    /// Distinct accounts in configuration order
    pub fn accounts(&self) -> Vec<&str> {
        let mut accounts: Vec<&str> = Vec::new();
        for job in &self.jobs {
            if !accounts.contains(&job.account.as_str()) {
                accounts.push(&job.account);
            }
        }
        accounts
    }

    fn expand_paths(&mut self, home: Option<&Path>) {
        for job in &mut self.jobs {
            job.source_folder = expand_home(&job.source_folder, home);
        }
    }
}

impl JobConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.account.trim().is_empty() {
            return Err("Account cannot be empty".to_string());
        }

        if !self.source_folder.exists() {
            return Err(format!(
                "SourceFolder {} does not exist",
                self.source_folder.display()
            ));
        }

        if !self.source_folder.is_dir() {
            return Err(format!(
                "SourceFolder {} is not a directory",
                self.source_folder.display()
            ));
        }

        Ok(())
    }
}

/// Replace a leading `~` with `home`; other paths are returned unchanged
fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return path.to_path_buf();
    };

    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}
