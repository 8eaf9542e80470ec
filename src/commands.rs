//! Command handlers wiring configuration, credentials and the sync core.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bridge_desktop::{KeyringSecureStore, ReqwestHttpClient, SqliteFileTracker, TokioFileSystem};
use bridge_traits::{FileSystemAccess, HttpClient, PhotoService, SecureStore};
use core_auth::{secret_key, AccessTokenProvider, OAuthClient, OAuthConfig, SessionManager};
use core_runtime::config::{AppConfig, SecretsBackend};
use core_runtime::logging::redact_if_sensitive;
use core_sync::{
    DedupeCoordinator, LocalFolderScanner, SessionFactory, SyncError, UploadConfig,
    UploadCoordinator,
};
use provider_google_photos::GooglePhotosConnector;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{AuthArgs, DedupeArgs, PushArgs};

/// Shared collaborators for one invocation
struct AppContext {
    config: AppConfig,
    file_system: Arc<dyn FileSystemAccess>,
    secure_store: Arc<dyn SecureStore>,
    http: Arc<dyn HttpClient>,
    sessions: Arc<SessionManager>,
}

impl AppContext {
    fn open(config_dir: &Path) -> Result<Self> {
        let config = AppConfig::load(config_dir).with_context(|| {
            format!(
                "please review your configuration: dir={}",
                config_dir.display()
            )
        })?;

        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);
        let secure_store: Arc<dyn SecureStore> = match config.secrets_backend {
            SecretsBackend::Keyring => Arc::new(KeyringSecureStore::new()),
        };

        let credentials = &config.api_app_credentials;
        let oauth = OAuthClient::new(
            OAuthConfig::google_photos(&credentials.client_id, &credentials.client_secret),
            Arc::clone(&http),
        );
        let sessions = Arc::new(SessionManager::new(oauth, Arc::clone(&secure_store)));

        Ok(Self {
            config,
            file_system: Arc::new(TokioFileSystem::new()),
            secure_store,
            http,
            sessions,
        })
    }

    fn session_factory(&self) -> Arc<dyn SessionFactory> {
        Arc::new(GooglePhotosSessions {
            http: Arc::clone(&self.http),
            file_system: Arc::clone(&self.file_system),
            sessions: Arc::clone(&self.sessions),
        })
    }
}

/// Opens a Google Photos connector per account, failing fast on bad credentials
struct GooglePhotosSessions {
    http: Arc<dyn HttpClient>,
    file_system: Arc<dyn FileSystemAccess>,
    sessions: Arc<SessionManager>,
}

#[async_trait]
impl SessionFactory for GooglePhotosSessions {
    async fn photo_service(&self, account: &str) -> core_sync::Result<Arc<dyn PhotoService>> {
        let session = self.sessions.session(account);
        session
            .access_token()
            .await
            .map_err(|e| SyncError::Session {
                account: account.to_string(),
                message: e.to_string(),
            })?;

        info!(account = %redact_if_sensitive("account", account), "Session ready");
        Ok(Arc::new(GooglePhotosConnector::new(
            Arc::clone(&self.http),
            Arc::clone(&self.file_system),
            Arc::new(session),
        )))
    }
}

pub async fn push(args: PushArgs, cancel: CancellationToken) -> Result<()> {
    let context = AppContext::open(&args.config_dir)?;

    let tracker_path = AppConfig::tracker_db_path(&args.config_dir);
    let tracker = SqliteFileTracker::new(tracker_path.clone())
        .await
        .with_context(|| format!("failed to open upload tracker at {}", tracker_path.display()))?;

    let coordinator = UploadCoordinator::new(
        context.session_factory(),
        Arc::new(LocalFolderScanner::new()),
        Arc::new(tracker),
        Arc::clone(&context.file_system),
        UploadConfig {
            worker_count: args.workers,
        },
    );

    let summary = coordinator.run(&context.config.jobs, cancel).await?;
    info!(
        "{} processed files: {} successfully, {} failed, {} cancelled",
        summary.submitted, summary.succeeded, summary.failed, summary.cancelled
    );
    if summary.failed_folders > 0 {
        warn!("{} source folders could not be scanned", summary.failed_folders);
    }
    Ok(())
}

pub async fn dedupe(args: DedupeArgs, cancel: CancellationToken) -> Result<()> {
    let context = AppContext::open(&args.config_dir)?;
    let accounts = context.config.accounts();

    let summary = DedupeCoordinator::new(context.session_factory(), args.workers)
        .run(&accounts, cancel)
        .await?;

    for report in &summary.reports {
        info!(
            account = %redact_if_sensitive("account", &report.account),
            albums = report.albums_scanned,
            merges = report.merges.len(),
            "Deduplicated account"
        );
        for url in report.deletion_candidates() {
            println!("To delete: {}", url);
        }
    }
    for (account, error) in &summary.failed_accounts {
        warn!(account = %redact_if_sensitive("account", account), error = %error, "Account skipped");
    }
    Ok(())
}

pub async fn auth(args: AuthArgs) -> Result<()> {
    let context = AppContext::open(&args.config_dir)?;
    if !context.config.accounts().contains(&args.account.as_str()) {
        bail!("account {} is not used by any configured job", args.account);
    }

    let refresh_token = match args.refresh_token {
        Some(token) => token,
        None => read_stdin_line().await?,
    };
    let refresh_token = refresh_token.trim();
    if refresh_token.is_empty() {
        bail!("refresh token cannot be empty");
    }

    context
        .secure_store
        .set_secret(&secret_key(&args.account), refresh_token.as_bytes())
        .await
        .context("failed to store refresh token")?;

    context
        .sessions
        .access_token(&args.account)
        .await
        .context("the stored refresh token was rejected")?;

    info!(account = %redact_if_sensitive("account", &args.account), "Credentials stored");
    Ok(())
}

async fn read_stdin_line() -> Result<String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    lines
        .next_line()
        .await
        .context("failed to read refresh token from stdin")?
        .context("no refresh token on stdin")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, source: &Path) {
        let raw = format!(
            r#"{{
                "APIAppCredentials": {{ "ClientID": "id", "ClientSecret": "secret" }},
                "Jobs": [{{ "Account": "me@example.com", "SourceFolder": {:?} }}]
            }}"#,
            source.display().to_string()
        );
        std::fs::write(dir.join("config.json"), raw).unwrap();
    }

    #[test]
    fn test_missing_config_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = AppContext::open(dir.path()).err().unwrap();

        assert!(format!("{:#}", error).contains("please review your configuration"));
    }

    #[tokio::test]
    async fn test_auth_rejects_unknown_account() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), dir.path());

        let result = auth(AuthArgs {
            config_dir: dir.path().to_path_buf(),
            account: "someone@example.com".to_string(),
            refresh_token: Some("token".to_string()),
        })
        .await;

        let message = result.unwrap_err().to_string();
        assert!(message.contains("not used by any configured job"));
    }
}
