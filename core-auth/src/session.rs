//! # Account Sessions
//!
//! Per-account access tokens backed by refresh tokens in the secure store.
//!
//! ## Overview
//!
//! Every configured account has its refresh token stored under the key
//! `photosync/<account>`. [`SessionManager::access_token`] loads it, runs
//! the refresh grant and caches the resulting access token in memory until
//! it is about to expire. Concurrent callers for the same account share one
//! refresh.
//!
//! [`AccountSession`] binds a manager to one account and implements
//! [`AccessTokenProvider`], which is what remote connectors hold on to.

use crate::error::{AuthError, Result};
use crate::oauth::OAuthClient;
use crate::types::OAuthTokens;
use async_trait::async_trait;
use bridge_traits::SecureStore;
use core_runtime::logging::redact_if_sensitive;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Refresh this many seconds before the access token actually expires
const TOKEN_REFRESH_BUFFER_SECS: i64 = 300;

/// Prefix of the secure-store key holding an account's refresh token
pub const SECRET_KEY_PREFIX: &str = "photosync/";

/// Secure-store key for `account`
pub fn secret_key(account: &str) -> String {
    format!("{}{}", SECRET_KEY_PREFIX, account)
}

/// Source of bearer tokens for one authenticated account
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A currently valid access token
    async fn access_token(&self) -> Result<String>;
}

/// Per-account token cache and refresh coordinator.
pub struct SessionManager {
    oauth: OAuthClient,
    secure_store: Arc<dyn SecureStore>,
    tokens: Mutex<HashMap<String, OAuthTokens>>,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionManager {
    pub fn new(oauth: OAuthClient, secure_store: Arc<dyn SecureStore>) -> Self {
        Self {
            oauth,
            secure_store,
            tokens: Mutex::new(HashMap::new()),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Bind this manager to one account
    pub fn session(self: &Arc<Self>, account: impl Into<String>) -> AccountSession {
        AccountSession {
            manager: Arc::clone(self),
            account: account.into(),
        }
    }

    /// Get a valid access token for `account`, refreshing it if needed.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] when no refresh token is stored
    /// - [`AuthError::InvalidCredential`] when the stored value is not UTF-8
    /// - [`AuthError::SecureStorageUnavailable`] when the store cannot be read
    /// - any error from the refresh grant
    #[instrument(skip(self, account), fields(account = %redact_if_sensitive("account", account)))]
    pub async fn access_token(&self, account: &str) -> Result<String> {
        if let Some(token) = self.cached_token(account).await {
            return Ok(token);
        }

        let refresh_lock = {
            let mut locks = self.refresh_locks.lock().await;
            locks
                .entry(account.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.cached_token(account).await {
            return Ok(token);
        }

        let refresh_token = self.load_refresh_token(account).await?;
        let tokens = self.oauth.refresh_access_token(&refresh_token).await?;

        if let Some(rotated) = tokens
            .refresh_token
            .as_deref()
            .filter(|rotated| *rotated != refresh_token)
        {
            self.secure_store
                .set_secret(&secret_key(account), rotated.as_bytes())
                .await
                .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?;
            debug!("Stored rotated refresh token");
        }

        info!(expires_at = %tokens.expires_at, "Session ready");

        let access_token = tokens.access_token.clone();
        self.tokens
            .lock()
            .await
            .insert(account.to_string(), tokens);

        Ok(access_token)
    }

    /// Drop the cached access token for `account`
    pub async fn invalidate(&self, account: &str) {
        self.tokens.lock().await.remove(account);
    }

    async fn cached_token(&self, account: &str) -> Option<String> {
        let tokens = self.tokens.lock().await;
        tokens
            .get(account)
            .filter(|t| !t.is_expired_with_buffer(TOKEN_REFRESH_BUFFER_SECS))
            .map(|t| t.access_token.clone())
    }

    async fn load_refresh_token(&self, account: &str) -> Result<String> {
        let secret = self
            .secure_store
            .get_secret(&secret_key(account))
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?
            .ok_or_else(|| AuthError::NotAuthenticated {
                account: account.to_string(),
            })?;

        let token = String::from_utf8(secret).map_err(|e| AuthError::InvalidCredential {
            account: account.to_string(),
            reason: e.to_string(),
        })?;

        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::NotAuthenticated {
                account: account.to_string(),
            });
        }

        Ok(token.to_string())
    }
}

/// A [`SessionManager`] bound to one account.
#[derive(Clone)]
pub struct AccountSession {
    manager: Arc<SessionManager>,
    account: String,
}

impl AccountSession {
    pub fn account(&self) -> &str {
        &self.account
    }
}

#[async_trait]
impl AccessTokenProvider for AccountSession {
    async fn access_token(&self) -> Result<String> {
        self.manager.access_token(&self.account).await
    }
}

/// Fixed token, for tests and one-off tooling
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
