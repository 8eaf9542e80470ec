//! # Authentication Module
//!
//! OAuth 2.0 access tokens for the configured photo accounts.
//!
//! ## Overview
//!
//! - [`OAuthClient`] performs the refresh-token grant against the token
//!   endpoint through the injected `HttpClient`.
//! - [`SessionManager`] reads each account's refresh token from the
//!   `SecureStore` and caches access tokens until they expire.
//! - [`AccessTokenProvider`] is the seam remote connectors depend on.

pub mod error;
pub mod oauth;
pub mod session;
pub mod types;

pub use error::{AuthError, Result};
pub use oauth::{OAuthClient, OAuthConfig};
pub use session::{secret_key, AccessTokenProvider, AccountSession, SessionManager, StaticToken};
pub use types::OAuthTokens;
