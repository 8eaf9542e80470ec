use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Account {account} is not authenticated; store a refresh token for it first")]
    NotAuthenticated { account: String },

    #[error("Stored credential for {account} is invalid: {reason}")]
    InvalidCredential { account: String, reason: String },

    #[error("Auth error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
