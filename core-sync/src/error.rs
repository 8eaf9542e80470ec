use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Worker pool is not accepting jobs")]
    PoolClosed,

    #[error("Job {job_id} panicked: {message}")]
    JobPanicked { job_id: String, message: String },

    #[error("Failed to scan {folder}: {message}")]
    Scan { folder: String, message: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to open session for {account}: {message}")]
    Session { account: String, message: String },

    #[error("Cannot merge album {0} with itself")]
    SelfMerge(String),

    #[error("Failed to resolve album '{title}': {message}")]
    AlbumResolution { title: String, message: String },

    #[error("Result channel closed after {received} of {expected} results")]
    ResultsClosed { expected: usize, received: usize },
}

pub type Result<T> = std::result::Result<T, SyncError>;
