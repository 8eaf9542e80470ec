//! # Host Bridge Traits
//!
//! Capability traits that the sync core depends on, implemented per host.
//!
//! ## Overview
//!
//! The core never talks to the network, the disk or the OS keychain directly.
//! Each capability it needs is a trait defined here; `bridge-desktop` and
//! `provider-google-photos` ship the production implementations and tests
//! substitute doubles.
//!
//! ## Traits
//!
//! ### Remote service
//! - [`PhotoService`](photos::PhotoService) - Upload, album listing, batch association
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Local file reads and deletes
//!
//! ### State
//! - [`FileTracker`](tracker::FileTracker) - Idempotency ledger shared by upload workers
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (Keychain/Secret Service)
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert their platform errors into it and keep enough context (paths, HTTP
//! status) for the message to be actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`; the upload pool shares a single
//! instance of each across its workers.

pub mod error;
pub mod http;
pub mod photos;
pub mod storage;
pub mod tracker;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use photos::{Album, MediaItem, Page, PhotoService};
pub use storage::{FileSystemAccess, SecureStore};
pub use tracker::{Claim, FileTracker, TrackState, TrackedFile};
