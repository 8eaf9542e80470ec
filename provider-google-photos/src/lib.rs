//! # Google Photos Provider
//!
//! Implements the `PhotoService` trait for the Google Photos Library API v1.
//!
//! ## Overview
//!
//! This crate provides:
//! - Album listing, lookup and creation
//! - Album content search with page tokens
//! - Batch association of media items with an album
//! - Two-step uploads (raw bytes, then `mediaItems:batchCreate`)
//!
//! Authorization comes from a [`core_auth::AccessTokenProvider`]; every
//! request is a single attempt.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::GooglePhotosConnector;
pub use error::{GooglePhotosError, Result};
