//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the photosync crates:
//! - Logging and tracing initialisation
//! - Configuration loading and validation
//!
//! ## Overview
//!
//! The binary loads an [`AppConfig`](config::AppConfig) from its configuration
//! directory and installs the global `tracing` subscriber before any sync work
//! starts. Both are setup steps: failures here abort the run.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
