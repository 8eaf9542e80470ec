use clap::{Args, Parser, Subcommand};
use clap::builder::TypedValueParser;
use core_runtime::logging::{LogFormat, LogLevel, LoggingConfig};
use core_sync::{DEFAULT_DEDUPE_WORKERS, DEFAULT_UPLOAD_WORKERS};
use std::path::PathBuf;
use std::str::FromStr;

/// photosync - Upload local folders to Google Photos and tidy duplicate albums
#[derive(Parser, Debug)]
#[command(name = "photosync")]
#[command(version)]
#[command(about = "Upload local media to Google Photos", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log output format (pretty, json, compact)
    #[arg(long = "log-format", global = true, value_parser = LogFormat::from_str)]
    pub log_format: Option<LogFormat>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload every configured folder
    Push(PushArgs),
    /// Merge remote albums that share a title
    Dedupe(DedupeArgs),
    /// Store a refresh token for an account in the secret store
    Auth(AuthArgs),
}

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Configuration directory holding config.json
    #[arg(long = "config-dir", env = "PHOTOSYNC_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Number of concurrent uploads
    #[arg(long, default_value_t = DEFAULT_UPLOAD_WORKERS, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub workers: usize,
}

#[derive(Args, Debug)]
pub struct DedupeArgs {
    /// Configuration directory holding config.json
    #[arg(long = "config-dir", env = "PHOTOSYNC_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Number of concurrent merges
    #[arg(long, default_value_t = DEFAULT_DEDUPE_WORKERS, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub workers: usize,
}

#[derive(Args)]
pub struct AuthArgs {
    /// Configuration directory holding config.json
    #[arg(long = "config-dir", env = "PHOTOSYNC_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Account the token belongs to
    #[arg(long)]
    pub account: String,

    /// Refresh token; read from stdin when omitted
    #[arg(long = "refresh-token", env = "PHOTOSYNC_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for AuthArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthArgs")
            .field("config_dir", &self.config_dir)
            .field("account", &self.account)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Cli {
    pub fn logging_config(&self) -> LoggingConfig {
        let level = if self.debug {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };

        LoggingConfig::default()
            .with_format(self.log_format.unwrap_or_default())
            .with_level(level)
    }
}
