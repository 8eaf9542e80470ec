//! photosync - Upload local folders to Google Photos
//!
//! # Usage
//!
//! ```bash
//! # Upload every configured folder with 5 workers
//! photosync push --config-dir ~/.config/photosync
//!
//! # Merge duplicate albums, one merge at a time
//! photosync dedupe --config-dir ~/.config/photosync
//!
//! # Store a refresh token for an account
//! photosync auth --config-dir ~/.config/photosync --account me@example.com < token.txt
//! ```

use anyhow::Result;
use clap::Parser;
use core_runtime::logging::init_logging;
use tokio_util::sync::CancellationToken;
use tracing::warn;

mod cli;
mod commands;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logging_config())?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight work");
            signal_token.cancel();
        }
    });

    match cli.command {
        Command::Push(args) => commands::push(args, cancel).await,
        Command::Dedupe(args) => commands::dedupe(args, cancel).await,
        Command::Auth(args) => commands::auth(args).await,
    }
}
