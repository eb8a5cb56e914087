//! Album CLI - Upload photos to the shared album from the terminal
//!
//! Hosts the same selection, resize, upload and gallery pipeline as the web
//! view, backed by Cloudflare R2.

mod cli;
mod commands;
mod error;

use std::sync::Arc;

use album_core::environment::ClientSignals;
use album_core::storage::{BlobStore, R2Config, R2Storage};
use album_core::{AlbumConfig, AppState};
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::check_browser::run_check_browser;
use crate::commands::config::run_config;
use crate::commands::list::run_list;
use crate::commands::upload::run_upload;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,album_core=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AlbumConfig::from_env()?;

    match cli.command {
        Commands::Upload {
            files,
            captions,
            json,
        } => {
            let mut state = open_state(config)?;
            run_upload(&mut state, &files, &captions, json).await?;
        }
        Commands::List { page, json } => {
            let mut state = open_state(config)?;
            run_list(&mut state, page, json).await?;
        }
        Commands::CheckBrowser {
            user_agent,
            globals,
            dom_classes,
        } => {
            let signals = ClientSignals {
                user_agent,
                globals,
                dom_classes,
            };
            run_check_browser(&signals)?;
        }
        Commands::Config { viewport_width } => {
            let storage = R2Config::from_env()?;
            run_config(&config, storage.as_ref(), viewport_width)?;
        }
    }

    Ok(())
}

fn open_state(config: AlbumConfig) -> Result<AppState, CliError> {
    let r2 = R2Config::from_env()?.ok_or(CliError::StorageNotConfigured)?;
    tracing::debug!(bucket = %r2.bucket, "Using R2 storage");
    let store: Arc<dyn BlobStore> = Arc::new(R2Storage::new(r2, config.url_ttl()));
    Ok(AppState::new(config, store)?)
}
