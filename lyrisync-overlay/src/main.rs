//! lyrisync-overlay - Main entry point
//!
//! Runs the lyrics overlay engine, or inspects the lyrics cache.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lyrisync_common::config::{resolve_root_folder, TomlConfig};
use lyrisync_common::db::init_database;
use lyrisync_common::time::format_ms;
use lyrisync_overlay::resolver::SqliteLyricsCache;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for lyrisync-overlay
#[derive(Parser, Debug)]
#[command(name = "lyrisync-overlay")]
#[command(about = "Synchronized lyrics overlay for rhythm games")]
#[command(version)]
struct Args {
    /// Root folder holding the lyrics cache
    #[arg(short, long, env = "LYRISYNC_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "LYRISYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the overlay (default)
    Run,
    /// Inspect or edit the lyrics cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// List cached songs
    List,
    /// Show one song with its lines and query keys
    Show { id: i64 },
    /// Delete one song with its lines and query keys
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_resolved(args.config.as_deref())
        .context("Failed to load configuration")?;

    let default_filter = format!(
        "lyrisync_overlay={level},lyrisync_common={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting lyrisync-overlay v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    info!("Root folder: {}", root_folder.display());

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_overlay(config, &root_folder).await,
        Command::Cache(command) => run_cache_command(command, &config, &root_folder).await,
    }
}

async fn run_overlay(config: TomlConfig, root_folder: &Path) -> Result<()> {
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    lyrisync_overlay::engine::run(config, root_folder, cancel)
        .await
        .context("Overlay engine failed")?;

    info!("Shutdown complete");
    Ok(())
}

async fn run_cache_command(command: CacheCommand, config: &TomlConfig, root_folder: &Path) -> Result<()> {
    let db_path = config.database_path(root_folder);
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open lyrics cache {}", db_path.display()))?;
    let cache = SqliteLyricsCache::new(pool);

    match command {
        CacheCommand::List => {
            let songs = cache.list_songs().await?;
            if songs.is_empty() {
                println!("Lyrics cache is empty");
            }
            for song in songs {
                println!(
                    "{:>5}  {} - {}  [{}] ({}, {})",
                    song.id,
                    song.artist,
                    song.title,
                    format_ms(u64::try_from(song.duration_ms).unwrap_or(0)),
                    song.source,
                    song.created_at
                );
            }
        }
        CacheCommand::Show { id } => {
            let Some(song) = cache.song(id).await? else {
                bail!("No cached song with id {}", id);
            };
            println!("Song: {} by {}", song.title, song.artist);
            println!("Source: {}", song.source);
            if let Some(cover) = &song.cover_link {
                println!("Cover: {}", cover);
            }
            for (title, artist) in cache.song_queries(id).await? {
                println!("Query: '{}' by '{}'", title, artist);
            }
            for line in cache.song_lines(id).await? {
                println!(
                    "[{}-{}]: {} [{} ms]",
                    format_ms(u64::try_from(line.start_ms).unwrap_or(0)),
                    format_ms(u64::try_from(line.end_ms).unwrap_or(0)),
                    line.text,
                    line.duration_ms
                );
            }
        }
        CacheCommand::Delete { id } => {
            if cache.delete_song(id).await? {
                println!("Deleted song {}", id);
            } else {
                bail!("No cached song with id {}", id);
            }
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
