//! Database initialization
//!
//! Creates the cache database on first run and (re)creates its tables
//! idempotently on every start.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    // Connection options apply to every pooled connection, unlike a one-off PRAGMA.
    // WAL lets the CLI read the cache while the overlay writes to it.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_songs_table(&pool).await?;
    create_lyrics_lines_table(&pool).await?;
    create_querys_table(&pool).await?;

    Ok(pool)
}

/// Create the songs table
///
/// One row per resolved song, with the provider's canonical metadata.
pub async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            cover_link TEXT,
            duration_ms INTEGER NOT NULL,
            source TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the lyrics_lines table
pub async fn create_lyrics_lines_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lyrics_lines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id INTEGER NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
            line_no INTEGER NOT NULL,
            text TEXT NOT NULL,
            start_ms INTEGER NOT NULL,
            end_ms INTEGER NOT NULL,
            duration_ms INTEGER NOT NULL,
            UNIQUE(song_id, line_no)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the querys table
///
/// Maps the literal (title, artist) strings a lookup was made with to the
/// song it resolved to. Several query keys may point at the same song.
pub async fn create_querys_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS querys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            query_title TEXT NOT NULL,
            query_artist TEXT NOT NULL,
            song_id INTEGER NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
            UNIQUE(query_title, query_artist)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
