//! SQLite-backed lyrics cache
//!
//! Songs and their lines are stored once; `querys` maps each literal
//! (title, artist) lookup key to a song. Also serves the cache
//! administration commands.

use super::LyricsCache;
use crate::lyrics::{LineIndex, LyricLine, SongMeta};
use crate::{Error, Result};
use async_trait::async_trait;
use lyrisync_common::db::{CachedLineRow, CachedSongRow};
use sqlx::SqlitePool;
use tracing::debug;

#[derive(Clone)]
pub struct SqliteLyricsCache {
    pool: SqlitePool,
}

impl SqliteLyricsCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All cached songs, newest first
    pub async fn list_songs(&self) -> Result<Vec<CachedSongRow>> {
        let rows = sqlx::query_as::<_, CachedSongRow>(
            r#"
            SELECT id, title, artist, cover_link, duration_ms, source,
                   CAST(created_at AS TEXT) AS created_at
            FROM songs
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn song(&self, song_id: i64) -> Result<Option<CachedSongRow>> {
        let row = sqlx::query_as::<_, CachedSongRow>(
            r#"
            SELECT id, title, artist, cover_link, duration_ms, source,
                   CAST(created_at AS TEXT) AS created_at
            FROM songs
            WHERE id = ?
            "#,
        )
        .bind(song_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Lines of one song in playback order
    pub async fn song_lines(&self, song_id: i64) -> Result<Vec<CachedLineRow>> {
        let rows = sqlx::query_as::<_, CachedLineRow>(
            r#"
            SELECT line_no, text, start_ms, end_ms, duration_ms
            FROM lyrics_lines
            WHERE song_id = ?
            ORDER BY line_no
            "#,
        )
        .bind(song_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Query keys that resolve to one song
    pub async fn song_queries(&self, song_id: i64) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT query_title, query_artist FROM querys WHERE song_id = ? ORDER BY id",
        )
        .bind(song_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete a song with its lines and query keys; false if it did not exist
    pub async fn delete_song(&self, song_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(song_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn load_index(&self, song: CachedSongRow) -> Result<Option<LineIndex>> {
        let rows = self.song_lines(song.id).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let lines = rows
            .into_iter()
            .map(|row| {
                LyricLine::new(row.text, to_ms(row.start_ms), to_ms(row.end_ms)).ok_or_else(|| {
                    Error::Invariant(format!(
                        "cached line {} of song {} ends before it starts",
                        row.line_no, song.id
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let meta = SongMeta {
            title: song.title,
            artist: song.artist,
            cover_art: song.cover_link,
            source: song.source,
        };
        LineIndex::new(lines, meta)
            .map(Some)
            .map_err(|e| Error::Invariant(e.to_string()))
    }
}

#[async_trait]
impl LyricsCache for SqliteLyricsCache {
    async fn get(&self, title: &str, artist: &str) -> Result<Option<LineIndex>> {
        let song = sqlx::query_as::<_, CachedSongRow>(
            r#"
            SELECT s.id, s.title, s.artist, s.cover_link, s.duration_ms, s.source,
                   CAST(s.created_at AS TEXT) AS created_at
            FROM querys q
            JOIN songs s ON s.id = q.song_id
            WHERE q.query_title = ? AND q.query_artist = ?
            "#,
        )
        .bind(title)
        .bind(artist)
        .fetch_optional(&self.pool)
        .await?;

        match song {
            Some(song) => self.load_index(song).await,
            None => Ok(None),
        }
    }

    async fn put(&self, title: &str, artist: &str, index: &LineIndex) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let song_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO songs (title, artist, cover_link, duration_ms, source)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(index.title())
        .bind(index.artist())
        .bind(index.cover_art())
        .bind(index.duration_ms() as i64)
        .bind(&index.meta().source)
        .fetch_one(&mut *tx)
        .await?;

        for (line_no, line) in index.lines().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO lyrics_lines (song_id, line_no, text, start_ms, end_ms, duration_ms)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(song_id)
            .bind(line_no as i64)
            .bind(line.text())
            .bind(line.start_ms() as i64)
            .bind(line.end_ms() as i64)
            .bind(line.duration_ms() as i64)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO querys (query_title, query_artist, song_id)
            VALUES (?, ?, ?)
            ON CONFLICT(query_title, query_artist) DO UPDATE SET song_id = excluded.song_id
            "#,
        )
        .bind(title)
        .bind(artist)
        .bind(song_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            "Cached song {} ('{}' by '{}') for query '{}' by '{}'",
            song_id,
            index.title(),
            index.artist(),
            title,
            artist
        );
        Ok(())
    }
}

fn to_ms(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
