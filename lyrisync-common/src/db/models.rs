//! Row models for the lyrics cache tables

use serde::Serialize;

/// One cached song, as listed by the cache administration commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CachedSongRow {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub cover_link: Option<String>,
    pub duration_ms: i64,
    pub source: String,
    pub created_at: String,
}

/// One stored lyric line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CachedLineRow {
    pub line_no: i64,
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub duration_ms: i64,
}
