//! NetEase Cloud Music provider (via a public API mirror)

use super::http::send_json;
use super::{Candidate, LyricsProvider, ProviderError};
use crate::lyrics::{derive_lines, parse_lrc, LyricLine};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const SEARCH_LIMIT: &str = "10";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub songs: Vec<Song>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Song {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    /// Milliseconds
    #[serde(default)]
    pub duration: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LyricResponse {
    #[serde(default)]
    pub lrc: Option<LrcBody>,
}

#[derive(Debug, Deserialize)]
pub struct LrcBody {
    #[serde(default)]
    pub lyric: String,
}

/// First song whose name equals `title` and whose artists include `artist`,
/// both compared case-insensitively
pub fn find_song<'a>(songs: &'a [Song], title: &str, artist: &str) -> Option<&'a Song> {
    let title = title.to_lowercase();
    let artist = artist.to_lowercase();
    songs.iter().find(|song| {
        song.name.to_lowercase() == title
            && song.artists.iter().any(|a| a.name.to_lowercase() == artist)
    })
}

pub struct NeteaseProvider {
    client: reqwest::Client,
    base_url: String,
}

impl NeteaseProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LyricsProvider for NeteaseProvider {
    fn name(&self) -> &'static str {
        "netease"
    }

    async fn search(&self, title: &str, artist: &str) -> Result<Option<Candidate>, ProviderError> {
        let keywords = format!("{} {}", title, artist);
        debug!("Searching NetEase for '{}'", keywords);

        let request = self.client.get(format!("{}/search", self.base_url)).query(&[
            ("keywords", keywords.as_str()),
            ("type", "1"),
            ("limit", SEARCH_LIMIT),
        ]);
        let songs = send_json::<SearchResponse>(request)
            .await?
            .and_then(|r| r.result)
            .map(|r| r.songs)
            .unwrap_or_default();

        Ok(find_song(&songs, title, artist).map(|song| Candidate {
            id: song.id.to_string(),
            title: song.name.clone(),
            artist: song
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            cover_art: None,
            duration_ms: song.duration,
        }))
    }

    async fn fetch_lines(
        &self,
        candidate: &Candidate,
        total_duration_ms: u64,
    ) -> Result<Option<Vec<LyricLine>>, ProviderError> {
        let request = self
            .client
            .get(format!("{}/lyric", self.base_url))
            .query(&[("id", candidate.id.as_str())]);
        let Some(lrc) = send_json::<LyricResponse>(request).await?.and_then(|r| r.lrc) else {
            return Ok(None);
        };

        let timed = parse_lrc(&lrc.lyric, false);
        if timed.is_empty() {
            return Ok(None);
        }
        derive_lines(timed, total_duration_ms)
            .map(Some)
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_BODY: &str = r#"{"result":{"songs":[
        {"id":1,"name":"Song (Remix)","artists":[{"name":"Band"}],"duration":100000},
        {"id":2,"name":"song","artists":[{"name":"Guest"},{"name":"BAND"}],"duration":215000}
    ]},"code":200}"#;

    #[test]
    fn test_find_song_exact_name_and_artist() {
        let response: SearchResponse = serde_json::from_str(SEARCH_BODY).unwrap();
        let songs = response.result.unwrap().songs;

        let song = find_song(&songs, "Song", "band").unwrap();
        assert_eq!(song.id, 2);
        assert_eq!(song.duration, 215_000);
        assert!(find_song(&songs, "Song", "Nobody").is_none());
    }

    #[test]
    fn test_empty_search_result() {
        let response: SearchResponse = serde_json::from_str(r#"{"result":{},"code":200}"#).unwrap();
        assert!(response.result.unwrap().songs.is_empty());
    }

    #[test]
    fn test_lyric_body_parses() {
        let body = r#"{"lrc":{"version":3,"lyric":"[by:someone]\n[00:00.00] 作词 : X\n[00:05.50]First\n[00:09.00]Second\n"}}"#;
        let response: LyricResponse = serde_json::from_str(body).unwrap();
        let timed = parse_lrc(&response.lrc.unwrap().lyric, false);

        let lines = derive_lines(timed, 12_000).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].text(), "First");
        assert_eq!(lines[2].end_ms(), 12_000);
    }
}
