//! lrclib.net synced-lyrics provider

use super::http::send_json;
use super::{Candidate, LyricsProvider, ProviderError};
use crate::lyrics::{derive_lines, parse_lrc, LyricLine};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Search results considered when ranking
const MAX_CANDIDATES: usize = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LrclibRecord {
    pub id: i64,
    pub track_name: String,
    pub artist_name: String,
    /// Seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub synced_lyrics: Option<String>,
}

impl LrclibRecord {
    fn has_synced_lyrics(&self) -> bool {
        self.synced_lyrics
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    fn matches_exactly(&self, title: &str, artist: &str) -> bool {
        self.track_name.eq_ignore_ascii_case(title) && self.artist_name.eq_ignore_ascii_case(artist)
    }

    fn duration_ms(&self) -> u64 {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| (d * 1000.0) as u64)
            .unwrap_or(0)
    }
}

/// Pick the best record among the first `MAX_CANDIDATES`
///
/// Records without synced lyrics are never picked. Exact (case-insensitive)
/// title and artist matches rank first; otherwise search order is kept.
pub fn rank_records<'a>(
    records: &'a [LrclibRecord],
    title: &str,
    artist: &str,
) -> Option<&'a LrclibRecord> {
    let synced = || {
        records
            .iter()
            .take(MAX_CANDIDATES)
            .filter(|r| r.has_synced_lyrics())
    };
    synced()
        .find(|r| r.matches_exactly(title, artist))
        .or_else(|| synced().next())
}

pub struct LrclibProvider {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn search(&self, title: &str, artist: &str) -> Result<Option<Candidate>, ProviderError> {
        let url = format!("{}/search", self.base_url);
        debug!(url = %url, "Searching lrclib for '{}' by '{}'", title, artist);

        let request = self
            .client
            .get(&url)
            .query(&[("track_name", title), ("artist_name", artist)]);
        let records: Vec<LrclibRecord> = send_json(request).await?.unwrap_or_default();

        Ok(rank_records(&records, title, artist).map(|record| Candidate {
            id: record.id.to_string(),
            title: record.track_name.clone(),
            artist: record.artist_name.clone(),
            cover_art: None,
            duration_ms: record.duration_ms(),
        }))
    }

    async fn fetch_lines(
        &self,
        candidate: &Candidate,
        total_duration_ms: u64,
    ) -> Result<Option<Vec<LyricLine>>, ProviderError> {
        let url = format!("{}/get/{}", self.base_url, candidate.id);
        let Some(record) = send_json::<LrclibRecord>(self.client.get(&url)).await? else {
            return Ok(None);
        };
        let Some(synced) = record.synced_lyrics else {
            return Ok(None);
        };

        let timed = parse_lrc(&synced, true);
        if timed.is_empty() {
            return Ok(None);
        }
        derive_lines(timed, total_duration_ms)
            .map(Some)
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}
