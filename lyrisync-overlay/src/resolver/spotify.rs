//! Spotify catalog search with web-player color lyrics
//!
//! Two credentials are involved: an app token from the client-credentials
//! flow for catalog search, and a web-player token derived from the `sp_dc`
//! cookie for the lyrics endpoint. Both are cached until shortly before
//! expiry; a 401 invalidates the token and retries once.

use super::credentials::{AccessToken, TokenCache};
use super::http::send_json;
use super::{Candidate, LyricsProvider, ProviderError};
use crate::lyrics::{derive_lines, LyricLine, TimedText};
use async_trait::async_trait;
use lyrisync_common::config::SpotifyConfig;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const SEARCH_LIMIT: &str = "3";
const WEB_PLAYER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/101.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct AppTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebPlayerTokenResponse {
    access_token: String,
    access_token_expiration_timestamp_ms: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<Track>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<NamedEntity>,
    pub album: Option<Album>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ColorLyricsResponse {
    pub lyrics: ColorLyrics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorLyrics {
    #[serde(default)]
    pub sync_type: Option<String>,
    #[serde(default)]
    pub lines: Vec<ColorLyricsLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorLyricsLine {
    /// Decimal string
    pub start_time_ms: String,
    pub words: String,
}

/// Strip "(feat. ...)", "(Remastered)" and " - Live" style suffixes
pub fn clean_title(name: &str) -> String {
    let base = name.split('(').next().unwrap_or(name);
    let base = base.split(" - ").next().unwrap_or(base);
    base.trim().to_string()
}

/// Most popular track among the search results
pub fn best_track(tracks: &[Track]) -> Option<&Track> {
    // max_by_key returns the last maximum; keep the first on ties
    tracks
        .iter()
        .rev()
        .max_by_key(|t| t.popularity)
}

impl Track {
    fn to_candidate(&self) -> Candidate {
        Candidate {
            id: self.id.clone(),
            title: clean_title(&self.name),
            artist: self
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            cover_art: self
                .album
                .as_ref()
                .and_then(|a| a.images.first())
                .map(|i| i.url.clone()),
            duration_ms: self.duration_ms,
        }
    }
}

/// Start-time lines of a color-lyrics body; unsynced lyrics yield nothing
pub fn color_lyrics_to_timed(lyrics: &ColorLyrics) -> Result<Vec<TimedText>, ProviderError> {
    if lyrics.sync_type.as_deref() == Some("UNSYNCED") {
        return Ok(Vec::new());
    }
    lyrics
        .lines
        .iter()
        .map(|line| {
            line.start_time_ms
                .trim()
                .parse::<u64>()
                .map(|start| TimedText::new(start, line.words.trim()))
                .map_err(|e| ProviderError::Parse(format!("bad startTimeMs: {}", e)))
        })
        .collect()
}

pub struct SpotifyProvider {
    client: reqwest::Client,
    accounts_base_url: String,
    api_base_url: String,
    web_player_base_url: String,
    lyrics_base_url: String,
    client_id: String,
    client_secret: String,
    sp_dc_cookie: String,
    app_token: TokenCache,
    web_player_token: TokenCache,
}

impl SpotifyProvider {
    /// `None` unless client id, secret and `sp_dc` cookie are all set
    pub fn from_config(client: reqwest::Client, config: &SpotifyConfig) -> Option<Self> {
        if !config.is_complete() {
            return None;
        }
        Some(Self {
            client,
            accounts_base_url: trim_base(&config.accounts_base_url),
            api_base_url: trim_base(&config.api_base_url),
            web_player_base_url: trim_base(&config.web_player_base_url),
            lyrics_base_url: trim_base(&config.lyrics_base_url),
            client_id: config.client_id.clone()?,
            client_secret: config.client_secret.clone()?,
            sp_dc_cookie: config.sp_dc_cookie.clone()?,
            app_token: TokenCache::new("spotify app"),
            web_player_token: TokenCache::new("spotify web player"),
        })
    }

    async fn app_token(&self) -> Result<String, ProviderError> {
        self.app_token
            .get_or_refresh(|| async {
                let request = self
                    .client
                    .post(format!("{}/api/token", self.accounts_base_url))
                    .basic_auth(&self.client_id, Some(&self.client_secret))
                    .form(&[("grant_type", "client_credentials")]);
                let response: AppTokenResponse = send_json(request)
                    .await?
                    .ok_or_else(|| ProviderError::Credential("token endpoint not found".to_string()))?;
                info!("Obtained Spotify app token");
                Ok(AccessToken::new(
                    response.access_token,
                    Duration::from_secs(response.expires_in),
                ))
            })
            .await
    }

    async fn web_player_token(&self) -> Result<String, ProviderError> {
        self.web_player_token
            .get_or_refresh(|| async {
                let request = self
                    .client
                    .get(format!("{}/get_access_token", self.web_player_base_url))
                    .query(&[("reason", "transport"), ("productType", "web_player")])
                    .header("User-Agent", WEB_PLAYER_AGENT)
                    .header("App-Platform", "WebPlayer")
                    .header("Cookie", format!("sp_dc={}", self.sp_dc_cookie));
                let response: WebPlayerTokenResponse = send_json(request)
                    .await?
                    .ok_or_else(|| ProviderError::Credential("token endpoint not found".to_string()))?;
                info!("Obtained Spotify web player token");
                Ok(AccessToken::expiring_at_unix_ms(
                    response.access_token,
                    response.access_token_expiration_timestamp_ms,
                ))
            })
            .await
    }

    async fn search_once(&self, query: &str) -> Result<Option<SearchResponse>, ProviderError> {
        let token = self.app_token().await?;
        let request = self
            .client
            .get(format!("{}/search", self.api_base_url))
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", SEARCH_LIMIT)]);
        send_json(request).await
    }

    async fn lyrics_once(&self, track_id: &str) -> Result<Option<ColorLyricsResponse>, ProviderError> {
        let token = self.web_player_token().await?;
        let request = self
            .client
            .get(format!("{}/track/{}", self.lyrics_base_url, track_id))
            .bearer_auth(token)
            .header("User-Agent", WEB_PLAYER_AGENT)
            .header("App-Platform", "WebPlayer")
            .query(&[("format", "json"), ("market", "from_token")]);
        send_json(request).await
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[async_trait]
impl LyricsProvider for SpotifyProvider {
    fn name(&self) -> &'static str {
        "spotify"
    }

    async fn search(&self, title: &str, artist: &str) -> Result<Option<Candidate>, ProviderError> {
        let query = format!("{} {}", title, artist);
        debug!("Searching Spotify for '{}'", query);

        let response = match self.search_once(&query).await {
            Err(ProviderError::Unauthorized) => {
                self.app_token.invalidate().await;
                self.search_once(&query).await?
            }
            other => other?,
        };

        Ok(response
            .and_then(|r| best_track(&r.tracks.items).map(Track::to_candidate)))
    }

    async fn fetch_lines(
        &self,
        candidate: &Candidate,
        total_duration_ms: u64,
    ) -> Result<Option<Vec<LyricLine>>, ProviderError> {
        let response = match self.lyrics_once(&candidate.id).await {
            Err(ProviderError::Unauthorized) => {
                self.web_player_token.invalidate().await;
                self.lyrics_once(&candidate.id).await?
            }
            other => other?,
        };
        let Some(response) = response else {
            return Ok(None);
        };

        let timed = color_lyrics_to_timed(&response.lyrics)?;
        if timed.is_empty() {
            return Ok(None);
        }
        derive_lines(timed, total_duration_ms)
            .map(Some)
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}
