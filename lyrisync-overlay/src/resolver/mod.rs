//! Lyrics resolution: cache and provider ports, the pipeline, and adapters
//!
//! The pipeline looks up the cache first, then asks each provider in order.
//! Providers report failures as `ProviderError`; the pipeline converts every
//! provider call into a `ProviderOutcome` so that trying the next provider
//! is an explicit branch.

pub mod cache;
pub mod credentials;
pub mod http;
pub mod lrclib;
pub mod netease;
pub mod pipeline;
pub mod spotify;

use crate::lyrics::{LineIndex, LyricLine};
use async_trait::async_trait;
use thiserror::Error;

pub use cache::SqliteLyricsCache;
pub use pipeline::ResolutionPipeline;

/// Best-ranked search result of one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Provider-specific identifier used to fetch lines
    pub id: String,
    pub title: String,
    pub artist: String,
    pub cover_art: Option<String>,
    /// Track length; 0 when the provider does not know it
    pub duration_ms: u64,
}

/// Provider failure taxonomy
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Credential rejected")]
    Unauthorized,

    #[error("Credential refresh failed: {0}")]
    Credential(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if let Some(status) = e.status() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                ProviderError::Unauthorized
            } else {
                ProviderError::Status(status.as_u16(), e.to_string())
            }
        } else if e.is_decode() {
            ProviderError::Parse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// Result of asking one provider
#[derive(Debug)]
pub enum ProviderOutcome {
    Hit(LineIndex),
    Miss,
    Failed(ProviderError),
}

/// Durable store of resolved lyrics keyed by the literal query strings
#[async_trait]
pub trait LyricsCache: Send + Sync {
    async fn get(&self, title: &str, artist: &str) -> crate::Result<Option<LineIndex>>;

    async fn put(&self, title: &str, artist: &str, index: &LineIndex) -> crate::Result<()>;
}

/// One lyrics source
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Short name recorded as the lyrics source
    fn name(&self) -> &'static str;

    /// Best candidate for the query, if any
    async fn search(&self, title: &str, artist: &str) -> Result<Option<Candidate>, ProviderError>;

    /// Time-ordered lines of `candidate`
    ///
    /// Line ends are derived from the next line's start and, for the last
    /// line, `total_duration_ms`.
    async fn fetch_lines(
        &self,
        candidate: &Candidate,
        total_duration_ms: u64,
    ) -> Result<Option<Vec<LyricLine>>, ProviderError>;
}
