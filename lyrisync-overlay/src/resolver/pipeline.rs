//! Cache-then-providers resolution

use super::{LyricsCache, LyricsProvider, ProviderError, ProviderOutcome};
use crate::lyrics::{LineIndex, SongMeta};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Resolves (title, artist) queries into line indexes
pub struct ResolutionPipeline {
    cache: Arc<dyn LyricsCache>,
    providers: Vec<Arc<dyn LyricsProvider>>,
    /// Upper bound for one provider's search plus fetch
    provider_timeout: Duration,
}

impl ResolutionPipeline {
    pub fn new(
        cache: Arc<dyn LyricsCache>,
        providers: Vec<Arc<dyn LyricsProvider>>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            providers,
            provider_timeout,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolve lyrics for a query; `None` when every source missed
    ///
    /// A provider hit is written back to the cache under the literal query
    /// strings. Cache and provider failures are logged and treated as misses.
    /// `reported_duration_ms` is the game's song length, used to close the
    /// last line when a provider does not know the track length.
    pub async fn resolve(
        &self,
        title: &str,
        artist: &str,
        reported_duration_ms: Option<u64>,
    ) -> Option<LineIndex> {
        match self.cache.get(title, artist).await {
            Ok(Some(index)) => {
                info!("Cache hit for '{}' by '{}'", title, artist);
                return Some(index);
            }
            Ok(None) => debug!("Cache miss for '{}' by '{}'", title, artist),
            Err(e) => warn!("Cache lookup failed for '{}' by '{}': {}", title, artist, e),
        }

        for provider in &self.providers {
            match self
                .query_provider(provider.as_ref(), title, artist, reported_duration_ms)
                .await
            {
                ProviderOutcome::Hit(index) => {
                    info!(
                        provider = provider.name(),
                        "Resolved '{}' by '{}' as '{}' by '{}' ({} lines)",
                        title,
                        artist,
                        index.title(),
                        index.artist(),
                        index.len()
                    );
                    if let Err(e) = self.cache.put(title, artist, &index).await {
                        warn!("Failed to cache lyrics for '{}' by '{}': {}", title, artist, e);
                    }
                    return Some(index);
                }
                ProviderOutcome::Miss => {
                    debug!(provider = provider.name(), "No lyrics for '{}' by '{}'", title, artist);
                }
                ProviderOutcome::Failed(e) => {
                    warn!(provider = provider.name(), "Provider failed for '{}' by '{}': {}", title, artist, e);
                }
            }
        }

        info!("No lyrics found for '{}' by '{}'", title, artist);
        None
    }

    /// Ask one provider, bounded by the provider timeout
    pub async fn query_provider(
        &self,
        provider: &dyn LyricsProvider,
        title: &str,
        artist: &str,
        reported_duration_ms: Option<u64>,
    ) -> ProviderOutcome {
        let attempt = search_and_fetch(provider, title, artist, reported_duration_ms);
        match timeout(self.provider_timeout, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => ProviderOutcome::Failed(ProviderError::Timeout),
        }
    }
}

async fn search_and_fetch(
    provider: &dyn LyricsProvider,
    title: &str,
    artist: &str,
    reported_duration_ms: Option<u64>,
) -> ProviderOutcome {
    let candidate = match provider.search(title, artist).await {
        Ok(Some(candidate)) => candidate,
        Ok(None) => return ProviderOutcome::Miss,
        Err(e) => return ProviderOutcome::Failed(e),
    };

    let total_duration_ms = match candidate.duration_ms {
        0 => reported_duration_ms.unwrap_or(0),
        known => known,
    };
    let lines = match provider.fetch_lines(&candidate, total_duration_ms).await {
        Ok(Some(lines)) if !lines.is_empty() => lines,
        Ok(_) => return ProviderOutcome::Miss,
        Err(e) => return ProviderOutcome::Failed(e),
    };

    let meta = SongMeta {
        title: candidate.title,
        artist: candidate.artist,
        cover_art: candidate.cover_art,
        source: provider.name().to_string(),
    };
    match LineIndex::new(lines, meta) {
        Ok(index) => ProviderOutcome::Hit(index),
        Err(e) => ProviderOutcome::Failed(ProviderError::Parse(e.to_string())),
    }
}
