//! Shared fakes for integration tests
//!
//! In-memory cache and scripted providers that count their calls.

#![allow(dead_code)]

use async_trait::async_trait;
use lyrisync_overlay::lyrics::{LineIndex, LyricLine, SongMeta, TimedText};
use lyrisync_overlay::resolver::{Candidate, LyricsCache, LyricsProvider, ProviderError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// "Hello" at 1.0 s, "World" at 2.5 s, song length 4 s
pub fn hello_world(source: &str) -> LineIndex {
    LineIndex::from_timed_text(
        vec![TimedText::new(1000, "Hello"), TimedText::new(2500, "World")],
        4000,
        SongMeta {
            title: "Greeting".to_string(),
            artist: "The Testers".to_string(),
            cover_art: None,
            source: source.to_string(),
        },
    )
    .unwrap()
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<(String, String), LineIndex>>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl MemoryCache {
    pub fn with_entry(title: &str, artist: &str, index: LineIndex) -> Self {
        let cache = Self::default();
        cache
            .entries
            .lock()
            .unwrap()
            .insert((title.to_string(), artist.to_string()), index);
        cache
    }

    pub fn contains(&self, title: &str, artist: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .contains_key(&(title.to_string(), artist.to_string()))
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LyricsCache for MemoryCache {
    async fn get(&self, title: &str, artist: &str) -> lyrisync_overlay::Result<Option<LineIndex>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(title.to_string(), artist.to_string()))
            .cloned())
    }

    async fn put(&self, title: &str, artist: &str, index: &LineIndex) -> lyrisync_overlay::Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .insert((title.to_string(), artist.to_string()), index.clone());
        Ok(())
    }
}

/// What a scripted provider answers
#[derive(Clone)]
pub enum Script {
    Lines(Vec<(u64, &'static str)>),
    Miss,
    Fail,
    Hang,
}

pub struct ScriptedProvider {
    name: &'static str,
    script: Script,
    duration_ms: u64,
    pub searches: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &'static str, script: Script) -> Self {
        Self {
            name,
            script,
            duration_ms: 4000,
            searches: AtomicUsize::new(0),
        }
    }

    /// Track length reported on the candidate; 0 means unknown
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LyricsProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, title: &str, artist: &str) -> Result<Option<Candidate>, ProviderError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Lines(_) => Ok(Some(Candidate {
                id: format!("{}-1", self.name),
                title: title.to_string(),
                artist: artist.to_string(),
                cover_art: None,
                duration_ms: self.duration_ms,
            })),
            Script::Miss => Ok(None),
            Script::Fail => Err(ProviderError::Status(500, "boom".to_string())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
        }
    }

    async fn fetch_lines(
        &self,
        _candidate: &Candidate,
        total_duration_ms: u64,
    ) -> Result<Option<Vec<LyricLine>>, ProviderError> {
        let Script::Lines(lines) = &self.script else {
            return Ok(None);
        };
        let timed = lines
            .iter()
            .map(|(start, text)| TimedText::new(*start, *text))
            .collect();
        lyrisync_overlay::lyrics::derive_lines(timed, total_duration_ms)
            .map(Some)
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}
