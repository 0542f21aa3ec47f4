//! Lyric lines and the per-song line index
//!
//! A `LineIndex` is built once by the resolution pipeline and never mutated
//! afterwards. Lines are sorted by start time; every line's end is the next
//! line's start, and the last line ends at the song's total duration.

use lyrisync_common::time::format_ms;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reasons a set of lines cannot form a line index
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineIndexError {
    #[error("line index must contain at least one line")]
    Empty,

    #[error("line {index} ends at {end_ms} ms before it starts at {start_ms} ms")]
    EndBeforeStart {
        index: usize,
        start_ms: u64,
        end_ms: u64,
    },
}

/// A line of text with a start time only, as delivered by sources that do not
/// know line ends (LRC files, streaming catalogs)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedText {
    pub start_ms: u64,
    pub text: String,
}

impl TimedText {
    pub fn new(start_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            text: text.into(),
        }
    }
}

/// One lyric line with derived duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    text: String,
    start_ms: u64,
    end_ms: u64,
    duration_ms: u64,
}

impl LyricLine {
    /// Create a line; `end_ms` must not precede `start_ms`
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64) -> Option<Self> {
        let duration_ms = end_ms.checked_sub(start_ms)?;
        Some(Self {
            text: text.into(),
            start_ms,
            end_ms,
            duration_ms,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

impl fmt::Display for LyricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}-{}]: {} [{} ms]",
            format_ms(self.start_ms),
            format_ms(self.end_ms),
            self.text,
            self.duration_ms
        )
    }
}

/// Song metadata carried alongside the lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongMeta {
    /// Canonical title as reported by the source
    pub title: String,
    /// Canonical artist(s) as reported by the source
    pub artist: String,
    pub cover_art: Option<String>,
    /// Provider the lines came from
    pub source: String,
}

/// Turn start-time-only lines into complete lines
///
/// Each line ends where the next one starts; the last line ends at
/// `total_duration_ms`. A total duration shorter than the last start time
/// gives the last line a zero duration.
pub fn derive_lines(
    mut timed: Vec<TimedText>,
    total_duration_ms: u64,
) -> Result<Vec<LyricLine>, LineIndexError> {
    if timed.is_empty() {
        return Err(LineIndexError::Empty);
    }
    timed.sort_by_key(|t| t.start_ms);

    let ends: Vec<u64> = timed
        .iter()
        .skip(1)
        .map(|next| next.start_ms)
        .chain(std::iter::once(total_duration_ms))
        .collect();

    let last = timed.len() - 1;
    let mut lines = Vec::with_capacity(timed.len());
    for (index, (item, end_ms)) in timed.into_iter().zip(ends).enumerate() {
        let end_ms = if index == last {
            end_ms.max(item.start_ms)
        } else {
            end_ms
        };
        let start_ms = item.start_ms;
        let line = LyricLine::new(item.text, start_ms, end_ms).ok_or(
            LineIndexError::EndBeforeStart {
                index,
                start_ms,
                end_ms,
            },
        )?;
        lines.push(line);
    }

    Ok(lines)
}

/// Immutable, time-sorted lyric lines for one song
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    lines: Vec<LyricLine>,
    meta: SongMeta,
}

impl LineIndex {
    /// Build an index from complete lines
    ///
    /// Lines are stably sorted by start time.
    pub fn new(mut lines: Vec<LyricLine>, meta: SongMeta) -> Result<Self, LineIndexError> {
        if lines.is_empty() {
            return Err(LineIndexError::Empty);
        }
        lines.sort_by_key(|l| l.start_ms);
        Ok(Self { lines, meta })
    }

    /// Build an index from start-time-only lines
    ///
    /// See [`derive_lines`] for how line ends are computed.
    pub fn from_timed_text(
        timed: Vec<TimedText>,
        total_duration_ms: u64,
        meta: SongMeta,
    ) -> Result<Self, LineIndexError> {
        let lines = derive_lines(timed, total_duration_ms)?;
        Ok(Self { lines, meta })
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always false for a constructed index; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn meta(&self) -> &SongMeta {
        &self.meta
    }

    pub fn title(&self) -> &str {
        &self.meta.title
    }

    pub fn artist(&self) -> &str {
        &self.meta.artist
    }

    pub fn cover_art(&self) -> Option<&str> {
        self.meta.cover_art.as_deref()
    }

    /// End of the last line; the scheduler's termination point
    pub fn end_ms(&self) -> u64 {
        self.lines.last().map(|l| l.end_ms).unwrap_or(0)
    }

    /// Span from the first line's start to the last line's end
    pub fn duration_ms(&self) -> u64 {
        match (self.lines.first(), self.lines.last()) {
            (Some(first), Some(last)) => last.end_ms - first.start_ms,
            _ => 0,
        }
    }

    /// Greatest index whose line has started at `elapsed_ms`
    ///
    /// Binary search; valid for any position, so seeks in either direction
    /// need no cached state.
    pub fn active_index(&self, elapsed_ms: u64) -> Option<usize> {
        self.lines
            .partition_point(|l| l.start_ms <= elapsed_ms)
            .checked_sub(1)
    }

    /// Text of line `index` followed by up to `count - 1` following lines
    pub fn window(&self, index: usize, count: usize) -> Option<(String, Vec<String>)> {
        let current = self.lines.get(index)?.text.clone();
        let upcoming = self
            .lines
            .iter()
            .skip(index + 1)
            .take(count.saturating_sub(1))
            .map(|l| l.text.clone())
            .collect();
        Some((current, upcoming))
    }
}

impl fmt::Display for LineIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Song: {} by {}", self.meta.title, self.meta.artist)?;
        if let Some(cover) = &self.meta.cover_art {
            writeln!(f, "Cover: {}", cover)?;
        }
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
