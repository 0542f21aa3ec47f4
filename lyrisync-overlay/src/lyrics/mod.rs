//! Lyric data: lines, the per-song index and LRC parsing

pub mod line;
pub mod lrc;

pub use line::{derive_lines, LineIndex, LineIndexError, LyricLine, SongMeta, TimedText};
pub use lrc::parse_lrc;
