//! Typed telemetry snapshot
//!
//! Field names follow the DataPuller `MapData` frame. Every field is optional:
//! an absent field means "unchanged". The session tracker keeps one merged
//! snapshot, starting from [`TelemetrySnapshot::baseline`], and diffs each
//! merged sample against it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Speed multipliers of the three song-speed modifier tiers
pub const SUPER_FAST_SPEED: f64 = 1.5;
pub const FASTER_SPEED: f64 = 1.2;
pub const SLOWER_SPEED: f64 = 0.85;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Modifiers {
    pub super_fast_song: Option<bool>,
    pub faster_song: Option<bool>,
    pub slower_song: Option<bool>,
}

impl Modifiers {
    fn merged_with(&self, next: &Modifiers) -> Modifiers {
        Modifiers {
            super_fast_song: next.super_fast_song.or(self.super_fast_song),
            faster_song: next.faster_song.or(self.faster_song),
            slower_song: next.slower_song.or(self.slower_song),
        }
    }

    /// Multiplier of the active tier; tiers are mutually exclusive in game
    pub fn speed(&self) -> f64 {
        if self.super_fast_song == Some(true) {
            SUPER_FAST_SPEED
        } else if self.faster_song == Some(true) {
            FASTER_SPEED
        } else if self.slower_song == Some(true) {
            SLOWER_SPEED
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PracticeModeModifiers {
    pub song_speed_mul: Option<f64>,
    /// Start offset in seconds
    pub song_start_time: Option<f64>,
}

impl PracticeModeModifiers {
    fn merged_with(&self, next: &PracticeModeModifiers) -> PracticeModeModifiers {
        PracticeModeModifiers {
            song_speed_mul: next.song_speed_mul.or(self.song_speed_mul),
            song_start_time: next.song_start_time.or(self.song_start_time),
        }
    }
}

/// Fields recognized for diffing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TelemetryField {
    SongName,
    SongAuthor,
    InLevel,
    LevelPaused,
    LevelFinished,
    LevelFailed,
    LevelQuit,
    Hash,
    Duration,
    CoverImage,
    Modifiers,
    PracticeMode,
    PracticeModeModifiers,
}

/// Fields whose value differs between two snapshots
pub type UpdatedFields = BTreeSet<TelemetryField>;

/// One point-in-time report of the game's state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TelemetrySnapshot {
    pub song_name: Option<String>,
    pub song_author: Option<String>,
    pub in_level: Option<bool>,
    pub level_paused: Option<bool>,
    pub level_finished: Option<bool>,
    pub level_failed: Option<bool>,
    pub level_quit: Option<bool>,
    pub hash: Option<String>,
    /// Song length in seconds
    pub duration: Option<f64>,
    pub cover_image: Option<String>,
    pub modifiers: Option<Modifiers>,
    pub practice_mode: Option<bool>,
    pub practice_mode_modifiers: Option<PracticeModeModifiers>,
}

impl TelemetrySnapshot {
    /// State assumed before any sample arrives
    pub fn baseline() -> Self {
        Self {
            song_name: Some(String::new()),
            song_author: Some(String::new()),
            in_level: Some(false),
            level_paused: Some(false),
            level_finished: Some(false),
            level_failed: Some(false),
            level_quit: Some(false),
            hash: None,
            duration: None,
            cover_image: None,
            modifiers: Some(Modifiers::default()),
            practice_mode: Some(false),
            practice_mode_modifiers: None,
        }
    }

    /// Overlay `next` on `self`; fields absent from `next` keep their value
    pub fn merged_with(&self, next: &TelemetrySnapshot) -> TelemetrySnapshot {
        TelemetrySnapshot {
            song_name: next.song_name.clone().or_else(|| self.song_name.clone()),
            song_author: next.song_author.clone().or_else(|| self.song_author.clone()),
            in_level: next.in_level.or(self.in_level),
            level_paused: next.level_paused.or(self.level_paused),
            level_finished: next.level_finished.or(self.level_finished),
            level_failed: next.level_failed.or(self.level_failed),
            level_quit: next.level_quit.or(self.level_quit),
            hash: next.hash.clone().or_else(|| self.hash.clone()),
            duration: next.duration.or(self.duration),
            cover_image: next.cover_image.clone().or_else(|| self.cover_image.clone()),
            modifiers: merge_nested(&self.modifiers, &next.modifiers, Modifiers::merged_with),
            practice_mode: next.practice_mode.or(self.practice_mode),
            practice_mode_modifiers: merge_nested(
                &self.practice_mode_modifiers,
                &next.practice_mode_modifiers,
                PracticeModeModifiers::merged_with,
            ),
        }
    }

    /// Fields whose value in `next` differs from `self`
    pub fn diff(&self, next: &TelemetrySnapshot) -> UpdatedFields {
        let mut updated = UpdatedFields::new();
        let mut check = |field: TelemetryField, changed: bool| {
            if changed {
                updated.insert(field);
            }
        };

        check(TelemetryField::SongName, self.song_name != next.song_name);
        check(TelemetryField::SongAuthor, self.song_author != next.song_author);
        check(TelemetryField::InLevel, self.in_level != next.in_level);
        check(TelemetryField::LevelPaused, self.level_paused != next.level_paused);
        check(TelemetryField::LevelFinished, self.level_finished != next.level_finished);
        check(TelemetryField::LevelFailed, self.level_failed != next.level_failed);
        check(TelemetryField::LevelQuit, self.level_quit != next.level_quit);
        check(TelemetryField::Hash, self.hash != next.hash);
        check(TelemetryField::Duration, self.duration != next.duration);
        check(TelemetryField::CoverImage, self.cover_image != next.cover_image);
        check(TelemetryField::Modifiers, self.modifiers != next.modifiers);
        check(TelemetryField::PracticeMode, self.practice_mode != next.practice_mode);
        check(
            TelemetryField::PracticeModeModifiers,
            self.practice_mode_modifiers != next.practice_mode_modifiers,
        );

        updated
    }

    pub fn title(&self) -> &str {
        self.song_name.as_deref().unwrap_or("")
    }

    pub fn artist(&self) -> &str {
        self.song_author.as_deref().unwrap_or("")
    }

    /// Both title and artist are non-empty
    pub fn has_identity(&self) -> bool {
        !self.title().is_empty() && !self.artist().is_empty()
    }

    /// Finished, failed or quit
    pub fn is_terminal(&self) -> bool {
        self.level_finished == Some(true)
            || self.level_failed == Some(true)
            || self.level_quit == Some(true)
    }

    pub fn is_paused(&self) -> bool {
        self.level_paused == Some(true)
    }

    pub fn in_practice(&self) -> bool {
        self.practice_mode == Some(true)
    }

    /// Multiplier implied by the modifier tiers
    pub fn modifier_speed(&self) -> f64 {
        self.modifiers.as_ref().map(Modifiers::speed).unwrap_or(1.0)
    }

    /// Practice-mode speed multiplier; 1.0 when not reported
    pub fn practice_speed(&self) -> f64 {
        self.practice_mode_modifiers
            .as_ref()
            .and_then(|p| p.song_speed_mul)
            .unwrap_or(1.0)
    }

    /// Practice-mode start offset in milliseconds
    pub fn practice_start_ms(&self) -> u64 {
        self.practice_mode_modifiers
            .as_ref()
            .and_then(|p| p.song_start_time)
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| (secs * 1000.0) as u64)
            .unwrap_or(0)
    }

    /// Song length in milliseconds, if reported
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| (secs * 1000.0) as u64)
    }
}

fn merge_nested<T: Clone>(prev: &Option<T>, next: &Option<T>, merge: fn(&T, &T) -> T) -> Option<T> {
    match (prev, next) {
        (Some(p), Some(n)) => Some(merge(p, n)),
        (None, Some(n)) => Some(n.clone()),
        (p, None) => p.clone(),
    }
}
