//! Snapshot diffing and lifecycle command derivation
//!
//! Pure logic: the tracker never touches a clock or a session. It turns each
//! telemetry sample into the commands the session machine should apply.

use crate::telemetry::{TelemetryField, TelemetrySnapshot};
use tracing::{debug, warn};

/// Lifecycle command derived from one sample
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// A song started: close any session, resolve lyrics, start a new one
    Open {
        title: String,
        artist: String,
        speed: f64,
        /// Practice-mode start offset to seek to once the clock starts
        seek_ms: Option<u64>,
        /// Song length reported by the game
        duration_ms: Option<u64>,
    },
    /// The song finished, failed or was quit
    Close,
    /// Speed modifier changed
    SetSpeed { speed: f64 },
    /// Practice mode entered: new speed and start offset
    Seek { speed: f64, position_ms: u64 },
    Pause,
    Resume,
}

/// Diffs samples against the previous one and derives commands
#[derive(Debug)]
pub struct SessionTracker {
    previous: TelemetrySnapshot,
    first_sample_pending: bool,
    guard_first_sample: bool,
}

impl SessionTracker {
    /// `guard_first_sample` discards a first sample that already names a song
    pub fn new(guard_first_sample: bool) -> Self {
        Self {
            previous: TelemetrySnapshot::baseline(),
            first_sample_pending: true,
            guard_first_sample,
        }
    }

    /// Last retained (merged) snapshot
    pub fn previous(&self) -> &TelemetrySnapshot {
        &self.previous
    }

    /// Consume one sample
    pub fn observe(&mut self, sample: &TelemetrySnapshot) -> Vec<SessionCommand> {
        let next = self.previous.merged_with(sample);

        if std::mem::take(&mut self.first_sample_pending)
            && self.guard_first_sample
            && next.has_identity()
        {
            warn!(
                "First sample already names '{}' by '{}', ignoring it as stale",
                next.title(),
                next.artist()
            );
            return Vec::new();
        }

        let updated = self.previous.diff(&next);
        debug!("Updated fields: {:?}", updated);
        self.previous = next;
        let current = &self.previous;

        let mut commands = Vec::new();

        if updated.contains(&TelemetryField::SongName)
            && updated.contains(&TelemetryField::SongAuthor)
            && current.has_identity()
        {
            let (speed, seek_ms) = if current.in_practice() {
                (current.practice_speed(), Some(current.practice_start_ms()))
            } else {
                (current.modifier_speed(), None)
            };
            commands.push(SessionCommand::Open {
                title: current.title().to_string(),
                artist: current.artist().to_string(),
                speed,
                seek_ms,
                duration_ms: current.duration_ms(),
            });
            return commands;
        }

        if current.is_terminal() {
            commands.push(SessionCommand::Close);
            return commands;
        }

        if updated.contains(&TelemetryField::Modifiers) {
            commands.push(SessionCommand::SetSpeed {
                speed: current.modifier_speed(),
            });
        }

        if updated.contains(&TelemetryField::PracticeMode) && current.in_practice() {
            commands.push(SessionCommand::Seek {
                speed: current.practice_speed(),
                position_ms: current.practice_start_ms(),
            });
        }

        if updated.contains(&TelemetryField::LevelPaused) {
            commands.push(if current.is_paused() {
                SessionCommand::Pause
            } else {
                SessionCommand::Resume
            });
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{Modifiers, PracticeModeModifiers};

    fn song(title: &str, artist: &str) -> TelemetrySnapshot {
        TelemetrySnapshot {
            song_name: Some(title.to_string()),
            song_author: Some(artist.to_string()),
            ..Default::default()
        }
    }

    fn open(title: &str, artist: &str) -> SessionCommand {
        SessionCommand::Open {
            title: title.to_string(),
            artist: artist.to_string(),
            speed: 1.0,
            seek_ms: None,
            duration_ms: None,
        }
    }

    #[test]
    fn test_stale_first_sample_is_ignored() {
        let mut tracker = SessionTracker::new(true);
        assert!(tracker.observe(&song("A", "B")).is_empty());
    }

    #[test]
    fn test_second_sample_opens() {
        let mut tracker = SessionTracker::new(true);
        assert!(tracker.observe(&song("", "")).is_empty());
        assert_eq!(tracker.observe(&song("A", "B")), vec![open("A", "B")]);
    }

    #[test]
    fn test_ignored_first_sample_is_not_retained() {
        let mut tracker = SessionTracker::new(true);
        tracker.observe(&song("A", "B"));
        assert_eq!(tracker.previous().title(), "");
        assert_eq!(tracker.observe(&song("A", "B")), vec![open("A", "B")]);
    }

    #[test]
    fn test_unguarded_first_sample_opens() {
        let mut tracker = SessionTracker::new(false);
        assert_eq!(tracker.observe(&song("A", "B")), vec![open("A", "B")]);
    }

    #[test]
    fn test_repeated_sample_does_not_reopen() {
        let mut tracker = SessionTracker::new(true);
        tracker.observe(&song("", ""));
        tracker.observe(&song("A", "B"));
        assert!(tracker.observe(&song("A", "B")).is_empty());
    }

    #[test]
    fn test_title_change_alone_does_not_open() {
        let mut tracker = SessionTracker::new(true);
        tracker.observe(&song("", ""));
        tracker.observe(&song("A", "B"));
        assert!(tracker.observe(&song("C", "B")).is_empty());
    }

    #[test]
    fn test_terminal_flag_closes_on_every_sample() {
        let mut tracker = SessionTracker::new(true);
        tracker.observe(&song("", ""));
        tracker.observe(&song("A", "B"));

        let failed = TelemetrySnapshot {
            level_failed: Some(true),
            ..Default::default()
        };
        assert_eq!(tracker.observe(&failed), vec![SessionCommand::Close]);
        assert_eq!(tracker.observe(&failed), vec![SessionCommand::Close]);
    }

    #[test]
    fn test_open_takes_precedence_over_close() {
        let mut tracker = SessionTracker::new(true);
        tracker.observe(&song("", ""));

        let sample = TelemetrySnapshot {
            level_finished: Some(true),
            ..song("A", "B")
        };
        assert_eq!(tracker.observe(&sample), vec![open("A", "B")]);
    }

    #[test]
    fn test_open_applies_active_modifier_and_practice() {
        let mut tracker = SessionTracker::new(true);
        tracker.observe(&song("", ""));
        let sample = TelemetrySnapshot {
            modifiers: Some(Modifiers {
                super_fast_song: Some(true),
                ..Default::default()
            }),
            ..song("A", "B")
        };
        assert_eq!(
            tracker.observe(&sample),
            vec![SessionCommand::Open {
                title: "A".to_string(),
                artist: "B".to_string(),
                speed: 1.5,
                seek_ms: None,
                duration_ms: None,
            }]
        );

        let mut tracker = SessionTracker::new(true);
        tracker.observe(&song("", ""));
        let sample = TelemetrySnapshot {
            practice_mode: Some(true),
            practice_mode_modifiers: Some(PracticeModeModifiers {
                song_speed_mul: Some(0.8),
                song_start_time: Some(30.0),
            }),
            ..song("A", "B")
        };
        assert_eq!(
            tracker.observe(&sample),
            vec![SessionCommand::Open {
                title: "A".to_string(),
                artist: "B".to_string(),
                speed: 0.8,
                seek_ms: Some(30_000),
                duration_ms: None,
            }]
        );
    }

    #[test]
    fn test_open_carries_reported_duration() {
        let mut tracker = SessionTracker::new(false);
        let sample = TelemetrySnapshot {
            duration: Some(183.5),
            ..song("A", "B")
        };
        assert_eq!(
            tracker.observe(&sample),
            vec![SessionCommand::Open {
                title: "A".to_string(),
                artist: "B".to_string(),
                speed: 1.0,
                seek_ms: None,
                duration_ms: Some(183_500),
            }]
        );
    }

    #[test]
    fn test_modifier_change_sets_speed() {
        let mut tracker = SessionTracker::new(true);
        tracker.observe(&song("", ""));
        tracker.observe(&song("A", "B"));

        let slower = TelemetrySnapshot {
            modifiers: Some(Modifiers {
                slower_song: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            tracker.observe(&slower),
            vec![SessionCommand::SetSpeed { speed: 0.85 }]
        );

        let cleared = TelemetrySnapshot {
            modifiers: Some(Modifiers {
                slower_song: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            tracker.observe(&cleared),
            vec![SessionCommand::SetSpeed { speed: 1.0 }]
        );
    }

    #[test]
    fn test_practice_seek_only_on_entry() {
        let mut tracker = SessionTracker::new(true);
        tracker.observe(&song("", ""));
        tracker.observe(&song("A", "B"));

        let practice = TelemetrySnapshot {
            practice_mode: Some(true),
            practice_mode_modifiers: Some(PracticeModeModifiers {
                song_speed_mul: Some(1.1),
                song_start_time: Some(12.0),
            }),
            ..Default::default()
        };
        assert_eq!(
            tracker.observe(&practice),
            vec![SessionCommand::Seek {
                speed: 1.1,
                position_ms: 12_000,
            }]
        );
        assert!(tracker.observe(&practice).is_empty());
    }

    #[test]
    fn test_pause_and_resume() {
        let mut tracker = SessionTracker::new(true);
        tracker.observe(&song("", ""));
        tracker.observe(&song("A", "B"));

        let paused = TelemetrySnapshot {
            level_paused: Some(true),
            ..Default::default()
        };
        let resumed = TelemetrySnapshot {
            level_paused: Some(false),
            ..Default::default()
        };
        assert_eq!(tracker.observe(&paused), vec![SessionCommand::Pause]);
        assert!(tracker.observe(&paused).is_empty());
        assert_eq!(tracker.observe(&resumed), vec![SessionCommand::Resume]);
    }

    #[test]
    fn test_empty_sample_fires_nothing() {
        let mut tracker = SessionTracker::new(true);
        tracker.observe(&song("", ""));
        assert!(tracker.observe(&TelemetrySnapshot::default()).is_empty());
    }
}
