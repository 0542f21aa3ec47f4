//! Per-game frame decoders
//!
//! A decoder turns one raw text frame into at most one snapshot. Beat Saber's
//! DataPuller sends full snapshots; Synth Riders sends discrete events that
//! are folded into a running snapshot.

use super::snapshot::TelemetrySnapshot;
use lyrisync_common::config::GameProfile;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Scene Synth Riders enters after the results screen
const SYNTH_RIDERS_GAME_END_SCENE: &str = "3.GameEnd";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("event frame has no eventType")]
    MissingEventType,
}

/// Turns raw frames into snapshots
pub trait TelemetryDecoder: Send {
    /// `Ok(None)` means the frame was understood but carries no state change
    fn decode(&mut self, frame: &str) -> Result<Option<TelemetrySnapshot>, DecodeError>;

    /// Whether a first sample that already names a song should be ignored
    fn guards_first_sample(&self) -> bool;
}

/// Build the decoder for a game profile
pub fn decoder_for(game: GameProfile) -> Box<dyn TelemetryDecoder> {
    match game {
        GameProfile::BeatSaber => Box::new(BeatSaberDecoder),
        GameProfile::SynthRiders => Box::new(SynthRidersAdapter::new()),
    }
}

/// DataPuller `MapData` frames: one full snapshot per frame
#[derive(Debug, Default)]
pub struct BeatSaberDecoder;

impl TelemetryDecoder for BeatSaberDecoder {
    fn decode(&mut self, frame: &str) -> Result<Option<TelemetrySnapshot>, DecodeError> {
        let value: Value = serde_json::from_str(frame)?;
        if !value.is_object() {
            return Err(DecodeError::NotAnObject);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    fn guards_first_sample(&self) -> bool {
        // DataPuller replays the last map on connect
        true
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventFrame {
    event_type: Option<String>,
    #[serde(default)]
    data: Value,
}

/// Folds Synth Riders websocket events into a running snapshot
#[derive(Debug)]
pub struct SynthRidersAdapter {
    state: TelemetrySnapshot,
}

impl SynthRidersAdapter {
    pub fn new() -> Self {
        Self {
            state: TelemetrySnapshot::baseline(),
        }
    }

    fn song_start(&mut self, data: &Value) {
        let text = |key: &str| {
            data.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        self.state.song_name = Some(text("song"));
        self.state.song_author = Some(text("author"));
        self.state.duration = data.get("length").and_then(Value::as_f64);
        self.state.cover_image = data
            .get("albumArt")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        self.state.in_level = Some(true);
        self.state.level_finished = Some(false);
        self.state.level_failed = Some(false);
        self.state.level_quit = Some(false);
    }

    /// Leaving a song clears its identity so the same song can start again
    fn song_left(&mut self, finished: bool) {
        self.state.song_name = Some(String::new());
        self.state.song_author = Some(String::new());
        self.state.in_level = Some(false);
        if finished {
            self.state.level_finished = Some(true);
        } else {
            self.state.level_quit = Some(true);
        }
    }
}

impl Default for SynthRidersAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryDecoder for SynthRidersAdapter {
    fn decode(&mut self, frame: &str) -> Result<Option<TelemetrySnapshot>, DecodeError> {
        let value: Value = serde_json::from_str(frame)?;
        if !value.is_object() {
            return Err(DecodeError::NotAnObject);
        }
        let event: EventFrame = serde_json::from_value(value)?;
        let event_type = event.event_type.ok_or(DecodeError::MissingEventType)?;

        match event_type.as_str() {
            "SongStart" => self.song_start(&event.data),
            "SongEnd" => self.song_left(true),
            "ReturnToMenu" => self.song_left(false),
            "SceneChange"
                if event.data.get("sceneName").and_then(Value::as_str)
                    == Some(SYNTH_RIDERS_GAME_END_SCENE) =>
            {
                self.song_left(true)
            }
            _ => return Ok(None),
        }

        Ok(Some(self.state.clone()))
    }

    fn guards_first_sample(&self) -> bool {
        false
    }
}
