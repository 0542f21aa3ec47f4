//! # Lyrisync Overlay
//!
//! Time-synchronized lyrics for rhythm games:
//! - `telemetry`: typed game snapshots and per-game frame decoders
//! - `session`: snapshot diffing and the song session state machine
//! - `resolver`: cache-then-providers lyrics resolution
//! - `playback`: virtual clock and line scheduler
//! - `transport`: websocket connection to the game's telemetry feed
//! - `api`, `render`: renderer sinks for overlay events

pub mod api;
pub mod engine;
pub mod error;
pub mod lyrics;
pub mod playback;
pub mod render;
pub mod resolver;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use error::{Error, Result};
