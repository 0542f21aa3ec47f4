//! Game telemetry: typed snapshots and per-game frame decoders

pub mod decoder;
pub mod snapshot;

pub use decoder::{decoder_for, BeatSaberDecoder, DecodeError, SynthRidersAdapter, TelemetryDecoder};
pub use snapshot::{Modifiers, PracticeModeModifiers, TelemetryField, TelemetrySnapshot, UpdatedFields};
