//! Overlay event types and the EventBus
//!
//! Events are produced by the session engine and consumed by renderers (SSE
//! clients, the log renderer). They carry everything a renderer needs so that
//! no renderer has to reach into engine state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Overlay event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OverlayEvent {
    /// Lyrics were resolved and a session started playing
    SessionOpened {
        session_id: Uuid,
        title: String,
        artist: String,
        cover_art: Option<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The active lyric line changed
    ///
    /// `upcoming` holds the lines following `current`, in order.
    LineChanged {
        session_id: Uuid,
        index: usize,
        current: String,
        upcoming: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// The clock passed the end of the last line
    LyricsEnded {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// The session was torn down (song finished, failed, quit or replaced)
    SessionClosed {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A song started but no lyrics could be resolved
    LyricsUnavailable {
        title: String,
        artist: String,
        timestamp: DateTime<Utc>,
    },

    /// The live clock's speed multiplier changed
    SpeedChanged {
        session_id: Uuid,
        speed: f64,
        timestamp: DateTime<Utc>,
    },
}

impl OverlayEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            OverlayEvent::SessionOpened { .. } => "SessionOpened",
            OverlayEvent::LineChanged { .. } => "LineChanged",
            OverlayEvent::LyricsEnded { .. } => "LyricsEnded",
            OverlayEvent::SessionClosed { .. } => "SessionClosed",
            OverlayEvent::LyricsUnavailable { .. } => "LyricsUnavailable",
            OverlayEvent::SpeedChanged { .. } => "SpeedChanged",
        }
    }
}

/// Central event distribution bus
///
/// Wraps a `tokio::broadcast` channel:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use lyrisync_common::events::{EventBus, OverlayEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(OverlayEvent::LyricsUnavailable {
///     title: "Song".to_string(),
///     artist: "Artist".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<OverlayEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<OverlayEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: OverlayEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
