//! Log renderer: prints overlay events through `tracing`

use lyrisync_common::events::{EventBus, OverlayEvent};
use lyrisync_common::time::format_ms;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One log line per event; `None` for events not worth printing
pub fn describe(event: &OverlayEvent) -> Option<String> {
    match event {
        OverlayEvent::SessionOpened {
            title,
            artist,
            duration_ms,
            ..
        } => Some(format!(
            "♪ {} by {} [{}]",
            title,
            artist,
            format_ms(*duration_ms)
        )),
        OverlayEvent::LineChanged {
            index,
            current,
            upcoming,
            ..
        } => {
            let mut text = format!("#{} {}", index, current);
            if let Some(next) = upcoming.first() {
                text.push_str(&format!("  (next: {})", next));
            }
            Some(text)
        }
        OverlayEvent::LyricsEnded { .. } => Some("(end of lyrics)".to_string()),
        OverlayEvent::LyricsUnavailable { title, artist, .. } => {
            Some(format!("no lyrics for {} by {}", title, artist))
        }
        OverlayEvent::SpeedChanged { speed, .. } => Some(format!("speed x{}", speed)),
        OverlayEvent::SessionClosed { .. } => None,
    }
}

/// Print events until the bus closes or `cancel` fires
pub async fn run_log_renderer(event_bus: EventBus, cancel: CancellationToken) {
    let mut rx = event_bus.subscribe();
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = rx.recv() => received,
        };
        match received {
            Ok(event) => {
                if let Some(text) = describe(&event) {
                    info!(target: "lyrisync_overlay::lyrics", "{}", text);
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!("Log renderer skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
    debug!("Log renderer stopped");
}
