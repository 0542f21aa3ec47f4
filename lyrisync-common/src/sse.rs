//! Server-Sent Events (SSE) utilities
//!
//! Turns the EventBus into an SSE stream for browser-based renderers.

use crate::events::{EventBus, OverlayEvent};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Convert an overlay event into an SSE frame
///
/// Returns `None` if the event cannot be serialized.
pub fn to_sse_event(event: &OverlayEvent) -> Option<Event> {
    Event::default()
        .event(event.event_type())
        .json_data(event)
        .ok()
}

/// Create an SSE stream carrying every event emitted after the client connects
///
/// The first frame is a `ConnectionStatus` event so clients can show a
/// connected indicator before any song starts.
pub fn create_event_sse_stream(
    event_bus: &EventBus,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to overlay events");

    let mut rx = event_bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(frame) = to_sse_event(&event) {
                        yield Ok(frame);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Slow client: drop the missed events and keep streaming
                    warn!("SSE client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("SSE: event bus closed");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
