//! Line scheduler and its poll loop
//!
//! The scheduler is pure computation over a clock reading and a line index.
//! The poll loop samples the clock at a fixed interval, feeds the reading to
//! the scheduler and turns transitions into overlay events.

use super::clock::Clock;
use crate::lyrics::LineIndex;
use chrono::Utc;
use lyrisync_common::events::{EventBus, OverlayEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Transition produced by one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A different line became active
    LineChanged { index: usize },
    /// Elapsed time reached the end of the last line
    Ended,
}

/// Maps elapsed time to the active line and reports transitions
#[derive(Debug)]
pub struct Scheduler {
    index: Arc<LineIndex>,
    last_emitted: Option<usize>,
    ended: bool,
}

impl Scheduler {
    pub fn new(index: Arc<LineIndex>) -> Self {
        Self {
            index,
            last_emitted: None,
            ended: false,
        }
    }

    /// Evaluate one clock reading
    ///
    /// `None` (clock paused or stopped) produces nothing. After `Ended` has
    /// been reported every further poll produces nothing.
    pub fn poll(&mut self, elapsed_ms: Option<u64>) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();
        if self.ended {
            return events;
        }
        let Some(elapsed) = elapsed_ms else {
            return events;
        };

        if let Some(active) = self.index.active_index(elapsed) {
            if self.last_emitted != Some(active) {
                self.last_emitted = Some(active);
                events.push(SchedulerEvent::LineChanged { index: active });
            }
        }

        if elapsed >= self.index.end_ms() {
            self.ended = true;
            events.push(SchedulerEvent::Ended);
        }

        events
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Index of the line most recently reported as active
    pub fn current_index(&self) -> Option<usize> {
        self.last_emitted
    }

    pub fn line_index(&self) -> &Arc<LineIndex> {
        &self.index
    }
}

/// Poll loop settings
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    /// Lines per `LineChanged` window, current line included
    pub lines_shown: usize,
}

/// Drive a scheduler until the lyrics end or `cancel` fires
///
/// The loop is the only reader of the clock and line index while a session
/// lives; the session owner cancels and awaits it before discarding them.
pub async fn run_poll_loop(
    session_id: Uuid,
    mut scheduler: Scheduler,
    clock: Arc<Mutex<Clock>>,
    event_bus: EventBus,
    settings: PollSettings,
    cancel: CancellationToken,
) {
    let mut ticker = interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(
        "Poll loop started for session {} ({} ms interval)",
        session_id,
        settings.interval.as_millis()
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Poll loop for session {} cancelled", session_id);
                break;
            }
            _ = ticker.tick() => {
                let elapsed = clock.lock().await.elapsed_ms();
                for event in scheduler.poll(elapsed) {
                    emit(&event_bus, session_id, &scheduler, event, settings.lines_shown);
                }
                if scheduler.is_ended() {
                    info!("Lyrics ended for session {}", session_id);
                    break;
                }
            }
        }
    }
}

fn emit(
    event_bus: &EventBus,
    session_id: Uuid,
    scheduler: &Scheduler,
    event: SchedulerEvent,
    lines_shown: usize,
) {
    match event {
        SchedulerEvent::LineChanged { index } => {
            let Some((current, upcoming)) = scheduler.line_index().window(index, lines_shown)
            else {
                return;
            };
            event_bus.emit_lossy(OverlayEvent::LineChanged {
                session_id,
                index,
                current,
                upcoming,
                timestamp: Utc::now(),
            });
        }
        SchedulerEvent::Ended => {
            event_bus.emit_lossy(OverlayEvent::LyricsEnded {
                session_id,
                timestamp: Utc::now(),
            });
        }
    }
}
