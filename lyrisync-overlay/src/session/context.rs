//! Per-song session state
//!
//! A `SessionContext` is created when lyrics for a started song are resolved
//! and destroyed when the song ends. It owns the clock, the line index and the
//! poll loop task driving them.

use crate::lyrics::LineIndex;
use crate::playback::{run_poll_loop, Clock, ClockState, PollSettings, Scheduler};
use chrono::Utc;
use lyrisync_common::events::{EventBus, OverlayEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

pub struct SessionContext {
    session_id: Uuid,
    clock: Arc<Mutex<Clock>>,
    index: Arc<LineIndex>,
    event_bus: EventBus,
    poll_task: JoinHandle<()>,
    cancel: CancellationToken,
}

impl SessionContext {
    /// Start a session: announce it, start the clock and spawn the poll loop
    ///
    /// `seek_ms` is applied right after the clock starts. The poll loop is
    /// cancelled together with `parent`.
    pub fn start(
        index: LineIndex,
        speed: f64,
        seek_ms: Option<u64>,
        event_bus: EventBus,
        settings: PollSettings,
        parent: &CancellationToken,
    ) -> Self {
        let session_id = Uuid::new_v4();
        let index = Arc::new(index);

        info!(
            "Session {} opened: '{}' by '{}' ({} lines, source {})",
            session_id,
            index.title(),
            index.artist(),
            index.len(),
            index.meta().source
        );
        event_bus.emit_lossy(OverlayEvent::SessionOpened {
            session_id,
            title: index.title().to_string(),
            artist: index.artist().to_string(),
            cover_art: index.cover_art().map(str::to_string),
            duration_ms: index.duration_ms(),
            timestamp: Utc::now(),
        });

        let mut clock = Clock::new(speed);
        clock.start();
        if let Some(ms) = seek_ms {
            clock.set_time(ms);
        }
        let clock = Arc::new(Mutex::new(clock));

        let cancel = parent.child_token();
        let poll_task = tokio::spawn(run_poll_loop(
            session_id,
            Scheduler::new(Arc::clone(&index)),
            Arc::clone(&clock),
            event_bus.clone(),
            settings,
            cancel.clone(),
        ));

        Self {
            session_id,
            clock,
            index,
            event_bus,
            poll_task,
            cancel,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    pub async fn clock_state(&self) -> ClockState {
        self.clock.lock().await.state()
    }

    pub async fn elapsed_ms(&self) -> Option<u64> {
        self.clock.lock().await.elapsed_ms()
    }

    pub async fn set_speed(&self, speed: f64) {
        let applied = {
            let mut clock = self.clock.lock().await;
            clock.set_speed(speed);
            clock.speed()
        };
        info!("Session {} speed set to {}", self.session_id, applied);
        self.emit_speed(applied);
    }

    /// Change speed and jump to `position_ms`
    pub async fn seek(&self, speed: f64, position_ms: u64) {
        let applied = {
            let mut clock = self.clock.lock().await;
            clock.set_speed(speed);
            clock.set_time(position_ms);
            clock.speed()
        };
        info!(
            "Session {} seek to {} ms at speed {}",
            self.session_id, position_ms, applied
        );
        self.emit_speed(applied);
    }

    pub async fn pause(&self) {
        self.clock.lock().await.pause();
        info!("Session {} paused", self.session_id);
    }

    pub async fn resume(&self) {
        self.clock.lock().await.unpause();
        info!("Session {} resumed", self.session_id);
    }

    /// Tear down: stop the poll loop, then stop the clock
    ///
    /// The poll loop has exited by the time this returns, so nothing reads
    /// the clock or the line index afterwards.
    pub async fn close(self) {
        self.cancel.cancel();
        if let Err(e) = self.poll_task.await {
            warn!("Poll loop for session {} ended abnormally: {}", self.session_id, e);
        }
        self.clock.lock().await.stop();

        info!("Session {} closed", self.session_id);
        self.event_bus.emit_lossy(OverlayEvent::SessionClosed {
            session_id: self.session_id,
            timestamp: Utc::now(),
        });
    }

    fn emit_speed(&self, speed: f64) {
        self.event_bus.emit_lossy(OverlayEvent::SpeedChanged {
            session_id: self.session_id,
            speed,
            timestamp: Utc::now(),
        });
    }
}
