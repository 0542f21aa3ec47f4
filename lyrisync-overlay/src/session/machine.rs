//! Session state machine
//!
//! Runs as a single task consuming telemetry snapshots in arrival order.
//! All session construction and teardown happens here, so no other task ever
//! sees a half-built or half-destroyed session.

use super::context::SessionContext;
use super::tracker::{SessionCommand, SessionTracker};
use crate::playback::PollSettings;
use crate::resolver::ResolutionPipeline;
use crate::telemetry::TelemetrySnapshot;
use chrono::Utc;
use lyrisync_common::events::{EventBus, OverlayEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Idle or Active, as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active { session_id: Uuid },
}

pub struct SessionMachine {
    tracker: SessionTracker,
    resolver: Arc<ResolutionPipeline>,
    event_bus: EventBus,
    settings: PollSettings,
    session: Option<SessionContext>,
    cancel: CancellationToken,
}

impl SessionMachine {
    pub fn new(
        tracker: SessionTracker,
        resolver: Arc<ResolutionPipeline>,
        event_bus: EventBus,
        settings: PollSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tracker,
            resolver,
            event_bus,
            settings,
            session: None,
            cancel,
        }
    }

    pub fn state(&self) -> SessionState {
        match &self.session {
            Some(session) => SessionState::Active {
                session_id: session.session_id(),
            },
            None => SessionState::Idle,
        }
    }

    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    /// Consume snapshots until the channel closes or the engine shuts down
    ///
    /// Any open session is closed before returning.
    pub async fn run(mut self, mut samples: mpsc::UnboundedReceiver<TelemetrySnapshot>) {
        info!("Session machine started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Session machine cancelled");
                    break;
                }
                sample = samples.recv() => match sample {
                    Some(snapshot) => self.handle(&snapshot).await,
                    None => {
                        debug!("Telemetry channel closed");
                        break;
                    }
                },
            }
        }
        self.close_session().await;
        info!("Session machine stopped");
    }

    /// Apply one snapshot
    pub async fn handle(&mut self, snapshot: &TelemetrySnapshot) {
        for command in self.tracker.observe(snapshot) {
            self.apply(command).await;
        }
    }

    async fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Open {
                title,
                artist,
                speed,
                seek_ms,
                duration_ms,
            } => {
                self.open_session(&title, &artist, speed, seek_ms, duration_ms)
                    .await
            }
            SessionCommand::Close => {
                if self.session.is_some() {
                    info!("Song finished, failed or quit");
                    self.close_session().await;
                }
            }
            SessionCommand::SetSpeed { speed } => {
                if let Some(session) = &self.session {
                    session.set_speed(speed).await;
                }
            }
            SessionCommand::Seek { speed, position_ms } => {
                if let Some(session) = &self.session {
                    session.seek(speed, position_ms).await;
                }
            }
            SessionCommand::Pause => {
                if let Some(session) = &self.session {
                    session.pause().await;
                }
            }
            SessionCommand::Resume => {
                if let Some(session) = &self.session {
                    session.resume().await;
                }
            }
        }
    }

    async fn open_session(
        &mut self,
        title: &str,
        artist: &str,
        speed: f64,
        seek_ms: Option<u64>,
        reported_duration_ms: Option<u64>,
    ) {
        info!("Song started: '{}' by '{}'", title, artist);
        self.close_session().await;

        let resolved = tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("Resolution of '{}' by '{}' abandoned on shutdown", title, artist);
                return;
            }
            resolved = self.resolver.resolve(title, artist, reported_duration_ms) => resolved,
        };

        let Some(index) = resolved else {
            warn!("No lyrics available for '{}' by '{}'", title, artist);
            self.event_bus.emit_lossy(OverlayEvent::LyricsUnavailable {
                title: title.to_string(),
                artist: artist.to_string(),
                timestamp: Utc::now(),
            });
            return;
        };

        self.session = Some(SessionContext::start(
            index,
            speed,
            seek_ms,
            self.event_bus.clone(),
            self.settings,
            &self.cancel,
        ));
    }

    /// Tear down the active session, if any
    pub async fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}
