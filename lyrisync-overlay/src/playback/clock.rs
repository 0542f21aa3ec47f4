//! Pausable, speed-scalable virtual clock
//!
//! Reports elapsed song time in milliseconds. Time is tracked as a virtual
//! offset at an anchor instant plus scaled wall time since the anchor, minus
//! time spent paused. Re-anchoring on every seek and speed change keeps speed
//! changes from rescaling time that already elapsed.
//!
//! Uses `tokio::time::Instant` so tests can drive it with a paused runtime.
//! All operations are total: out-of-order calls are no-ops.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Observable clock state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClockState {
    pub running: bool,
    pub started: bool,
    pub speed: f64,
    pub paused_accumulated_ms: u64,
}

/// Virtual song clock
#[derive(Debug, Clone)]
pub struct Clock {
    speed: f64,
    running: bool,
    /// Wall instant the virtual offset refers to (None = never started)
    anchor: Option<Instant>,
    /// Virtual elapsed milliseconds at `anchor`
    anchor_elapsed_ms: f64,
    /// Set while paused
    paused_at: Option<Instant>,
    /// Wall time spent paused since `anchor`
    paused_accumulated: Duration,
}

impl Clock {
    /// Create a stopped clock
    ///
    /// Non-positive or non-finite speeds fall back to 1.0.
    pub fn new(speed: f64) -> Self {
        Self {
            speed: sanitize_speed(speed),
            running: false,
            anchor: None,
            anchor_elapsed_ms: 0.0,
            paused_at: None,
            paused_accumulated: Duration::ZERO,
        }
    }

    /// Start counting from zero; no-op while running
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.anchor = Some(Instant::now());
        self.anchor_elapsed_ms = 0.0;
        self.paused_at = None;
        self.paused_accumulated = Duration::ZERO;
        self.running = true;
    }

    /// Reset to the never-started condition
    pub fn stop(&mut self) {
        self.running = false;
        self.anchor = None;
        self.anchor_elapsed_ms = 0.0;
        self.paused_at = None;
        self.paused_accumulated = Duration::ZERO;
    }

    /// Freeze elapsed time; no-op unless running
    pub fn pause(&mut self) {
        if self.running && self.paused_at.is_none() {
            self.paused_at = Some(Instant::now());
            self.running = false;
        }
    }

    /// Resume after `pause`, folding the paused interval into the accumulator
    pub fn unpause(&mut self) {
        if self.running {
            return;
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_accumulated += Instant::now().saturating_duration_since(paused_at);
            self.running = true;
        }
    }

    /// Seek: `elapsed_ms()` reports `ms` immediately afterwards
    ///
    /// Leaves running state and speed untouched. While paused, the new
    /// position is held until `unpause`.
    pub fn set_time(&mut self, ms: u64) {
        let now = Instant::now();
        self.anchor = Some(now);
        self.anchor_elapsed_ms = ms as f64;
        self.paused_accumulated = Duration::ZERO;
        if self.paused_at.is_some() {
            self.paused_at = Some(now);
        }
    }

    /// Change the speed multiplier from now on
    ///
    /// Time already elapsed is kept as is; only time after this call is
    /// scaled by the new speed.
    pub fn set_speed(&mut self, speed: f64) {
        let speed = sanitize_speed(speed);
        let now = Instant::now();
        if let Some(current) = self.virtual_elapsed_ms(now) {
            self.anchor = Some(now);
            self.anchor_elapsed_ms = current;
            self.paused_accumulated = Duration::ZERO;
            if self.paused_at.is_some() {
                self.paused_at = Some(now);
            }
        }
        self.speed = speed;
    }

    /// Elapsed song time in whole milliseconds; `None` unless running
    pub fn elapsed_ms(&self) -> Option<u64> {
        if !self.running {
            return None;
        }
        self.virtual_elapsed_ms(Instant::now())
            .map(|ms| ms.max(0.0) as u64)
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn state(&self) -> ClockState {
        ClockState {
            running: self.running,
            started: self.anchor.is_some(),
            speed: self.speed,
            paused_accumulated_ms: self.paused_accumulated.as_millis() as u64,
        }
    }

    fn virtual_elapsed_ms(&self, now: Instant) -> Option<f64> {
        let anchor = self.anchor?;
        let effective_now = self.paused_at.unwrap_or(now);
        let wall = effective_now
            .saturating_duration_since(anchor)
            .saturating_sub(self.paused_accumulated);
        Some(self.anchor_elapsed_ms + wall.as_secs_f64() * 1000.0 * self.speed)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn sanitize_speed(speed: f64) -> f64 {
    if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        1.0
    }
}
