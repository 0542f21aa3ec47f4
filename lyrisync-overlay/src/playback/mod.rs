//! Playback timing: the virtual clock and the line scheduler

pub mod clock;
pub mod scheduler;

pub use clock::{Clock, ClockState};
pub use scheduler::{run_poll_loop, PollSettings, Scheduler, SchedulerEvent};
