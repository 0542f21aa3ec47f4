//! Song session lifecycle: snapshot diffing, the state machine and
//! per-session context

pub mod context;
pub mod machine;
pub mod tracker;

pub use context::SessionContext;
pub use machine::{SessionMachine, SessionState};
pub use tracker::{SessionCommand, SessionTracker};
