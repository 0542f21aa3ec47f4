//! # Lyrisync Common Library
//!
//! Shared code for the lyrisync overlay:
//! - Error type
//! - Bootstrap configuration and root folder resolution
//! - Lyrics cache database schema
//! - Overlay event types and the EventBus
//! - SSE streaming helpers
//! - Time formatting helpers

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
