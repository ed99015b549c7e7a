//! # Chanplay Common Library
//!
//! Shared code for the chanplay playout services including:
//! - Input normalization (timestamps, durations)
//! - Database models and schema bootstrap
//! - Playout event types and the event bus
//! - Bootstrap configuration loading
//! - SSE helpers

pub mod config;
pub mod db;
pub mod duration;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use duration::DurationInput;
pub use error::{Error, Result};
pub use time::{NormalizedTime, TimestampInput};
