//! # Chanplay Playout Library (chanplay-po)
//!
//! Scheduling and resolution engine for multi-channel playout.
//!
//! **Purpose:** Decide what every channel puts on air right now (live
//! override, a scheduled program, or the standby loop), rewrite program
//! start times as deterministic chains, and stage schedule edits as drafts
//! that publish atomically.
//!
//! **Architecture:** pure schedule logic (`schedule`, `fallback`) over
//! repository traits (`repository`) with a SQLite implementation, wrapped by
//! `PlayoutService` and exposed over HTTP/SSE (`api`).

pub mod api;
pub mod clock;
pub mod draft;
pub mod error;
pub mod fallback;
pub mod import;
pub mod repository;
pub mod reschedule;
pub mod schedule;
pub mod service;
pub mod ticker;

pub use error::{Error, Result};
pub use service::PlayoutService;
