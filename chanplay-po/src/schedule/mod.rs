//! Pure schedule logic: ordering, resolution, chaining

pub mod chain;
pub mod index;
pub mod resolver;

pub use chain::{chain, chain_starts, ChainError, Chainable};
pub use index::{schedule_order, ChannelSchedule, ProgramInput, RejectedProgram, ScheduleIndex};
pub use resolver::{resolve_active, ActiveWindow, ScheduleWindow, GRACE_PERIOD_SECS};
