//! Database models and schema bootstrap

pub mod init;
pub mod models;

pub use init::*;
pub use models::*;
