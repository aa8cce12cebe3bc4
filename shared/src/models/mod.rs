//! Data models
//!
//! Shared between print-server and its HTTP clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.

pub mod print_job;

// Re-exports
pub use print_job::*;
