//! Shared types for the print dispatch services
//!
//! Common types used across multiple crates including error types,
//! response structures, wire models and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};
