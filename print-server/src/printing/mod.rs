//! Print Dispatch Module
//!
//! This module queues receipts per printer and serves them to polling printers:
//! - Receipt rendering: kitchen tickets and customer receipts, grouped and
//!   ordered by category
//! - Job store: durable per-printer queue (SQLite or in-memory)
//! - Enqueue service: validation, payload encoding, job creation
//! - Poll handler: the two-phase CloudPRNT-style pull protocol

pub mod cloudprnt;
pub mod enqueue;
pub mod memory;
pub mod ordering;
pub mod renderer;
pub mod store;
pub mod types;

pub use cloudprnt::{DeliveredJob, FetchOutcome, PollHandler};
pub use enqueue::{EnqueueError, EnqueueService, EnqueuedJob, PrintRequest};
pub use memory::MemoryJobStore;
pub use ordering::{CategoryOrderingTable, OrderingError};
pub use renderer::ReceiptRenderer;
pub use store::{JobStore, SqliteJobStore, StorageError, StorageResult};
pub use types::*;
