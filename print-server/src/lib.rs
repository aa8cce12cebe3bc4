//! Print Server - receipt dispatch for polling network printers
//!
//! Producers queue receipts per printer; printers pull them with a two-phase
//! CloudPRNT-style protocol.
//!
//! ```text
//! print-server/src/
//! ├── core/       # config, state, errors, server
//! ├── printing/   # composer, ordering, job store, enqueue, poll handler
//! ├── api/        # HTTP routes and handlers
//! ├── db/         # SQLite pool and migrations
//! └── utils/      # logger, error re-exports
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod printing;
pub mod utils;

pub use api::build_app;
pub use core::{Config, Server, ServerError, ServerState};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use utils::logger::init_logger_with_file;

/// Load `.env` and initialize logging
pub fn setup_environment() -> Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    Ok(config)
}
