//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Stored payload could not be reversed to raw bytes
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Unknown payload encoding marker
    #[error("Unknown payload encoding: {0}")]
    UnknownEncoding(String),

    /// Invalid printer configuration (code page, width, ...)
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
