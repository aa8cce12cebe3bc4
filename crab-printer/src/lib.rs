//! # crab-printer
//!
//! Thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building
//! - Code page conversion (WPC1252, GBK)
//! - Transport-safe payload encoding for queued print jobs
//!
//! Business logic (WHAT to print) stays in application code:
//! - Kitchen ticket and customer receipt rendering → print-server
//!
//! ## Example
//!
//! ```
//! use crab_printer::{CodePage, CutMode, EscPosBuilder, payload};
//!
//! let mut builder = EscPosBuilder::new(48, CodePage::Wpc1252);
//! builder.center();
//! builder.double_size();
//! builder.line("KITCHEN ORDER");
//! builder.reset_size();
//! builder.sep_double();
//! builder.left();
//! builder.line("Table 12");
//! builder.cut(CutMode::Partial);
//!
//! let (stored, marker) = payload::encode(builder.build());
//! assert!(marker.is_encoded());
//! assert!(!payload::needs_encoding(&stored));
//! ```

mod encoding;
mod error;
mod escpos;
pub mod payload;

// Re-exports
pub use encoding::{CodePage, convert_to_code_page, text_width};
pub use error::{PrintError, PrintResult};
pub use escpos::{CutMode, EscPosBuilder};
pub use payload::PayloadEncoding;
