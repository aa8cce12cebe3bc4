//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data.

use serde::{Deserialize, Serialize};

use crate::encoding::{CodePage, convert_to_code_page, text_width};

/// Paper cut performed at the end of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutMode {
    /// Leave a small connection (GS V 1)
    #[default]
    Partial,
    /// Cut through (GS V 0)
    Full,
    /// Do not cut
    None,
}

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
/// Text is accumulated as UTF-8 and converted to the code page on [`build`](Self::build).
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
    code_page: CodePage,
}

impl EscPosBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize, code_page: CodePage) -> Self {
        let mut buf = Vec::with_capacity(4096);
        // Initialize printer (ESC @)
        buf.extend_from_slice(&[0x1B, 0x40]);
        Self {
            buf,
            width,
            code_page,
        }
    }

    // === Text Output ===

    /// Write raw text
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// Print and feed n lines (ESC d n)
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        if lines > 0 {
            self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        }
        self
    }

    // === Alignment ===

    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    // === Text Style ===

    /// Enable bold text (ESC E 1)
    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x01]);
        self
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x00]);
        self
    }

    /// Enable single-dot underline (ESC - 1)
    pub fn underline(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x2D, 0x01]);
        self
    }

    pub fn underline_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x2D, 0x00]);
        self
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x11]);
        self
    }

    /// Double height only
    pub fn double_height(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x01]);
        self
    }

    /// Reset to normal size
    pub fn reset_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x00]);
        self
    }

    // === Separators ===

    /// Print a line of '=' characters
    pub fn sep_double(&mut self) -> &mut Self {
        self.line(&"=".repeat(self.width))
    }

    /// Print a line of '-' characters
    pub fn sep_single(&mut self) -> &mut Self {
        self.line(&"-".repeat(self.width))
    }

    // === Layout Helpers ===

    /// Print left and right text on the same line
    ///
    /// Left text is left-aligned, right text is right-aligned,
    /// with spaces filling the gap.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = text_width(left, self.code_page);
        let rw = text_width(right, self.code_page);

        if lw + rw >= self.width {
            // Too long, just print with space
            self.text(left);
            self.text(" ");
            self.line(right)
        } else {
            let spaces = self.width - lw - rw;
            self.text(left);
            self.text(&" ".repeat(spaces));
            self.line(right)
        }
    }

    // === Paper Control ===

    /// Cut paper with the given mode
    pub fn cut(&mut self, mode: CutMode) -> &mut Self {
        match mode {
            CutMode::Partial => self.buf.extend_from_slice(&[0x1D, 0x56, 0x01]),
            CutMode::Full => self.buf.extend_from_slice(&[0x1D, 0x56, 0x00]),
            CutMode::None => {}
        }
        self
    }

    // === Build ===

    /// Build the final byte buffer in the printer's code page
    pub fn build(self) -> Vec<u8> {
        convert_to_code_page(&self.buf, self.code_page)
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(48, CodePage::default())
    }
}
