//! Code page utilities for thermal printers
//!
//! Receipt text is assembled as UTF-8 and converted to the printer's
//! code page right before it leaves the builder. This module provides:
//! - Display width of a string on the selected code page
//! - Truncating/padding strings to a column width
//! - Converting UTF-8 to the code page while preserving ESC/POS commands

use std::fmt;
use std::str::FromStr;

use tracing::instrument;

use crate::error::PrintError;

const ESC: u8 = 0x1B;
const INIT: u8 = 0x40;

/// Character code page understood by the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodePage {
    /// Windows-1252 (Western European, includes € æ ø å)
    #[default]
    Wpc1252,
    /// GBK double-byte mode for Chinese printers
    Gbk,
}

impl CodePage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CodePage::Wpc1252 => "wpc1252",
            CodePage::Gbk => "gbk",
        }
    }

    fn encoding(&self) -> &'static encoding_rs::Encoding {
        match self {
            CodePage::Wpc1252 => encoding_rs::WINDOWS_1252,
            CodePage::Gbk => encoding_rs::GBK,
        }
    }

    /// Bytes that switch the printer into this code page
    ///
    /// Must follow every INIT (ESC @), which resets the selection.
    fn select_sequence(&self) -> &'static [u8] {
        match self {
            // ESC t 16 - Select WPC1252
            CodePage::Wpc1252 => &[ESC, 0x74, 16],
            // FS & - Enable Chinese mode, FS C 1 - Select GBK
            CodePage::Gbk => &[0x1C, 0x26, 0x1C, 0x43, 0x01],
        }
    }

    /// Bytes appended at the end of the stream
    fn exit_sequence(&self) -> &'static [u8] {
        match self {
            CodePage::Wpc1252 => &[],
            // FS . - Exit Chinese mode
            CodePage::Gbk => &[0x1C, 0x2E],
        }
    }

    /// Encoded width of a single character (unmappable characters print as '?')
    fn char_width(&self, c: char) -> usize {
        let mut tmp = [0u8; 4];
        let (cow, _, had_errors) = self.encoding().encode(c.encode_utf8(&mut tmp));
        if had_errors { 1 } else { cow.len() }
    }
}

impl fmt::Display for CodePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodePage {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wpc1252" | "cp1252" | "windows-1252" => Ok(CodePage::Wpc1252),
            "gbk" => Ok(CodePage::Gbk),
            other => Err(PrintError::InvalidConfig(format!("unknown code page: {other}"))),
        }
    }
}

/// Get the printed width of a string on the given code page
///
/// Chinese characters are 2 columns in GBK; everything is 1 column in WPC1252.
pub fn text_width(s: &str, page: CodePage) -> usize {
    s.chars().map(|c| page.char_width(c)).sum()
}

/// Convert mixed UTF-8 content (with ESC/POS commands) to a printer code page
///
/// ASCII bytes (0x00-0x7F) are kept exactly as is, which protects ESC/POS
/// commands from being corrupted. Only bytes >= 0x80 are treated as UTF-8
/// sequences and converted.
///
/// Also handles:
/// - Re-selecting the code page after every INIT command (ESC @)
/// - Euro symbol (€) on GBK printers, which GBK cannot represent
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn convert_to_code_page(bytes: &[u8], page: CodePage) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len() + 16);

    if !bytes.starts_with(&[ESC, INIT]) {
        result.extend_from_slice(page.select_sequence());
    }

    let mut buffer = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if b == ESC && bytes.get(i + 1) == Some(&INIT) {
            flush_buffer(&mut buffer, &mut result, page);
            result.extend_from_slice(&[ESC, INIT]);
            result.extend_from_slice(page.select_sequence());
            i += 2;
            continue;
        }

        if b < 128 {
            flush_buffer(&mut buffer, &mut result, page);
            result.push(b);
        } else {
            buffer.push(b);
        }
        i += 1;
    }

    flush_buffer(&mut buffer, &mut result, page);
    result.extend_from_slice(page.exit_sequence());

    result
}

/// Flush the non-ASCII buffer, converting UTF-8 to the code page
fn flush_buffer(buffer: &mut Vec<u8>, result: &mut Vec<u8>, page: CodePage) {
    if buffer.is_empty() {
        return;
    }

    let s = String::from_utf8_lossy(buffer);
    match page {
        CodePage::Wpc1252 => encode_chars(&s, page, result),
        CodePage::Gbk => {
            let parts: Vec<&str> = s.split('€').collect();
            for (idx, part) in parts.iter().enumerate() {
                encode_chars(part, page, result);
                if idx < parts.len() - 1 {
                    // Exit Chinese -> PC858 -> Euro -> Enter Chinese
                    result.extend_from_slice(&[0x1C, 0x2E, ESC, 0x74, 19, 0xD5, 0x1C, 0x26]);
                }
            }
        }
    }
    buffer.clear();
}

fn encode_chars(s: &str, page: CodePage, result: &mut Vec<u8>) {
    let mut tmp = [0u8; 4];
    for c in s.chars() {
        let (cow, _, had_errors) = page.encoding().encode(c.encode_utf8(&mut tmp));
        if had_errors {
            result.push(b'?');
        } else {
            result.extend_from_slice(&cow);
        }
    }
}
