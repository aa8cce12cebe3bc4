//! Transport-safe payload encoding
//!
//! Printer command streams carry control bytes (ESC, GS, FS ...) that do not
//! survive JSON bodies or text columns. Such payloads are stored base64-encoded
//! together with a [`PayloadEncoding`] marker, and reversed right before the
//! bytes are handed to a printer.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{PrintError, PrintResult};

/// Marker recorded next to a stored payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// Payload is stored as submitted
    #[default]
    Unencoded,
    /// Payload is standard base64 (RFC 4648, padded)
    Base64,
}

impl PayloadEncoding {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PayloadEncoding::Unencoded => "unencoded",
            PayloadEncoding::Base64 => "base64",
        }
    }

    pub const fn is_encoded(&self) -> bool {
        !matches!(self, PayloadEncoding::Unencoded)
    }
}

impl fmt::Display for PayloadEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadEncoding {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unencoded" => Ok(PayloadEncoding::Unencoded),
            "base64" => Ok(PayloadEncoding::Base64),
            other => Err(PrintError::UnknownEncoding(other.to_string())),
        }
    }
}

/// Device control bytes (C0 range and DEL) other than tab, LF and CR
const fn is_device_control(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0C | 0x0E..=0x1F | 0x7F)
}

/// Whether the payload must be encoded before text transport
///
/// True when the payload contains a device control byte (ESC and GS among
/// them) or is not valid UTF-8 (e.g. already converted to a printer code page).
pub fn needs_encoding(payload: &[u8]) -> bool {
    payload.iter().copied().any(is_device_control) || std::str::from_utf8(payload).is_err()
}

/// Encode a payload if required, returning the stored bytes and their marker
pub fn encode(payload: Vec<u8>) -> (Vec<u8>, PayloadEncoding) {
    if needs_encoding(&payload) {
        (STANDARD.encode(&payload).into_bytes(), PayloadEncoding::Base64)
    } else {
        (payload, PayloadEncoding::Unencoded)
    }
}

/// Reverse [`encode`], reporting corrupt data
pub fn try_decode(stored: &[u8], encoding: PayloadEncoding) -> PrintResult<Vec<u8>> {
    match encoding {
        PayloadEncoding::Unencoded => Ok(stored.to_vec()),
        PayloadEncoding::Base64 => {
            // Tolerate line breaks some producers insert every 76 columns
            let compact: Vec<u8> = stored
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            STANDARD
                .decode(&compact)
                .map_err(|e| PrintError::Decode(e.to_string()))
        }
    }
}

/// Reverse [`encode`], falling back to the stored bytes when they are corrupt
pub fn decode(stored: &[u8], encoding: PayloadEncoding) -> Vec<u8> {
    try_decode(stored, encoding).unwrap_or_else(|_| stored.to_vec())
}
