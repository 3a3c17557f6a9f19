//! Plain-text decoding with an encoding fallback chain.
//!
//! Bytes are tried against [`DECODE_CHAIN`] in order and the first strict
//! (non-lossy) decode wins:
//!
//! 1. UTF-8 (a leading BOM is dropped)
//! 2. UTF-16, only when a byte-order mark says so
//! 3. ISO-8859-1, only when no byte falls in the C1 range `0x80..=0x9F`
//! 4. Shift_JIS
//! 5. Windows-1252, which accepts any input
//!
//! The Latin-1 step refuses C1 bytes because they decode to control
//! characters; legacy CJK text is full of them, so it falls through to
//! Shift_JIS instead of coming out garbled.

use encoding_rs::{Encoding, SHIFT_JIS, UTF_16BE, UTF_16LE, WINDOWS_1252};

use super::{ExtractError, Extractor};

/// One attempt in the decode chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    Utf8,
    Utf16,
    Latin1,
    ShiftJis,
    Windows1252,
}

pub const DECODE_CHAIN: [DecodeStep; 5] = [
    DecodeStep::Utf8,
    DecodeStep::Utf16,
    DecodeStep::Latin1,
    DecodeStep::ShiftJis,
    DecodeStep::Windows1252,
];

impl DecodeStep {
    pub fn name(self) -> &'static str {
        match self {
            DecodeStep::Utf8 => "utf-8",
            DecodeStep::Utf16 => "utf-16",
            DecodeStep::Latin1 => "iso-8859-1",
            DecodeStep::ShiftJis => "shift_jis",
            DecodeStep::Windows1252 => "windows-1252",
        }
    }

    /// Returns `None` when the bytes are not valid in this encoding.
    pub fn attempt(self, bytes: &[u8]) -> Option<String> {
        match self {
            DecodeStep::Utf8 => {
                let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_string)
            }
            DecodeStep::Utf16 => {
                if let Some(body) = bytes.strip_prefix(b"\xFF\xFE") {
                    strict(UTF_16LE, body)
                } else if let Some(body) = bytes.strip_prefix(b"\xFE\xFF") {
                    strict(UTF_16BE, body)
                } else {
                    None
                }
            }
            DecodeStep::Latin1 => {
                if bytes.iter().any(|b| (0x80..=0x9F).contains(b)) {
                    None
                } else {
                    // Identical to ISO-8859-1 outside the C1 range.
                    strict(WINDOWS_1252, bytes)
                }
            }
            DecodeStep::ShiftJis => strict(SHIFT_JIS, bytes),
            DecodeStep::Windows1252 => strict(WINDOWS_1252, bytes),
        }
    }
}

fn strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

/// Runs the chain and reports which step succeeded.
pub fn decode(bytes: &[u8]) -> Result<(String, DecodeStep), ExtractError> {
    for step in DECODE_CHAIN {
        if let Some(text) = step.attempt(bytes) {
            tracing::trace!(encoding = step.name(), "decoded text");
            return Ok((text, step));
        }
    }
    Err(ExtractError::Encoding(
        "no encoding in the fallback chain accepted the input".to_string(),
    ))
}

/// Decodes to text, discarding which encoding matched.
pub fn decode_text(bytes: &[u8]) -> Result<String, ExtractError> {
    decode(bytes).map(|(text, _)| text)
}

/// `.txt` and friends.
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        decode_text(bytes)
    }
}
