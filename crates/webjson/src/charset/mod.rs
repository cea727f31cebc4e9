//! Character decoding for JSON read from streams and request bodies.
//!
//! Only the charsets a JSON producer realistically sends are supported.
//! Anything else is reported as a decode failure rather than guessed at.

use std::fmt;

use crate::errors::{Result, WebJsonError};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    UsAscii,
    Iso8859_1,
    Utf16Be,
    Utf16Le,
    /// UTF-16 with byte order taken from the BOM, big-endian without one.
    Utf16,
}

/// Raised when a stream names a charset we cannot decode.
#[derive(Debug)]
pub struct UnsupportedCharset(pub String);

impl fmt::Display for UnsupportedCharset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported character encoding: {}", self.0)
    }
}

impl std::error::Error for UnsupportedCharset {}

impl Charset {
    /// Look up a charset by name or common alias, ignoring case.
    pub fn for_name(name: &str) -> Result<Charset> {
        let normalized = name.trim().to_ascii_lowercase();
        let charset = match normalized.as_str() {
            "utf-8" | "utf8" => Charset::Utf8,
            "us-ascii" | "ascii" | "iso646-us" => Charset::UsAscii,
            "iso-8859-1" | "iso8859-1" | "iso_8859_1" | "latin1" | "l1" => Charset::Iso8859_1,
            "utf-16be" | "utf16be" => Charset::Utf16Be,
            "utf-16le" | "utf16le" => Charset::Utf16Le,
            "utf-16" | "utf16" => Charset::Utf16,
            _ => {
                return Err(WebJsonError::decode_with(
                    "Cannot read stream.",
                    UnsupportedCharset(name.to_string()),
                ))
            }
        };
        Ok(charset)
    }

    /// Canonical name of the charset.
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::UsAscii => "US-ASCII",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Utf16Le => "UTF-16LE",
            Charset::Utf16 => "UTF-16",
        }
    }

    /// Decode raw bytes into text.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Charset::Utf8 => {
                let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| WebJsonError::decode_with("malformed UTF-8 input", e))
            }
            Charset::UsAscii => {
                if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(WebJsonError::decode(format!(
                        "non-ASCII byte at offset {pos} in US-ASCII input"
                    )));
                }
                Ok(bytes.iter().map(|&b| b as char).collect())
            }
            Charset::Iso8859_1 => Ok(bytes.iter().map(|&b| b as char).collect()),
            Charset::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Charset::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Charset::Utf16 => match bytes {
                [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
                [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
                _ => decode_utf16(bytes, u16::from_be_bytes),
            },
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(WebJsonError::decode("truncated UTF-16 input"));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| WebJsonError::decode_with("malformed UTF-16 input", e))
}

/// Extract the `charset` parameter from a `Content-Type` header value.
pub fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then_some(value)
    })
}
