//! Wire codec for clipboard content.
//!
//! ```text
//! text:<utf-8 content>
//! image:<base64 of the PNG bytes>
//! ```
//!
//! No length prefix, no versioning. The prefix is the only type tag.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::DecodeError;

/// Wire prefix of a text frame.
pub const TEXT_PREFIX: &str = "text:";

/// Wire prefix of an image frame.
pub const IMAGE_PREFIX: &str = "image:";

/// Bootstrap frame written right after the socket opens. The peer does
/// not answer it.
pub const HANDSHAKE_FRAME: &str = "START_SYNC";

/// Default cap on a single image payload (decoded bytes).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 16 * 1024 * 1024;

// ── ContentEnvelope ──────────────────────────────────────────────

/// One unit of clipboard content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEnvelope {
    /// Plain UTF-8 text. May be empty.
    Text(String),
    /// Raw PNG bytes.
    Image(Vec<u8>),
}

impl ContentEnvelope {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Text(_) => ContentKind::Text,
            Self::Image(_) => ContentKind::Image,
        }
    }
}

/// Tag of a [`ContentEnvelope`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Image,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
        }
    }
}

// ── ContentCodec ─────────────────────────────────────────────────

/// Encodes envelopes to wire strings and back.
#[derive(Debug, Clone, Copy)]
pub struct ContentCodec {
    max_image_bytes: usize,
}

impl Default for ContentCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_BYTES)
    }
}

impl ContentCodec {
    pub fn new(max_image_bytes: usize) -> Self {
        Self { max_image_bytes }
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Render an envelope as a wire frame. Never fails.
    pub fn encode(&self, envelope: &ContentEnvelope) -> String {
        match envelope {
            ContentEnvelope::Text(text) => {
                let mut out = String::with_capacity(TEXT_PREFIX.len() + text.len());
                out.push_str(TEXT_PREFIX);
                out.push_str(text);
                out
            }
            ContentEnvelope::Image(bytes) => {
                let mut out = String::with_capacity(IMAGE_PREFIX.len() + bytes.len().div_ceil(3) * 4);
                out.push_str(IMAGE_PREFIX);
                STANDARD.encode_string(bytes, &mut out);
                out
            }
        }
    }

    /// Parse a wire frame. Pure: no clipboard or storage access.
    pub fn decode(&self, wire: &str) -> Result<ContentEnvelope, DecodeError> {
        if let Some(text) = wire.strip_prefix(TEXT_PREFIX) {
            return Ok(ContentEnvelope::Text(text.to_string()));
        }

        if let Some(body) = wire.strip_prefix(IMAGE_PREFIX) {
            return self.decode_image(body).map(ContentEnvelope::Image);
        }

        Err(DecodeError::UnknownContentType)
    }

    fn decode_image(&self, body: &str) -> Result<Vec<u8>, DecodeError> {
        // Line-wrapped base64 (76 columns) is common from mobile encoders.
        let compact: String;
        let body = if body.bytes().any(|b| b.is_ascii_whitespace()) {
            compact = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            compact.as_str()
        } else {
            body
        };

        // Exact for padded input; `=` carries no payload.
        let padding = body.bytes().rev().take_while(|&b| b == b'=').take(2).count();
        let estimated = (body.len() / 4 * 3).saturating_sub(padding);
        if estimated > self.max_image_bytes {
            return Err(DecodeError::TooLarge {
                size: estimated,
                max: self.max_image_bytes,
            });
        }

        STANDARD
            .decode(body)
            .map_err(|e| DecodeError::InvalidEncoding(e.to_string()))
    }
}

// ── Tests ────────────────────────────────────────────────────────
