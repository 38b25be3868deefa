//! Image payloads as clients send them: raw base64 or a `data:` URL.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:(?P<mime>[\w.+-]+/[\w.+-]+)?(?:;[^,;]+)*;base64,(?P<data>.*)$")
        .expect("valid data URL regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("No image provided")]
    Missing,
    #[error("Image is not valid base64: {0}")]
    InvalidBase64(String),
    #[error("Image data is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime: String,
    bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn parse(raw: &str) -> Result<Self, ImageError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ImageError::Missing);
        }

        let (declared_mime, data) = match DATA_URL_RE.captures(raw) {
            Some(caps) => (
                caps.name("mime").map(|m| m.as_str().to_ascii_lowercase()),
                caps.name("data").map(|m| m.as_str()).unwrap_or(""),
            ),
            None => (None, raw),
        };

        let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| ImageError::InvalidBase64(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }

        let mime = declared_mime.unwrap_or_else(|| sniff_mime(&bytes).to_string());
        Ok(Self { mime, bytes })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let mime = sniff_mime(&bytes).to_string();
        Ok(Self { mime, bytes })
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64())
    }
}

/// Guess the image type from magic bytes; screenshots are usually PNG or JPEG.
fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}
