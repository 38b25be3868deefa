//! Locate the JSON payload inside free-form model text.
//!
//! Models wrap their answer in markdown fences, prose, or both:
//!   Here are the transactions:
//!   ```json
//!   [{"date":"2025-11-02","description":"KFC","amount":24.35}]
//!   ```
//!
//! Anything that cannot be recovered degrades to `None`; callers treat that
//! as "no transactions", never as a request failure.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

static FENCE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n?").expect("valid fence regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Array,
    Object,
}

impl JsonShape {
    fn brackets(self) -> (u8, u8) {
        match self {
            JsonShape::Array => (b'[', b']'),
            JsonShape::Object => (b'{', b'}'),
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            JsonShape::Array => value.is_array(),
            JsonShape::Object => value.is_object(),
        }
    }
}

/// Remove surrounding whitespace and a single layer of markdown fencing.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = match FENCE_OPEN_RE.find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        None => trimmed,
    };
    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Extract the first JSON value of the requested shape from model text.
pub fn extract_json(raw: &str, shape: JsonShape) -> Option<Value> {
    let text = strip_code_fences(raw);
    let (open, close) = shape.brackets();

    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == open)?;
    let end = bytes.iter().rposition(|&b| b == close)?;
    if end < start {
        return None;
    }

    // First opener to last closer of that kind.
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(v) if shape.matches(&v) => return Some(v),
        Ok(_) => {}
        Err(e) => debug!(error = %e, ?shape, "span parse failed, trying balanced scan"),
    }

    let fragment = balanced_fragment(text, start, open, close)?;
    match serde_json::from_str::<Value>(fragment) {
        Ok(v) if shape.matches(&v) => Some(v),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, ?shape, "model output is not valid JSON");
            None
        }
    }
}

/// Extract the transaction payload. The shape whose opener appears first is
/// tried first, so arrays nested in an object reply are not picked alone.
pub fn extract_payload(raw: &str) -> Option<Value> {
    let text = strip_code_fences(raw);
    let (first, second) = match text.find(['[', '{']).map(|i| text.as_bytes()[i]) {
        Some(b'{') => (JsonShape::Object, JsonShape::Array),
        _ => (JsonShape::Array, JsonShape::Object),
    };
    let found = extract_json(raw, first).or_else(|| extract_json(raw, second));
    if found.is_none() {
        warn!(len = raw.len(), "no JSON payload found in model output");
    }
    found
}

/// String-aware bracket matcher starting at `start` (which holds `open`).
fn balanced_fragment(text: &str, start: usize, open: u8, close: u8) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escape_next {
            escape_next = false;
            continue;
        }
        if b == b'\\' && in_string {
            escape_next = true;
            continue;
        }
        if b == b'"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..=i]);
            }
        }
    }
    None
}
