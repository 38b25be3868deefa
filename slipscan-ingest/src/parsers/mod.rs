//! Parsers for text produced by external vision models.

pub mod model_output;

pub use model_output::{extract_json, extract_payload, strip_code_fences, JsonShape};
