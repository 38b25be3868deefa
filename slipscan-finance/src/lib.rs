//! slipscan-finance: category rules, deduplication and the normalization pipeline

pub mod category_rules;
pub mod dedupe;
pub mod pipeline;

pub use category_rules::map_category;
pub use dedupe::{dedupe, is_duplicate};
pub use pipeline::{normalize_model_output, normalize_value};
