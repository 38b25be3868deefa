//! End-to-end normalization of one model reply.

use slipscan_core::NormalizedTransaction;
use slipscan_ingest::{
    candidates_from_value, extract_payload, normalize_candidates, NormalizeOptions,
};
use tracing::debug;

use crate::category_rules::map_category;
use crate::dedupe::dedupe;

/// Raw model text in, clean transaction list out.
///
/// Never fails: anything the model got wrong degrades to fewer (or zero)
/// transactions.
pub fn normalize_model_output(raw: &str, opts: &NormalizeOptions) -> Vec<NormalizedTransaction> {
    let Some(payload) = extract_payload(raw) else {
        return Vec::new();
    };
    normalize_value(&payload, opts)
}

/// Same as [`normalize_model_output`] for an already-parsed payload.
pub fn normalize_value(
    payload: &serde_json::Value,
    opts: &NormalizeOptions,
) -> Vec<NormalizedTransaction> {
    let candidates = candidates_from_value(payload);
    let normalized = normalize_candidates(&candidates, opts, map_category);
    let before = normalized.len();
    let out = dedupe(normalized);
    debug!(
        candidates = candidates.len(),
        normalized = before,
        duplicates = before - out.len(),
        "model output normalized"
    );
    out
}
