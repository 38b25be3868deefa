//! slipscan-ingest: turn untrusted model text into normalized transactions.

pub mod normalize;
pub mod parsers;
pub mod types;

pub use normalize::{
    candidates_from_value, normalize_candidate, normalize_candidates, normalize_date,
    parse_amount, round_cents,
};
pub use parsers::{extract_json, extract_payload, JsonShape};
pub use types::{CandidateTransaction, NormalizeOptions};
