//! Candidate filter and field normalizer.
//!
//! Every candidate field is coerced explicitly; declared JSON types from the
//! model are never trusted. A candidate without a usable description or a
//! positive amount is dropped, not zero-filled.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde_json::Value;
use slipscan_core::{
    format_iso, is_iso_date, iso_from_parts, CategoryLabel, NormalizedTransaction, SplitItem,
    SplitType, TxType,
};
use std::sync::LazyLock;
use tracing::debug;

use crate::types::{CandidateTransaction, NormalizeOptions};

static MONTH_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,2})/([0-9]{1,2})$").expect("valid M/D regex"));
static YEAR_MONTH_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})/([0-9]{1,2})/([0-9]{1,2})$").expect("valid Y/M/D regex"));
static NUMBER_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").expect("valid number regex")
});
static THOUSANDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?[0-9]{1,3}(?:,[0-9]{3})+(?:\.[0-9]*)?").expect("valid thousands regex")
});

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₩'];

/// Coerce the parsed payload into a candidate list.
///
/// `{"transactions": [...]}` unwraps to its field; any other object is a
/// single candidate.
pub fn candidates_from_value(value: &Value) -> Vec<CandidateTransaction> {
    match value {
        Value::Array(items) => items.iter().filter_map(CandidateTransaction::from_value).collect(),
        Value::Object(map) => match map.get("transactions") {
            Some(inner) => candidates_from_value(inner),
            None => CandidateTransaction::from_value(value).into_iter().collect(),
        },
        _ => Vec::new(),
    }
}

/// Normalize a batch, preserving source order.
///
/// `categorize` receives the description and the model's category text.
pub fn normalize_candidates<F>(
    candidates: &[CandidateTransaction],
    opts: &NormalizeOptions,
    categorize: F,
) -> Vec<NormalizedTransaction>
where
    F: Fn(&str, Option<&str>) -> CategoryLabel,
{
    let out: Vec<NormalizedTransaction> = candidates
        .iter()
        .filter_map(|c| normalize_candidate(c, opts, &categorize))
        .collect();
    debug!(
        candidates = candidates.len(),
        kept = out.len(),
        "normalized candidates"
    );
    out
}

pub fn normalize_candidate<F>(
    candidate: &CandidateTransaction,
    opts: &NormalizeOptions,
    categorize: &F,
) -> Option<NormalizedTransaction>
where
    F: Fn(&str, Option<&str>) -> CategoryLabel,
{
    let description = text_field(candidate.description.as_ref())?;
    let amount = candidate
        .amount
        .as_ref()
        .and_then(parse_amount)
        .map(round_cents)
        .filter(|a| a.is_finite() && *a > 0.0)?;

    let category_text = text_field(candidate.category.as_ref());
    let category = categorize(&description, category_text.as_deref());
    let tx_type = TxType::from_source(candidate.type_field().and_then(Value::as_str));
    let date = normalize_date(candidate.date.as_ref(), opts.today);

    let mut txn = NormalizedTransaction::new(date, description, category, amount, tx_type);

    if !opts.members.is_empty() {
        apply_split_context(&mut txn, candidate, &opts.members);
    }

    Some(txn)
}

/// `YYYY-MM-DD` passes through; `M/D` takes `today`'s year; `YYYY/M/D` is
/// rewritten. Anything else becomes `today`.
pub fn normalize_date(raw: Option<&Value>, today: NaiveDate) -> String {
    let Some(s) = raw.and_then(Value::as_str).map(str::trim) else {
        return format_iso(today);
    };

    if is_iso_date(s) {
        return s.to_string();
    }

    let padded = if let Some(caps) = MONTH_DAY_RE.captures(s) {
        let month: u32 = caps[1].parse().unwrap_or(0);
        let day: u32 = caps[2].parse().unwrap_or(0);
        iso_from_parts(today.year(), month, day)
    } else if let Some(caps) = YEAR_MONTH_DAY_RE.captures(s) {
        let year: i32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        iso_from_parts(year, month, day)
    } else {
        None
    };

    padded.unwrap_or_else(|| format_iso(today))
}

/// Numbers pass through; strings are read like `parseFloat` after dropping a
/// leading currency symbol and thousands separators.
pub fn parse_amount(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            let s = s.strip_prefix(CURRENCY_SYMBOLS).unwrap_or(s).trim_start();
            let cleaned = match THOUSANDS_RE.find(s) {
                Some(m) => m.as_str().replace(',', ""),
                None => s.to_string(),
            };
            NUMBER_PREFIX_RE.find(&cleaned)?.as_str().parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Round to the nearest cent, halves away from zero.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn text_field(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn apply_split_context(
    txn: &mut NormalizedTransaction,
    candidate: &CandidateTransaction,
    members: &[String],
) {
    let payer = candidate
        .payer
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|p| canonical_member(p, members))
        .or_else(|| members.first().cloned());

    let items = match candidate.split_type.as_ref().and_then(Value::as_str) {
        Some("custom") => candidate
            .items
            .as_ref()
            .map(|v| split_items(v, members))
            .filter(|items| !items.is_empty()),
        _ => None,
    };

    txn.payer = payer;
    txn.involved = Some(involved_members(candidate.involved.as_ref(), members));
    txn.split_type = Some(if items.is_some() {
        SplitType::Custom
    } else {
        SplitType::Equal
    });
    txn.items = items;
}

fn canonical_member(name: &str, members: &[String]) -> Option<String> {
    let name = name.trim();
    members
        .iter()
        .find(|m| m.to_lowercase() == name.to_lowercase())
        .cloned()
}

/// Known members named by the candidate, or everyone if it named none.
fn involved_members(raw: Option<&Value>, members: &[String]) -> Vec<String> {
    let names: Vec<&str> = match raw {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => s.split(',').collect(),
        _ => Vec::new(),
    };

    let mut out: Vec<String> = Vec::new();
    for name in names {
        if let Some(m) = canonical_member(name, members) {
            if !out.contains(&m) {
                out.push(m);
            }
        }
    }

    if out.is_empty() {
        members.to_vec()
    } else {
        out
    }
}

fn split_items(raw: &Value, members: &[String]) -> Vec<SplitItem> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let description = text_field(item.get("description"))?;
            let amount = item
                .get("amount")
                .and_then(parse_amount)
                .map(round_cents)
                .filter(|a| a.is_finite() && *a > 0.0)?;
            Some(SplitItem {
                description,
                amount,
                involved: involved_members(item.get("involved"), members),
            })
        })
        .collect()
}
