//! Instructions sent to the vision model alongside the screenshot.

use chrono::{Datelike, NaiveDate};
use slipscan_core::{Category, format_iso};

/// Assemble the extraction prompt.
///
/// A caller-supplied prompt is appended as extra instructions; the JSON
/// contract is always stated so the normalizer has something to parse.
pub fn build_prompt(
    custom: Option<&str>,
    members: &[String],
    currency: Option<&str>,
    today: NaiveDate,
) -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = format!(
        "You are reading a screenshot of a bank statement, card history or receipt.\n\
         Extract every transaction you can see and respond with ONLY a JSON array, no prose and no markdown.\n\
         Each element must be an object with these keys:\n\
         - \"date\": transaction date as YYYY-MM-DD. If the year is not shown, assume {year}. Today is {today}.\n\
         - \"description\": merchant or payee name exactly as shown.\n\
         - \"category\": one of: {categories}.\n\
         - \"amount\": positive number without currency symbols.\n\
         - \"type\": \"expense\" for money out, \"income\" for money in.\n\
         If nothing is legible, respond with [].",
        year = today.year(),
        today = format_iso(today),
    );

    if let Some(cur) = currency.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("\nAmounts are in {cur}."));
    }

    if !members.is_empty() {
        prompt.push_str(&format!(
            "\nThis is a shared ledger between: {}.\n\
             Also include \"payer\" (one of those names, default {}), \
             \"involved\" (array of names sharing the cost, default everyone) \
             and \"splitType\" (\"equal\").",
            members.join(", "),
            members[0],
        ));
    }

    if let Some(extra) = custom.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str("\n\nAdditional instructions:\n");
        prompt.push_str(extra);
    }

    prompt
}
