//! Date helpers shared by the normalizer and the prompt builder.

use chrono::{Local, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid ISO date regex"));

/// Today's date in the server's local timezone.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Format as `YYYY-MM-DD`.
pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// True when `s` has the `YYYY-MM-DD` shape (digits only, no calendar check).
pub fn is_iso_date(s: &str) -> bool {
    ISO_DATE_RE.is_match(s)
}

/// Build a zero-padded ISO string, or `None` if the parts are not a real date.
pub fn iso_from_parts(year: i32, month: u32, day: u32) -> Option<String> {
    NaiveDate::from_ymd_opt(year, month, day).map(format_iso)
}
