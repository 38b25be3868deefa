//! Deterministic category rules mapping a description and the model's own
//! category text onto the fixed taxonomy.
//!
//! The full rule list runs against the description first, then against the
//! category text. Within one pass the precedence is:
//! merchant overrides > category keywords > merchant fallbacks.
//! If nothing matches, the category text is kept verbatim (or `other`).

use slipscan_core::{Category, CategoryLabel};

type Rule = (&'static [&'static str], Category);

/// Specific merchants whose names would otherwise hit a broader keyword.
/// "uber eats" must precede "uber".
const MERCHANT_OVERRIDES: &[Rule] = &[
    (&["qut", "unimelb", "rmit", "monash uni", "tafe", "university"], Category::Education),
    (&["uber eats", "ubereats", "menulog", "doordash", "deliveroo"], Category::Food),
    (&["uber", "didi", "ola cabs", "13cabs", "myki", "opal", "translink", "go card", "linkt"], Category::Vehicle),
    (&["ampol", "caltex", "bp connect", "7-eleven fuel", "shell coles express"], Category::Vehicle),
    (&["netflix", "spotify", "disney+", "stan.com", "hoyts", "event cinemas", "steam games"], Category::Entertainment),
    (&["telstra", "optus", "vodafone", "aussie broadband", "belong"], Category::Communication),
    (&["airbnb", "booking.com", "hotels.com", "hostel", "motel", "hotel"], Category::Accommodation),
    (&["chemist warehouse", "priceline", "pharmacy", "medicare", "bupa"], Category::Health),
    (&["laundromat", "dry clean"], Category::Laundry),
    (&["qantas", "jetstar", "virgin australia", "rex airlines", "skyscanner"], Category::Travel),
    (&["bunnings", "kmart", "big w", "jb hi-fi", "officeworks", "amazon"], Category::Shopping),
    (&["osko", "payid", "beem it"], Category::Transfers),
];

/// Generic keywords, typically found in the model's category text.
const CATEGORY_KEYWORDS: &[Rule] = &[
    (&["takeaway", "take away", "eating out", "restaurant", "dining", "food & drink"], Category::Food),
    (&["grocer", "supermarket"], Category::Groceries),
    (&["transfer", "payment"], Category::Transfers),
    (&["entertainment", "streaming", "movies"], Category::Entertainment),
    (&["transport", "fuel", "petrol", "parking", "toll", "car "], Category::Vehicle),
    (&["health", "medical", "doctor", "dental"], Category::Health),
    (&["education", "tuition", "school", "course"], Category::Education),
    (&["shopping", "retail", "clothing"], Category::Shopping),
    (&["travel", "flight", "airline"], Category::Travel),
    (&["accommodation", "lodging"], Category::Accommodation),
    (&["phone", "mobile", "internet", "utilities"], Category::Communication),
    (&["laundry"], Category::Laundry),
];

/// Household names that only decide when nothing more specific did.
const MERCHANT_FALLBACKS: &[Rule] = &[
    (
        &[
            "mcdonald", "kfc", "hungry jack", "subway", "domino", "pizza", "guzman",
            "nando", "grill'd", "starbucks", "gloria jean", "cafe", "café", "coffee",
            "bakery", "sushi", "burger", "noodle", "kebab",
        ],
        Category::Food,
    ),
    (
        &["woolworths", "coles", "aldi", "foodworks", "costco", "harris farm", "spar "],
        Category::Groceries,
    ),
    (&["target"], Category::Shopping),
];

/// Map a transaction onto the taxonomy.
pub fn map_category(description: &str, category: Option<&str>) -> CategoryLabel {
    if let Some(c) = match_text(description) {
        return c.into();
    }

    match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(text) => match match_text(text) {
            Some(c) => c.into(),
            None => CategoryLabel::Custom(text.to_string()),
        },
        None => Category::Other.into(),
    }
}

/// One pass of the ordered rule list over a single piece of text.
fn match_text(text: &str) -> Option<Category> {
    let haystack = text.to_lowercase();
    if haystack.trim().is_empty() {
        return None;
    }

    if let Some(c) = first_match(&haystack, MERCHANT_OVERRIDES) {
        return Some(c);
    }

    // A bare taxonomy name maps to itself.
    if let Ok(c) = haystack.parse::<Category>() {
        return Some(c);
    }

    first_match(&haystack, CATEGORY_KEYWORDS).or_else(|| first_match(&haystack, MERCHANT_FALLBACKS))
}

fn first_match(haystack: &str, rules: &[Rule]) -> Option<Category> {
    rules
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| haystack.contains(n)))
        .map(|(_, c)| *c)
}
