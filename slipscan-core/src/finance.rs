//! Finance record types produced by the extraction pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A transaction recovered from a screenshot, after cleanup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTransaction {
    /// Date of the transaction (YYYY-MM-DD)
    pub date: String,
    /// Human-readable description, never empty
    pub description: String,
    pub category: CategoryLabel,
    /// Always positive, rounded to cents
    pub amount: f64,
    pub tx_type: TxType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub involved: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_type: Option<SplitType>,
    /// Per-person breakdown, only for custom splits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SplitItem>>,
}

impl NormalizedTransaction {
    pub fn new(
        date: impl Into<String>,
        description: impl Into<String>,
        category: CategoryLabel,
        amount: f64,
        tx_type: TxType,
    ) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            category,
            amount,
            tx_type,
            payer: None,
            involved: None,
            split_type: None,
            items: None,
        }
    }

    pub fn is_income(&self) -> bool {
        self.tx_type == TxType::Income
    }

    /// Custom-split entries carry their own item breakdown and are never
    /// collapsed into each other.
    pub fn is_custom_split(&self) -> bool {
        self.split_type == Some(SplitType::Custom)
    }
}

/// Closed category taxonomy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Groceries,
    Shopping,
    Entertainment,
    Health,
    Education,
    Accommodation,
    Transfers,
    Travel,
    Communication,
    Vehicle,
    Laundry,
    Other,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Food,
        Category::Groceries,
        Category::Shopping,
        Category::Entertainment,
        Category::Health,
        Category::Education,
        Category::Accommodation,
        Category::Transfers,
        Category::Travel,
        Category::Communication,
        Category::Vehicle,
        Category::Laundry,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Groceries => "groceries",
            Category::Shopping => "shopping",
            Category::Entertainment => "entertainment",
            Category::Health => "health",
            Category::Education => "education",
            Category::Accommodation => "accommodation",
            Category::Transfers => "transfers",
            Category::Travel => "travel",
            Category::Communication => "communication",
            Category::Vehicle => "vehicle",
            Category::Laundry => "laundry",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Exact taxonomy name, case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Category as emitted: a taxonomy value, or the model's own text when no
/// rule recognised it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CategoryLabel {
    Known(Category),
    Custom(String),
}

impl CategoryLabel {
    pub fn as_str(&self) -> &str {
        match self {
            CategoryLabel::Known(c) => c.as_str(),
            CategoryLabel::Custom(s) => s,
        }
    }
}

impl From<Category> for CategoryLabel {
    fn from(c: Category) -> Self {
        CategoryLabel::Known(c)
    }
}

impl fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    #[default]
    Expense,
    Income,
}

impl TxType {
    /// Only the exact string "income" counts as income.
    pub fn from_source(raw: Option<&str>) -> Self {
        match raw {
            Some("income") => TxType::Income,
            _ => TxType::Expense,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    #[default]
    Equal,
    Custom,
}

/// One line of a custom split: who shares which part of the total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitItem {
    pub description: String,
    pub amount: f64,
    pub involved: Vec<String>,
}
