use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One transaction as the model described it. Every field is untrusted and
/// kept as raw JSON until the normalizer coerces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTransaction {
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default, rename = "type")]
    pub tx_type: Option<Value>,
    /// Spelling used by already-normalized records.
    #[serde(default, rename = "txType", skip_serializing_if = "Option::is_none")]
    pub tx_type_alt: Option<Value>,
    #[serde(default)]
    pub payer: Option<Value>,
    #[serde(default)]
    pub involved: Option<Value>,
    #[serde(default)]
    pub split_type: Option<Value>,
    #[serde(default)]
    pub items: Option<Value>,
}

impl CandidateTransaction {
    /// Decode a JSON element. Non-objects are not transactions.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// `type`, falling back to `txType`.
    pub fn type_field(&self) -> Option<&Value> {
        self.tx_type.as_ref().or(self.tx_type_alt.as_ref())
    }
}

/// Caller context for a normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    /// Known ledger members; empty means no split context is emitted.
    pub members: Vec<String>,
    /// Reference date for missing years and unparsable dates.
    pub today: NaiveDate,
}

impl NormalizeOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            members: Vec::new(),
            today,
        }
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = members
            .into_iter()
            .map(Into::into)
            .map(|m: String| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        self
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::new(slipscan_core::today_local())
    }
}
