// 🧾 Row Records - store boundary normalization
// Spreadsheet rows arrive as free-form JSON objects whose column names vary
// ("Month", "month", "monthData"). Everything past this module reads them
// through one canonical key per field.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// CANONICAL KEYS
// ============================================================================

pub mod keys {
    pub const ID: &str = "id";
    pub const MONTH: &str = "month";
    pub const TIMESTAMP: &str = "timestamp";

    pub const CONTROL_NUMBER: &str = "controlnumber";
    pub const RECORD_NUMBER: &str = "recordnumber";
    pub const AREA_CODE: &str = "areacode";
    pub const CATEGORY: &str = "category";
    pub const ENTRY_TITLE: &str = "entrytitle";
    pub const DESCRIPTION: &str = "description";
    pub const BEFORE_IMAGE: &str = "beforeimage";
    pub const IMPROVEMENT: &str = "improvement";
    pub const AFTER_IMAGE: &str = "afterimage";
    pub const IMPROVEMENT_EFFECT: &str = "improvementeffect";
    pub const DATE_AND_TIME: &str = "dateandtime";
}

/// Spelling variants folded onto a canonical key (after squashing)
const ALIASES: &[(&str, &str)] = &[
    ("monthdata", keys::MONTH),
    ("idnumber", keys::ID),
    ("date", keys::TIMESTAMP),
];

fn is_alias(squashed: &str) -> bool {
    ALIASES.iter().any(|(variant, _)| *variant == squashed)
}

fn squash(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Lowercase and drop everything that is not a letter or digit
///
/// "Control Number", "controlNumber" and "control_number" all squash to
/// "controlnumber".
pub fn canonical_key(raw: &str) -> String {
    let squashed = squash(raw);

    ALIASES
        .iter()
        .find(|(variant, _)| *variant == squashed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(squashed)
}

/// Spreadsheet cells come back typed; the rest of the system wants text
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

// ============================================================================
// ROW RECORD
// ============================================================================

/// One spreadsheet row keyed by canonical column name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RowRecord {
    fields: HashMap<String, String>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw (column, value) pairs
    ///
    /// When two spellings of the same field are present, the canonical
    /// spelling ("Timestamp") outranks an alias ("Date"); among equals the
    /// first non-empty value wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let (aliased, direct): (Vec<(String, String)>, Vec<_>) = pairs
            .into_iter()
            .map(|(key, value)| (key.as_ref().to_string(), value.into()))
            .partition(|(key, _)| is_alias(&squash(key)));

        let mut row = RowRecord::new();
        for (key, value) in direct.into_iter().chain(aliased) {
            row.insert(&key, value);
        }
        row
    }

    /// Build from a JSON object; non-objects yield an empty row
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                RowRecord::from_pairs(map.iter().map(|(k, v)| (k.as_str(), cell_text(v))))
            }
            _ => RowRecord::new(),
        }
    }

    fn insert(&mut self, raw_key: &str, value: String) {
        let key = canonical_key(raw_key);
        match self.fields.get(&key) {
            Some(existing) if !existing.is_empty() => {}
            _ => {
                self.fields.insert(key, value);
            }
        }
    }

    /// Value for a canonical key, if the column was present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Value for a canonical key, empty string when absent
    pub fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'de> Deserialize<'de> for RowRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(RowRecord::from_json(&value))
    }
}

// ============================================================================
// TESTS
// ============================================================================
