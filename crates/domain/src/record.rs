use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ActionMap;

/// One row returned by a list endpoint.
pub type Row = Map<String, Value>;

/// Field carrying the visible sequence number of a row.
pub const SEQUENCE_FIELD: &str = "s_no";

/// Processed result of one list-and-count call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    /// Rows of the current page.
    pub rows: Vec<Row>,
    /// Total rows matching the query.
    pub count: u64,
    /// Actions the caller may perform.
    pub actions: ActionMap,
}

/// Count member of a list-and-count response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountField {
    /// Plain total.
    Total(u64),
    /// Per-group counts, returned when the query groups rows.
    Grouped(Vec<Value>),
}

impl CountField {
    /// Total displayed to the user.
    #[must_use]
    pub fn total(&self) -> u64 {
        match self {
            Self::Total(total) => *total,
            Self::Grouped(groups) => u64::try_from(groups.len()).unwrap_or(u64::MAX),
        }
    }
}

impl Default for CountField {
    fn default() -> Self {
        Self::Total(0)
    }
}

/// Wire body of the list-and-count endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListAndCountResponse {
    /// Page rows.
    #[serde(default)]
    pub rows: Vec<Row>,
    /// Total or grouped counts.
    #[serde(default)]
    pub count: CountField,
    /// Server-declared actions.
    #[serde(default)]
    pub actions: ActionMap,
}

/// Returns whether a value counts as "empty" for form triggers and ids.
///
/// `null`, `false`, `""`, `0` and `NaN`-like numbers are falsy.
#[must_use]
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => text.is_empty(),
        Value::Number(number) => number.as_f64().is_none_or(|float| float == 0.0 || float.is_nan()),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Selectable option: a raw row with a normalized `label`/`value` pair on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Display label.
    pub label: Value,
    /// Submitted value.
    pub value: Value,
    /// Remaining row fields.
    #[serde(flatten)]
    pub fields: Row,
}

impl SelectOption {
    /// Layers `label`/`value` taken from the named fields over `row`.
    #[must_use]
    pub fn from_row(mut row: Row, label_field: &str, value_field: &str) -> Self {
        let label = row.get(label_field).cloned().unwrap_or(Value::Null);
        let value = row.get(value_field).cloned().unwrap_or(Value::Null);
        row.remove("label");
        row.remove("value");

        Self {
            label,
            value,
            fields: row,
        }
    }

    /// Returns the label as text, if it is a string.
    #[must_use]
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_str()
    }
}
