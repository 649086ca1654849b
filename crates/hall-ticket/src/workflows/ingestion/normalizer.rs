use serde::Serialize;
use std::collections::HashMap;

/// Scalar cell value as read from a spreadsheet or CSV source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }

    /// Trimmed textual form, `None` when blank. Integral numbers drop the fraction.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(value) => {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Number(value) => Some(format_number(*value)),
            Self::Bool(value) => Some(value.to_string()),
        }
    }

    /// Finite numeric value; `NaN` and infinities read as absent.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Self::Number(value) => Some(*value),
            Self::Text(value) => value.trim().trim_end_matches('%').trim().parse().ok(),
            Self::Empty | Self::Bool(_) => None,
        };
        value.filter(|value: &f64| value.is_finite())
    }

    pub fn is_empty(&self) -> bool {
        self.as_text().is_none()
    }
}

pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One source row in header order, keys exactly as they appeared in the file.
pub type RawRow = Vec<(String, CellValue)>;

/// Row addressable by the canonical (trimmed, lower-cased) field vocabulary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRow {
    fields: HashMap<String, CellValue>,
}

impl NormalizedRow {
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(CellValue::as_text)
    }

    /// First non-blank value among `keys`, checked in order.
    pub fn text_any(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.text(key))
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(CellValue::as_number)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Trim and lower-case every key; values pass through untouched. When two
/// headers collapse to the same key the later column wins.
pub fn normalize_row(row: RawRow) -> NormalizedRow {
    let mut fields = HashMap::with_capacity(row.len());
    for (key, value) in row {
        fields.insert(key.trim().to_lowercase(), value);
    }
    NormalizedRow { fields }
}
