// pipeguard-core/src/domain/batch.rs

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::domain::error::DomainError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single cell. Numbers and dates may also arrive as text (CSV) and are
/// coerced on demand by the rules that need them.
///
/// Serialize only: a date and its text form share one JSON encoding, so
/// batches are decoded through [`Batch::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    /// Null, or text that is empty once trimmed.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok(),
            _ => None,
        }
    }

    /// Hashable identity used for distinct counts and deduplication.
    pub(crate) fn key(&self) -> Option<ValueKey<'_>> {
        match self {
            v if v.is_missing() => None,
            Value::Number(n) => {
                // 0.0 and -0.0 are the same value
                let n = if *n == 0.0 { 0.0 } else { *n };
                Some(ValueKey::Number(n.to_bits()))
            }
            Value::Date(d) => Some(ValueKey::Date(*d)),
            Value::Text(s) => Some(ValueKey::Text(s.as_str())),
            Value::Null => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey<'a> {
    Number(u64),
    Date(NaiveDate),
    Text(&'a str),
}

pub type Record = BTreeMap<String, Value>;

/// Rows handed over by the extract step plus the columns they are expected to carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Batch {
    pub name: String,
    pub schema: Vec<String>,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub batch: Batch,
    pub removed: usize,
}

impl Batch {
    pub fn new(name: impl Into<String>, schema: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            schema,
            records,
        }
    }

    /// Interprets a JSON document as a batch. Anything that is not an array of
    /// objects with scalar fields is a structural error.
    pub fn from_json(
        name: impl Into<String>,
        schema: Vec<String>,
        doc: &serde_json::Value,
    ) -> Result<Self, DomainError> {
        let rows = doc.as_array().ok_or_else(|| {
            DomainError::StructuralError(format!(
                "expected an array of records, found {}",
                json_kind(doc)
            ))
        })?;

        let mut records = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            let fields = row.as_object().ok_or_else(|| {
                DomainError::StructuralError(format!(
                    "row {} is {}, expected an object",
                    idx,
                    json_kind(row)
                ))
            })?;

            let mut record = Record::new();
            for (column, raw) in fields {
                let value = match raw {
                    serde_json::Value::Null => Value::Null,
                    serde_json::Value::Bool(b) => Value::Text(b.to_string()),
                    serde_json::Value::Number(n) => n
                        .as_f64()
                        .map(Value::Number)
                        .unwrap_or_else(|| Value::Text(n.to_string())),
                    serde_json::Value::String(s) => Value::Text(s.clone()),
                    other => {
                        return Err(DomainError::StructuralError(format!(
                            "row {} field '{}' is {}, expected a scalar",
                            idx,
                            column,
                            json_kind(other)
                        )));
                    }
                };
                record.insert(column.clone(), value);
            }
            records.push(record);
        }

        Ok(Self::new(name, schema, records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keeps the first record for each key value. Records with a missing key are kept.
    pub fn deduplicate(&self, key: &str) -> DedupOutcome {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(self.records.len());

        for record in &self.records {
            match record.get(key).and_then(Value::key) {
                Some(k) if !seen.insert(k) => continue,
                _ => kept.push(record.clone()),
            }
        }

        let removed = self.records.len() - kept.len();
        DedupOutcome {
            batch: Batch::new(self.name.clone(), self.schema.clone(), kept),
            removed,
        }
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Builds a record from `(column, value)` pairs.
pub fn record<I, K, V>(fields: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
