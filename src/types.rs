//! Core data types for store-check
//!
//! This module provides the normalized value model used to compare records
//! across the legacy document store and the new relational store. Both store
//! adapters decode their native representations into [`RecordValue`] so the
//! checker can compare field values without knowing which store they came from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// A normalized field value as produced by either store adapter.
///
/// `Null` is a present value (a relational NULL or an explicit document null).
/// A field that does not exist on a record is represented by its absence from
/// the record's field map, not by a `RecordValue` variant.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    DateTime(DateTime<Utc>),
    Bytes(Vec<u8>),
    Array(Vec<RecordValue>),
    Object(HashMap<String, RecordValue>),
    Null,
}

impl RecordValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Compare two values under cross-store normalization.
    ///
    /// The same logical number may surface as `Int` from the document store
    /// and `Decimal` or `Float` from the relational store, so numeric
    /// variants compare equal when they denote exactly the same number.
    /// There is no epsilon: `1.5` equals `Decimal(1.5)`, `0.1 + 0.2` does
    /// not equal `Decimal(0.3)`. Arrays and objects compare element-wise
    /// under the same rules.
    pub fn eq_normalized(&self, other: &RecordValue) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => *a as f64 == *b,
            (Self::Int(a), Self::Decimal(b)) | (Self::Decimal(b), Self::Int(a)) => {
                Decimal::from(*a) == *b
            }
            (Self::Float(a), Self::Decimal(b)) | (Self::Decimal(b), Self::Float(a)) => {
                Decimal::from_f64_retain(*a)
                    .map(|d| d == *b)
                    .unwrap_or(false)
            }
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_normalized(y))
            }
            (Self::Object(a), Self::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map(|w| v.eq_normalized(w)).unwrap_or(false))
            }
            (a, b) => a == b,
        }
    }

    /// Render this value for mismatch reports and logs.
    pub fn render(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::String(s) => format!("{s:?}"),
            Self::DateTime(dt) => dt.to_rfc3339(),
            Self::Bytes(bytes) => {
                use base64::{engine::general_purpose, Engine as _};
                general_purpose::STANDARD.encode(bytes)
            }
            Self::Array(_) | Self::Object(_) => self
                .to_json()
                .map(|v| v.to_string())
                .unwrap_or_else(|_| format!("{self:?}")),
            Self::Null => "null".to_string(),
        }
    }

    /// Convert this value into a JSON value for report output.
    pub fn to_json(&self) -> anyhow::Result<serde_json::Value> {
        Ok(match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::Number(serde_json::Number::from(*i)),
            Self::Float(f) => serde_json::Value::Number(
                serde_json::Number::from_f64(*f)
                    .ok_or_else(|| anyhow::anyhow!("Non-finite float is not representable"))?,
            ),
            Self::Decimal(d) => serde_json::Value::String(d.to_string()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            Self::Bytes(bytes) => {
                use base64::{engine::general_purpose, Engine as _};
                serde_json::Value::String(general_purpose::STANDARD.encode(bytes))
            }
            Self::Array(arr) => serde_json::Value::Array(
                arr.iter().map(|v| v.to_json()).collect::<Result<_, _>>()?,
            ),
            Self::Object(obj) => {
                let mut map = serde_json::Map::new();
                for (key, value) in obj {
                    map.insert(key.clone(), value.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            Self::Null => serde_json::Value::Null,
        })
    }
}

/// Convert a plain JSON value to a [`RecordValue`].
///
/// Used for policy-file defaults and any source field that is already plain
/// JSON. Datetime strings are left as strings here; the store adapters decode
/// typed datetimes themselves.
pub fn json_to_record_value(value: serde_json::Value) -> anyhow::Result<RecordValue> {
    match value {
        serde_json::Value::Null => Ok(RecordValue::Null),
        serde_json::Value::Bool(b) => Ok(RecordValue::Bool(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(RecordValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(RecordValue::Float(f))
            } else {
                Err(anyhow::anyhow!("Unsupported JSON number: {n}"))
            }
        }
        serde_json::Value::String(s) => Ok(RecordValue::String(s)),
        serde_json::Value::Array(arr) => {
            let mut values = Vec::with_capacity(arr.len());
            for item in arr {
                values.push(json_to_record_value(item)?);
            }
            Ok(RecordValue::Array(values))
        }
        serde_json::Value::Object(map) => {
            let mut object = HashMap::with_capacity(map.len());
            for (key, val) in map {
                object.insert(key, json_to_record_value(val)?);
            }
            Ok(RecordValue::Object(object))
        }
    }
}

/// A single record read from either store, keyed by its stable identifier.
///
/// Records are transient: they are rebuilt on every run and the checker never
/// persists them.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Stable identifier shared across both stores.
    pub id: String,
    /// Field values (field name -> value). Absent fields are absent keys.
    pub fields: HashMap<String, RecordValue>,
}

impl Record {
    /// Create a new record with no fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    /// Create a record with a builder pattern.
    pub fn builder(id: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    /// Get a field value by name.
    pub fn get(&self, field: &str) -> Option<&RecordValue> {
        self.fields.get(field)
    }
}

/// Builder for [`Record`].
pub struct RecordBuilder {
    id: String,
    fields: HashMap<String, RecordValue>,
}

impl RecordBuilder {
    /// Add a field to the record.
    pub fn field(mut self, name: impl Into<String>, value: RecordValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Build the record.
    pub fn build(self) -> Record {
        Record {
            id: self.id,
            fields: self.fields,
        }
    }
}
