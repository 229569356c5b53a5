//! Record and scalar value types.
//!
//! Source records carry dynamically-typed fields (`serde_json::Value`
//! covers the full variant: null, bool, number, string, list, object).
//! The destination only tolerates the scalar subset, represented by
//! [`Scalar`]. The sanitizer in [`crate::sanitize`] is the single
//! conversion between the two.

use crate::{FieldName, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A warehouse-safe scalar value.
///
/// This is the only value shape the engine ever hands to the sink:
/// no booleans, no lists, no nested objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// True if this scalar is the null marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Convert back into a dynamic JSON value.
    pub fn into_value(self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Int(i) => serde_json::Value::from(i),
            Scalar::Float(f) => serde_json::Value::from(f),
            Scalar::Text(s) => serde_json::Value::String(s),
        }
    }
}

impl From<Scalar> for serde_json::Value {
    fn from(scalar: Scalar) -> Self {
        scalar.into_value()
    }
}

/// A record as fetched from the source: field name to dynamic value.
///
/// Immutable once fetched. The engine never mutates a record in place;
/// sanitization produces a fresh [`SanitizedRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub fields: BTreeMap<FieldName, serde_json::Value>,
}

impl Record {
    /// Build a record from field pairs.
    pub fn new(fields: impl IntoIterator<Item = (FieldName, serde_json::Value)>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// The source-assigned integer id, if the record carries one.
    pub fn id(&self) -> Option<RecordId> {
        self.fields.get("id").and_then(serde_json::Value::as_i64)
    }

    /// Field lookup by name.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    /// Iterate fields in deterministic (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &serde_json::Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A sanitized record ready for bulk insert: field name to scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SanitizedRecord {
    pub fields: BTreeMap<FieldName, Scalar>,
}

impl SanitizedRecord {
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
