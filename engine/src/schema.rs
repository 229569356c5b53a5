//! Destination table identity and first-run schema bootstrapping.
//!
//! When the destination table does not exist yet, the engine infers a
//! column type for every field of one sample record and renders a
//! CREATE TABLE statement for the operator to run by hand. Single-sample
//! inference is advisory, not a contract of correctness: it tells the
//! operator what the engine saw, nothing more.

use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Column types the destination supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Integer,
    Float64,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "STRING"),
            FieldType::Integer => write!(f, "INTEGER"),
            FieldType::Float64 => write!(f, "FLOAT64"),
        }
    }
}

/// Infer a column type from one sample value.
///
/// Booleans map to STRING: the source emits `false` as a null sentinel on
/// otherwise non-boolean fields, so a boolean sample proves nothing about
/// the column. Lists and objects map to STRING because sanitization stores
/// them as JSON text. Numbers follow the sanitizer's split exactly: only
/// values representable as i64 infer INTEGER, anything wider goes to
/// FLOAT64 just as the sanitizer will write it.
pub fn infer_field_type(value: &Value) -> FieldType {
    match value {
        Value::Null => FieldType::String,
        Value::Bool(_) => FieldType::String,
        Value::Number(n) if n.is_i64() => FieldType::Integer,
        Value::Number(_) => FieldType::Float64,
        Value::Array(_) | Value::Object(_) => FieldType::String,
        Value::String(_) => FieldType::String,
    }
}

/// A fully-qualified destination table id: `project.dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

/// Raised when a table id is not of the dotted three-part form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("table id must be of the form project.dataset.table: {0}")]
pub struct InvalidTableId(pub String);

impl TableId {
    /// Parse a dotted `project.dataset.table` identifier.
    pub fn parse(raw: &str) -> Result<Self, InvalidTableId> {
        let mut parts = raw.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(project), Some(dataset), Some(table), None)
                if !project.is_empty() && !dataset.is_empty() && !table.is_empty() =>
            {
                Ok(Self {
                    project: project.to_string(),
                    dataset: dataset.to_string(),
                    table: table.to_string(),
                })
            }
            _ => Err(InvalidTableId(raw.to_string())),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// A generated CREATE TABLE statement for operator copy-paste.
///
/// Never executed by the engine itself: blind writes into an auto-created
/// table with wrongly inferred types are not cheaply recoverable, so table
/// creation stays a human decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableSql {
    pub table: TableId,
    pub columns: Vec<(String, FieldType)>,
}

impl CreateTableSql {
    /// Infer a statement from one sample record, one column per field.
    pub fn from_sample(table: TableId, sample: &Record) -> Self {
        let columns = sample
            .iter()
            .map(|(name, value)| (name.clone(), infer_field_type(value)))
            .collect();
        Self { table, columns }
    }

    /// The formatted multi-line statement.
    pub fn formatted(&self) -> String {
        let fields: Vec<String> = self
            .columns
            .iter()
            .map(|(name, field_type)| format!("  {name} {field_type}"))
            .collect();
        format!("CREATE TABLE `{}` (\n{}\n);", self.table, fields.join(",\n"))
    }

    /// The whitespace-collapsed single-line variant, for copying from logs.
    pub fn one_line(&self) -> String {
        self.formatted().split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
