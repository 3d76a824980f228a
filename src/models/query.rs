//! Statement and result models.
//!
//! This module defines the statement passed through the gate and the shapes
//! returned by the read and write paths.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A positional parameter value for parameterized statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for QueryParam {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for QueryParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Statement text plus positional parameters.
///
/// Parameters are bound through the engine's native mechanism; `text` is never
/// rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<QueryParam>,
}

impl Statement {
    /// Create a statement without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Create a statement with parameters.
    pub fn with_params(text: impl Into<String>, params: Vec<QueryParam>) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }

    /// Add a parameter.
    pub fn bind(mut self, param: impl Into<QueryParam>) -> Self {
        self.params.push(param.into());
        self
    }
}

/// Rows as returned by an adapter's read path, before truncation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRows {
    /// Column names in result order.
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
}

/// Result of a read, bounded by the row ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryResult {
    /// Column names in result order (empty when no rows came back)
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// True when the engine had more rows than the ceiling allowed
    pub truncated: bool,
}

impl QueryResult {
    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Result of a mutating statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WriteResult {
    pub rows_affected: u64,
    /// Autogenerated key, when the engine reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_id: Option<i64>,
}
