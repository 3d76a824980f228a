//! Query execution tool.
//!
//! This module implements the `execute_query` MCP tool for executing SELECT
//! queries. Anything that does not start with SELECT is refused by the gate
//! before a connection is acquired.

use crate::db::QueryGate;
use crate::error::DbResult;
use crate::models::{QueryParam, QueryResult, Statement};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Input for the execute_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL SELECT statement to execute. Write operations (INSERT/UPDATE/DELETE/DDL) are rejected.
    pub query: String,
    /// Positional parameters for parameterized queries (use ? on SQLite, $1,$2... on PostgreSQL)
    #[serde(default)]
    pub params: Vec<QueryParam>,
}

/// Output from the execute_query and get_sample_data tools.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    /// Column names in result order. Empty when no rows came back.
    pub columns: Vec<String>,
    /// Result rows as key-value maps
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// Number of rows returned
    pub row_count: usize,
    /// True if the engine had more rows than the row ceiling allowed
    pub truncated: bool,
    /// Warning message if any issues occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl QueryOutput {
    /// Build the output, adding a truncation warning that names the ceiling.
    pub fn from_result(result: QueryResult, ceiling: u32) -> Self {
        let warning = result
            .truncated
            .then(|| format!("Results limited to {} rows", ceiling));
        Self {
            row_count: result.row_count(),
            columns: result.columns,
            rows: result.rows,
            truncated: result.truncated,
            warning,
        }
    }

    /// Attach an extra warning, keeping any existing one.
    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = match (warning, self.warning.take()) {
            (Some(extra), Some(existing)) => Some(format!("{} {}", extra, existing)),
            (extra, existing) => extra.or(existing),
        };
        self
    }
}

#[derive(Debug, Clone)]
pub struct QueryToolHandler {
    gate: QueryGate,
}

impl QueryToolHandler {
    pub fn new(gate: QueryGate) -> Self {
        Self { gate }
    }

    pub async fn execute_query(&self, input: QueryInput) -> DbResult<QueryOutput> {
        let ceiling = self.gate.manager().policy().max_rows;
        let statement = Statement::with_params(input.query, input.params);
        let result = self.gate.execute_query(&statement).await?;
        Ok(QueryOutput::from_result(result, ceiling))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_input_deserialization() {
        let json = r#"{
            "query": "SELECT * FROM orders WHERE region = ? AND total > ?",
            "params": ["west", 10.5]
        }"#;

        let input: QueryInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.params.len(), 2);
        assert_eq!(input.params[0], QueryParam::String("west".to_string()));
        assert_eq!(input.params[1], QueryParam::Float(10.5));
    }

    #[test]
    fn test_query_input_params_default_empty() {
        let input: QueryInput = serde_json::from_str(r#"{"query": "SELECT 1"}"#).unwrap();
        assert!(input.params.is_empty());
    }

    #[test]
    fn test_output_warns_only_when_truncated() {
        let truncated = QueryOutput::from_result(
            QueryResult {
                columns: vec!["id".to_string()],
                rows: vec![serde_json::Map::new()],
                truncated: true,
            },
            1,
        );
        assert_eq!(truncated.warning.as_deref(), Some("Results limited to 1 rows"));
        assert_eq!(truncated.row_count, 1);

        let complete = QueryOutput::from_result(
            QueryResult {
                columns: Vec::new(),
                rows: Vec::new(),
                truncated: false,
            },
            1,
        );
        let value = serde_json::to_value(&complete).unwrap();
        assert_eq!(
            value,
            json!({ "columns": [], "rows": [], "row_count": 0, "truncated": false })
        );
    }

    #[test]
    fn test_with_warning_combines() {
        let output = QueryOutput::from_result(
            QueryResult {
                columns: Vec::new(),
                rows: Vec::new(),
                truncated: true,
            },
            0,
        )
        .with_warning(Some("Limit capped.".to_string()));
        assert_eq!(
            output.warning.as_deref(),
            Some("Limit capped. Results limited to 0 rows")
        );
    }
}
