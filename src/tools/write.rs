//! Write operation tool.
//!
//! This module implements the `execute_write` MCP tool for INSERT, UPDATE,
//! DELETE and DDL statements. The tool is always listed; under a read-only
//! policy every call is refused with a policy violation.

use crate::db::QueryGate;
use crate::error::DbResult;
use crate::models::{QueryParam, Statement, WriteResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Input for the execute_write tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteInput {
    /// SQL statement to execute (INSERT, UPDATE, DELETE, or DDL like CREATE/DROP/ALTER)
    pub query: String,
    /// Positional parameters for parameterized queries (use ? on SQLite, $1,$2... on PostgreSQL)
    #[serde(default)]
    pub params: Vec<QueryParam>,
}

/// Output from the execute_write tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExecuteOutput {
    /// Number of rows affected by the operation
    pub rows_affected: u64,
    /// Row id of the inserted row (SQLite only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_id: Option<i64>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl ExecuteOutput {
    fn new(result: WriteResult, execution_time_ms: u64) -> Self {
        Self {
            rows_affected: result.rows_affected,
            generated_id: result.generated_id,
            execution_time_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriteToolHandler {
    gate: QueryGate,
}

impl WriteToolHandler {
    pub fn new(gate: QueryGate) -> Self {
        Self { gate }
    }

    pub async fn execute(&self, input: ExecuteInput) -> DbResult<ExecuteOutput> {
        let start = Instant::now();
        let statement = Statement::with_params(input.query, input.params);
        let result = self.gate.execute_write(&statement).await?;
        Ok(ExecuteOutput::new(
            result,
            start.elapsed().as_millis() as u64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_input_deserialization() {
        let input: ExecuteInput = serde_json::from_str(
            r#"{"query": "INSERT INTO orders (region) VALUES (?)", "params": ["east"]}"#,
        )
        .unwrap();
        assert_eq!(input.params, vec![QueryParam::String("east".to_string())]);
    }

    #[test]
    fn test_execute_output_serialization() {
        let output = ExecuteOutput::new(
            WriteResult {
                rows_affected: 3,
                generated_id: None,
            },
            7,
        );
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["rows_affected"], 3);
        assert!(json.get("generated_id").is_none());

        let output = ExecuteOutput::new(
            WriteResult {
                rows_affected: 1,
                generated_id: Some(13),
            },
            1,
        );
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["generated_id"], 13);
    }
}
