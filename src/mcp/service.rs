//! MCP service implementation using rmcp.
//!
//! This module defines the DbService struct with all database tools
//! exposed via the MCP protocol using the rmcp framework's macros.

use crate::db::{ConnectionManager, QueryGate, SchemaInspector};
use crate::tools::query::{QueryInput, QueryOutput, QueryToolHandler};
use crate::tools::schema::{
    DescribeTableInput, DescribeTableOutput, ListTablesOutput, SampleDataInput, SchemaToolHandler,
};
use crate::tools::write::{ExecuteInput, ExecuteOutput, WriteToolHandler};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct DbService {
    /// Shared connection manager for all database operations
    connection_manager: Arc<ConnectionManager>,
    query_handler: QueryToolHandler,
    write_handler: WriteToolHandler,
    schema_handler: SchemaToolHandler,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbService {
    /// Create a new DbService over a connected manager.
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        let gate = QueryGate::new(connection_manager.clone());
        let policy = connection_manager.policy();
        let schema_handler = SchemaToolHandler::new(
            SchemaInspector::new(gate.clone()),
            connection_manager.engine(),
            policy.max_rows,
        );
        Self {
            query_handler: QueryToolHandler::new(gate.clone()),
            write_handler: WriteToolHandler::new(gate),
            schema_handler,
            connection_manager,
            tool_router: Self::tool_router(),
        }
    }

    fn instructions(&self) -> String {
        let engine = self.connection_manager.engine();
        let policy = self.connection_manager.policy();
        let mode = if policy.read_only {
            "READ-ONLY: `execute_write` rejects every statement."
        } else {
            "READ-WRITE: `execute_write` accepts INSERT, UPDATE, DELETE and DDL."
        };
        format!(
            "Safety-gated SQL tools for a {engine} database.\n\
            \n\
            ## Workflow\n\
            1. Call `list_tables` to see what exists\n\
            2. Call `describe_table` for columns, primary keys and row counts\n\
            3. Call `get_sample_data` to see a few rows\n\
            4. Use `execute_query` for SELECT statements\n\
            \n\
            ## Policy\n\
            - Mode: {mode}\n\
            - At most {max_rows} rows are returned per call; `truncated: true` means more existed\n\
            - Only statements starting with SELECT count as reads (CTEs and PRAGMA are writes)\n\
            \n\
            ## Parameters\n\
            Pass values through `params`, never by string concatenation.\n\
            Placeholder syntax for {engine}: {placeholder}",
            engine = engine,
            mode = mode,
            max_rows = policy.max_rows,
            placeholder = engine.placeholder_hint(),
        )
    }
}

#[tool_router]
impl DbService {
    #[tool(description = "List all tables and views in the database.")]
    async fn list_tables(&self) -> Result<Json<ListTablesOutput>, McpError> {
        self.schema_handler
            .list_tables()
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Get schema information for a table.\nReturns columns (declared type, nullability, primary key, default) and the row count."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<Json<DescribeTableOutput>, McpError> {
        self.schema_handler
            .describe_table(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Get sample rows from a table to understand its contents.\nDefault 5 rows, max 100, and never more than the server's row limit."
    )]
    async fn get_sample_data(
        &self,
        Parameters(input): Parameters<SampleDataInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        self.schema_handler
            .get_sample_data(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Execute a SQL SELECT query and return results.\nUse parameterized queries for safety.\nResults are capped at the server's row limit; `truncated` reports whether more rows existed."
    )]
    async fn execute_query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        self.query_handler
            .execute_query(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Execute an INSERT, UPDATE, DELETE or DDL statement.\nRejected while the server is in read-only mode (DB_READ_ONLY=true, the default)."
    )]
    async fn execute_write(
        &self,
        Parameters(input): Parameters<ExecuteInput>,
    ) -> Result<Json<ExecuteOutput>, McpError> {
        self.write_handler
            .execute(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "db-gate-mcp".to_owned(),
                title: Some("DB Gate MCP".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(self.instructions()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EngineConfig, EngineKind, Policy};

    fn create_test_service(read_only: bool) -> DbService {
        let manager = Arc::new(ConnectionManager::new(EngineConfig::new(
            EngineKind::Sqlite,
            "unused.db",
            Policy::new(read_only, 25),
        )));
        DbService::new(manager)
    }

    #[test]
    fn test_server_info() {
        let service = create_test_service(true);
        let info = service.get_info();
        assert_eq!(info.server_info.name, "db-gate-mcp");
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_instructions_describe_policy() {
        let instructions = create_test_service(true).instructions();
        assert!(instructions.contains("READ-ONLY"));
        assert!(instructions.contains("25 rows"));
        assert!(instructions.contains("SQLite"));

        let instructions = create_test_service(false).instructions();
        assert!(instructions.contains("READ-WRITE"));
    }

    #[tokio::test]
    async fn test_execute_write_read_only_is_invalid_params() {
        let service = create_test_service(true);
        let Err(err) = service
            .execute_write(Parameters(ExecuteInput {
                query: "DELETE FROM orders".to_string(),
                params: Vec::new(),
            }))
            .await
        else {
            panic!("execute_write succeeded under a read-only policy");
        };
        assert_eq!(err.code.0, -32602);
        assert!(err.message.contains("read-only"));
    }

    #[tokio::test]
    async fn test_execute_query_rejects_write_before_connecting() {
        let service = create_test_service(false);
        let Err(err) = service
            .execute_query(Parameters(QueryInput {
                query: "UPDATE orders SET total = 0".to_string(),
                params: Vec::new(),
            }))
            .await
        else {
            panic!("execute_query accepted an UPDATE");
        };
        assert_eq!(err.code.0, -32602);
    }
}
