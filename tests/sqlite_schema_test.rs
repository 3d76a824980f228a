//! Integration tests for schema introspection and sampling on SQLite.

mod common;

use common::{ORDER_COUNT, column, inspector, seeded_sqlite, sqlite_manager};
use db_gate_mcp::db::QueryGate;
use db_gate_mcp::error::{DbError, QueryErrorKind};
use db_gate_mcp::models::{EngineKind, Policy, Statement, TableKind};
use db_gate_mcp::tools::schema::{DescribeTableInput, SampleDataInput, SchemaToolHandler};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_list_tables_includes_views() {
    let file = seeded_sqlite().await;
    let manager = sqlite_manager(&file, Policy::default()).await;

    let tables = assert_ok!(inspector(&manager).list_tables().await);
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["orders", "users", "west_orders"]);
    assert_eq!(tables[2].kind, TableKind::View);
    assert_eq!(tables[0].kind, TableKind::Table);
}

#[tokio::test]
async fn test_describe_table_normalizes_columns() {
    let file = seeded_sqlite().await;
    let manager = sqlite_manager(&file, Policy::default()).await;

    let users = assert_ok!(inspector(&manager).describe_table("users").await);
    assert_eq!(users.name, "users");
    assert_eq!(users.row_count, 2);
    assert_eq!(users.columns.len(), 2);

    let id = column(&users, "id");
    assert!(id.is_primary_key);
    assert!(!id.nullable);
    assert_eq!(id.declared_type, "INTEGER");

    let name = column(&users, "name");
    assert!(!name.is_primary_key);
    assert!(!name.nullable);
    assert_eq!(users.primary_key(), vec!["id"]);
}

#[tokio::test]
async fn test_describe_table_defaults_and_nullable() {
    let file = seeded_sqlite().await;
    let manager = sqlite_manager(&file, Policy::default()).await;

    let orders = assert_ok!(inspector(&manager).describe_table("orders").await);
    assert_eq!(orders.row_count, ORDER_COUNT as u64);
    let note = column(&orders, "note");
    assert!(note.nullable);
    assert_eq!(note.default_value.as_deref(), Some("'none'"));
    assert!(column(&orders, "total").nullable);
}

#[tokio::test]
async fn test_describe_missing_table_is_not_found() {
    let file = seeded_sqlite().await;
    let manager = sqlite_manager(&file, Policy::default()).await;

    let err = assert_err!(inspector(&manager).describe_table("ghosts").await);
    assert!(matches!(
        err,
        DbError::Query {
            kind: QueryErrorKind::NotFound,
            ..
        }
    ));
}

#[tokio::test]
async fn test_read_only_scenario() {
    // max_rows 5 over a 12-row table
    let file = seeded_sqlite().await;
    let manager = sqlite_manager(&file, Policy::new(true, 5)).await;

    let sample = assert_ok!(inspector(&manager).sample("orders", 100).await);
    assert_eq!(sample.row_count(), 5);
    assert!(sample.truncated);

    let err = assert_err!(
        QueryGate::new(manager.clone())
            .execute_write(&Statement::new("DELETE FROM orders"))
            .await
    );
    assert!(matches!(err, DbError::PolicyViolation { .. }));
}

#[tokio::test]
async fn test_sample_uses_smaller_of_limit_and_max_rows() {
    let file = seeded_sqlite().await;
    let manager = sqlite_manager(&file, Policy::new(true, 1000)).await;
    let inspector = inspector(&manager);

    let sample = assert_ok!(inspector.sample("orders", 3).await);
    assert_eq!(sample.row_count(), 3);
    assert!(sample.truncated);

    let sample = assert_ok!(inspector.sample("users", 5).await);
    assert_eq!(sample.row_count(), 2);
    assert!(!sample.truncated);

    let sample = assert_ok!(inspector.sample("orders", ORDER_COUNT as u32).await);
    assert_eq!(sample.row_count(), ORDER_COUNT);
    assert!(!sample.truncated);
}

#[tokio::test]
async fn test_sample_missing_table_is_query_error() {
    let file = seeded_sqlite().await;
    let manager = sqlite_manager(&file, Policy::default()).await;
    let err = assert_err!(inspector(&manager).sample("ghosts", 5).await);
    assert!(matches!(err, DbError::Query { .. }));
}

#[tokio::test]
async fn test_schema_tool_handler() {
    let file = seeded_sqlite().await;
    let manager = sqlite_manager(&file, Policy::new(true, 4)).await;
    let handler = SchemaToolHandler::new(inspector(&manager), EngineKind::Sqlite, 4);

    let listed = assert_ok!(handler.list_tables().await);
    assert_eq!(listed.count, 3);
    assert_eq!(listed.engine, EngineKind::Sqlite);

    let described = assert_ok!(
        handler
            .describe_table(DescribeTableInput {
                table_name: " users ".to_string(),
            })
            .await
    );
    assert_eq!(described.name, "users");

    let sampled = assert_ok!(
        handler
            .get_sample_data(SampleDataInput {
                table_name: "orders".to_string(),
                limit: 500,
            })
            .await
    );
    assert_eq!(sampled.row_count, 4);
    assert!(sampled.truncated);
    let warning = sampled.warning.unwrap();
    assert!(warning.contains("exceeds maximum"));
    assert!(warning.contains("Results limited to 4 rows"));
}
