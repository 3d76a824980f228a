//! Shared fixtures for integration tests.

#![allow(dead_code)]

use db_gate_mcp::config::PoolOptions;
use db_gate_mcp::db::{ConnectionManager, QueryGate, SchemaInspector};
use db_gate_mcp::models::{
    ColumnDescriptor, EngineConfig, EngineKind, Policy, Statement, TableDescriptor,
};
use std::sync::Arc;
use tempfile::NamedTempFile;

pub const ORDER_COUNT: usize = 12;

/// A SQLite file holding `orders` (12 rows), `users` (2 rows) and a view.
///
/// Keep the returned file alive for as long as the database is used.
pub async fn seeded_sqlite() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let manager = sqlite_manager(&file, Policy::new(false, 1000)).await;
    let gate = QueryGate::new(manager.clone());

    for sql in [
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, region TEXT NOT NULL, total REAL, note TEXT DEFAULT 'none')",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        "CREATE VIEW west_orders AS SELECT * FROM orders WHERE region = 'west'",
    ] {
        gate.execute_write(&Statement::new(sql)).await.unwrap();
    }

    for i in 0..ORDER_COUNT {
        let region = if i % 2 == 0 { "west" } else { "east" };
        gate.execute_write(
            &Statement::new("INSERT INTO orders (region, total) VALUES (?, ?)")
                .bind(region)
                .bind(10.0 * (i as f64 + 1.0)),
        )
        .await
        .unwrap();
    }

    for name in ["ada", "grace"] {
        gate.execute_write(&Statement::new("INSERT INTO users (name) VALUES (?)").bind(name))
            .await
            .unwrap();
    }

    manager.close().await;
    file
}

/// A connected manager over `file` with the given policy.
pub async fn sqlite_manager(file: &NamedTempFile, policy: Policy) -> Arc<ConnectionManager> {
    let config = EngineConfig::new(EngineKind::Sqlite, file.path().to_str().unwrap(), policy);
    connected(config).await
}

/// Same as [`sqlite_manager`] with a custom command timeout.
pub async fn sqlite_manager_with_timeout(
    file: &NamedTempFile,
    policy: Policy,
    timeout_secs: u64,
) -> Arc<ConnectionManager> {
    let config = EngineConfig::new(EngineKind::Sqlite, file.path().to_str().unwrap(), policy)
        .with_pool_options(PoolOptions {
            command_timeout_secs: Some(timeout_secs),
            ..Default::default()
        });
    connected(config).await
}

/// A connected PostgreSQL manager, or `None` when TEST_POSTGRES_URL is unset.
pub async fn postgres_manager(policy: Policy) -> Option<Arc<ConnectionManager>> {
    postgres_manager_with_options(policy, PoolOptions::default()).await
}

/// Same as [`postgres_manager`] with custom pool sizing and timeout.
pub async fn postgres_manager_with_options(
    policy: Policy,
    pool_options: PoolOptions,
) -> Option<Arc<ConnectionManager>> {
    let url = match std::env::var("TEST_POSTGRES_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: TEST_POSTGRES_URL not set");
            return None;
        }
    };
    let config = EngineConfig::new(EngineKind::Postgres, url, policy).with_pool_options(pool_options);
    Some(connected(config).await)
}

async fn connected(config: EngineConfig) -> Arc<ConnectionManager> {
    let manager = Arc::new(ConnectionManager::new(config));
    manager.connect().await.unwrap();
    manager
}

pub fn inspector(manager: &Arc<ConnectionManager>) -> SchemaInspector {
    SchemaInspector::new(QueryGate::new(manager.clone()))
}

/// Column `name` of a described table; panics when absent.
pub fn column<'a>(table: &'a TableDescriptor, name: &str) -> &'a ColumnDescriptor {
    table
        .columns
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no column {name} in {}", table.name))
}
