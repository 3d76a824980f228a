//! Connection lifecycle management.
//!
//! The [`ConnectionManager`] is built once from an [`EngineConfig`], connected
//! once at startup and closed once at shutdown. In between it hands out
//! [`ConnectionHandle`]s, each owned by exactly one call.

use crate::db::adapter::EngineAdapter;
#[cfg(feature = "sqlite")]
use crate::db::direct::{DirectAdapter, DirectEngine};
#[cfg(feature = "postgres")]
use crate::db::pooled::{PooledAdapter, PooledEngine};
use crate::error::{DbError, DbResult};
use crate::models::{
    EngineConfig, EngineKind, Policy, RawColumn, RawRows, Statement, TableEntry, WriteResult,
};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Engine-specific state created by `connect()`.
#[derive(Debug)]
enum Engine {
    #[cfg(feature = "sqlite")]
    Direct(DirectEngine),
    #[cfg(feature = "postgres")]
    Pooled(PooledEngine),
}

/// Owns the engine for the lifetime of the process.
#[derive(Debug)]
pub struct ConnectionManager {
    config: EngineConfig,
    engine: OnceLock<Engine>,
    closed: AtomicBool,
}

impl ConnectionManager {
    /// Create an unconnected manager.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            engine: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Initialize engine-specific state.
    ///
    /// The pooled engine opens its pool here. The direct engine only prepares
    /// connection options; its connections are opened per call.
    pub async fn connect(&self) -> DbResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::connection(
                "Connection manager has been closed",
                "Create a new connection manager",
            ));
        }
        if self.engine.get().is_some() {
            return Err(DbError::connection(
                "Connection manager is already connected",
                "Call connect() once at startup",
            ));
        }

        info!(
            engine = %self.config.engine,
            target = %self.config.masked_target(),
            read_only = self.config.policy.read_only,
            max_rows = self.config.policy.max_rows,
            "Connecting to database"
        );

        let engine = match self.config.engine {
            #[cfg(feature = "sqlite")]
            EngineKind::Sqlite => Engine::Direct(DirectEngine::prepare(&self.config)?),
            #[cfg(feature = "postgres")]
            EngineKind::Postgres => Engine::Pooled(PooledEngine::connect(&self.config).await?),
            #[allow(unreachable_patterns)]
            other => {
                return Err(DbError::configuration(format!(
                    "{} support is not compiled in; rebuild with the '{}' feature",
                    other.display_name(),
                    other.feature_name()
                )));
            }
        };

        if let Err(engine) = self.engine.set(engine) {
            // Lost a race with a concurrent connect()
            Self::shutdown(&engine).await;
            return Err(DbError::connection(
                "Connection manager is already connected",
                "Call connect() once at startup",
            ));
        }

        info!(engine = %self.config.engine, "Connected");
        Ok(())
    }

    /// Acquire a connection for one call.
    ///
    /// Pooled: waits up to the command timeout for a free connection.
    /// Direct: opens a fresh connection.
    pub async fn acquire(&self) -> DbResult<ConnectionHandle> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::connection(
                "Connection manager is closed",
                "The server is shutting down; no new calls are accepted",
            ));
        }
        let engine = self.engine.get().ok_or_else(|| {
            DbError::connection(
                "Connection manager is not connected",
                "Call connect() before issuing queries",
            )
        })?;

        match engine {
            #[cfg(feature = "sqlite")]
            Engine::Direct(direct) => direct.open().await.map(ConnectionHandle::Direct),
            #[cfg(feature = "postgres")]
            Engine::Pooled(pooled) => pooled.acquire().await.map(ConnectionHandle::Pooled),
        }
    }

    /// Release all pooled resources. Safe to call more than once.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Connection manager already closed");
            return;
        }
        if let Some(engine) = self.engine.get() {
            Self::shutdown(engine).await;
        }
        info!("Connection manager closed");
    }

    async fn shutdown(engine: &Engine) {
        match engine {
            #[cfg(feature = "sqlite")]
            Engine::Direct(_) => {}
            #[cfg(feature = "postgres")]
            Engine::Pooled(pooled) => pooled.close().await,
        }
    }

    /// Current policy, copied out for one call.
    pub fn policy(&self) -> Policy {
        self.config.policy
    }

    pub fn engine(&self) -> EngineKind {
        self.config.engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.engine.get().is_some() && !self.is_closed()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// One live session, exclusively owned by the call that acquired it.
///
/// Dropping the handle closes (direct) or returns (pooled) the connection;
/// [`ConnectionHandle::release`] does the same but waits for a clean close.
#[derive(Debug)]
pub enum ConnectionHandle {
    #[cfg(feature = "sqlite")]
    Direct(DirectAdapter),
    #[cfg(feature = "postgres")]
    Pooled(PooledAdapter),
}

macro_rules! dispatch {
    ($handle:expr, $adapter:ident => $body:expr) => {
        match $handle {
            #[cfg(feature = "sqlite")]
            ConnectionHandle::Direct($adapter) => $body,
            #[cfg(feature = "postgres")]
            ConnectionHandle::Pooled($adapter) => $body,
        }
    };
}

impl ConnectionHandle {
    /// Close or return the underlying connection.
    pub async fn release(self) {
        match self {
            #[cfg(feature = "sqlite")]
            ConnectionHandle::Direct(adapter) => adapter.close().await,
            #[cfg(feature = "postgres")]
            ConnectionHandle::Pooled(adapter) => adapter.release(),
        }
    }
}

impl EngineAdapter for ConnectionHandle {
    fn engine(&self) -> EngineKind {
        dispatch!(self, adapter => adapter.engine())
    }

    async fn execute_read(&mut self, statement: &Statement, fetch_limit: usize) -> DbResult<RawRows> {
        dispatch!(self, adapter => adapter.execute_read(statement, fetch_limit).await)
    }

    async fn execute_write(&mut self, statement: &Statement) -> DbResult<WriteResult> {
        dispatch!(self, adapter => adapter.execute_write(statement).await)
    }

    async fn list_tables(&mut self) -> DbResult<Vec<TableEntry>> {
        dispatch!(self, adapter => adapter.list_tables().await)
    }

    async fn describe_columns(&mut self, table_name: &str) -> DbResult<Vec<RawColumn>> {
        dispatch!(self, adapter => adapter.describe_columns(table_name).await)
    }

    async fn primary_key_columns(&mut self, table_name: &str) -> DbResult<Option<Vec<String>>> {
        dispatch!(self, adapter => adapter.primary_key_columns(table_name).await)
    }
}
