//! Engine and policy configuration models.
//!
//! This module defines the immutable configuration value that the connection
//! manager is built from.

use crate::config::PoolOptions;
use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Supported database engines.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Embedded file database; a fresh connection is opened for every call.
    #[value(name = "sqlite")]
    Sqlite,
    /// Client-server database accessed through a shared pool.
    #[serde(rename = "postgresql")]
    #[value(name = "postgresql", alias = "postgres")]
    Postgres,
}

impl EngineKind {
    /// Get the display name for this engine.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::Postgres => "PostgreSQL",
        }
    }

    /// Cargo feature that compiles this engine's client in.
    pub fn feature_name(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    /// Placeholder syntax for positional parameters, as shown to tool callers.
    pub fn placeholder_hint(&self) -> &'static str {
        match self {
            Self::Sqlite => "? (or ?1, ?2, ...)",
            Self::Postgres => "$1, $2, ...",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Read-only flag and row ceiling governing every call.
///
/// Copied out of the connection manager once, when a call passes the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Policy {
    pub read_only: bool,
    pub max_rows: u32,
}

impl Policy {
    pub fn new(read_only: bool, max_rows: u32) -> Self {
        Self {
            read_only,
            max_rows,
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(true, crate::config::DEFAULT_MAX_ROWS)
    }
}

/// Everything the connection manager needs, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub engine: EngineKind,
    /// File path, `sqlite:` URL or network DSN. Contains secrets - never log unmasked.
    #[serde(skip_serializing)]
    pub connection_target: String,
    pub policy: Policy,
    #[serde(default)]
    pub pool_options: PoolOptions,
}

impl EngineConfig {
    /// Create a configuration with default pool options.
    pub fn new(engine: EngineKind, connection_target: impl Into<String>, policy: Policy) -> Self {
        Self {
            engine,
            connection_target: connection_target.into(),
            policy,
            pool_options: PoolOptions::default(),
        }
    }

    /// Replace the pool options.
    pub fn with_pool_options(mut self, pool_options: PoolOptions) -> Self {
        self.pool_options = pool_options;
        self
    }

    /// Get a display-safe version of the connection target (password masked).
    pub fn masked_target(&self) -> String {
        match Url::parse(&self.connection_target) {
            Ok(mut url) if url.password().is_some() => {
                // set_password only fails for cannot-be-a-base URLs, which carry no password
                let _ = url.set_password(Some("****"));
                url.to_string()
            }
            _ => self.connection_target.clone(),
        }
    }
}
