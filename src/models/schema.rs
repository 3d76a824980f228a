//! Schema-related data models.
//!
//! This module defines types for table listing and description.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of catalog object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    View,
}

impl TableKind {
    /// Parse the kind from an engine catalog string.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "view" => Self::View,
            // "table", "base table", and anything else the catalog reports
            _ => Self::Table,
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::View => write!(f, "view"),
        }
    }
}

/// One entry of `list_tables`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableEntry {
    pub name: String,
    pub kind: TableKind,
}

impl TableEntry {
    pub fn new(name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Column metadata in the engine's own shape, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawColumn {
    /// `pragma_table_info` row: integer flags for NOT NULL and primary-key position.
    Pragma {
        name: String,
        declared_type: String,
        not_null: i64,
        default_value: Option<String>,
        /// 0 when not part of the key, otherwise 1-based position in it
        pk: i64,
    },
    /// `information_schema.columns` row: nullability as a 'YES'/'NO' string,
    /// primary key membership looked up separately.
    InformationSchema {
        name: String,
        data_type: String,
        is_nullable: String,
        default_value: Option<String>,
    },
}

impl RawColumn {
    pub fn name(&self) -> &str {
        match self {
            Self::Pragma { name, .. } | Self::InformationSchema { name, .. } => name,
        }
    }
}

/// Normalized column description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Type as declared or reported by the engine (e.g., "INTEGER", "text")
    pub declared_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            nullable,
            is_primary_key: false,
            default_value: None,
        }
    }

    /// Mark this column as part of the primary key.
    pub fn with_primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    /// Set the default value expression.
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

/// Full description of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub row_count: u64,
}

impl TableDescriptor {
    /// Names of the primary-key columns, in column order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}
