//! Result coercion.
//!
//! Bounds row sets to the configured ceiling and folds the two engines'
//! column metadata into one [`ColumnDescriptor`] shape.

use crate::models::{ColumnDescriptor, QueryResult, RawColumn, RawRows};
use tracing::warn;

/// Number of rows to request from the engine for a given ceiling.
///
/// One extra row tells us whether the engine had more than the ceiling.
pub fn fetch_limit(ceiling: u32) -> usize {
    (ceiling as usize).saturating_add(1)
}

/// Cut `raw` down to `ceiling` rows, flagging whether anything was dropped.
pub fn truncate(raw: RawRows, ceiling: u32) -> QueryResult {
    let RawRows { columns, mut rows } = raw;
    let limit = ceiling as usize;
    let total_rows = rows.len();
    let truncated = total_rows > limit;

    if truncated {
        rows.truncate(limit);
        warn!(
            total_rows = total_rows,
            limit = ceiling,
            "Query result truncated"
        );
    }

    QueryResult {
        columns,
        rows,
        truncated,
    }
}

/// Normalize engine column metadata.
///
/// `primary_key` is the separately looked-up key for engines whose column
/// metadata lacks the flag; `None` means each [`RawColumn`] carries it.
pub fn normalize_columns(
    raw: Vec<RawColumn>,
    primary_key: Option<&[String]>,
) -> Vec<ColumnDescriptor> {
    raw.into_iter()
        .map(|column| {
            let in_lookup = primary_key
                .map(|keys| keys.iter().any(|k| k == column.name()))
                .unwrap_or(false);
            normalize_column(column, in_lookup)
        })
        .collect()
}

fn normalize_column(raw: RawColumn, in_pk_lookup: bool) -> ColumnDescriptor {
    let (descriptor, is_pk, default_value) = match raw {
        RawColumn::Pragma {
            name,
            declared_type,
            not_null,
            default_value,
            pk,
        } => (
            ColumnDescriptor::new(name, declared_type, not_null == 0),
            pk > 0 || in_pk_lookup,
            default_value,
        ),
        RawColumn::InformationSchema {
            name,
            data_type,
            is_nullable,
            default_value,
        } => (
            ColumnDescriptor::new(
                name,
                data_type,
                is_nullable.trim().eq_ignore_ascii_case("YES"),
            ),
            in_pk_lookup,
            default_value,
        ),
    };

    let descriptor = match default_value {
        Some(default_value) => descriptor.with_default(default_value),
        None => descriptor,
    };
    if is_pk {
        descriptor.with_primary_key()
    } else {
        descriptor
    }
}
