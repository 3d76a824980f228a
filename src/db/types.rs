//! Row to JSON value mapping.
//!
//! # Architecture
//!
//! Decoding uses a two-phase approach:
//! 1. `TypeCategory` classifies a column into a logical category
//! 2. Engine-specific decoders handle the actual value extraction
//!
//! SQLite is dynamically typed, so its rows are categorized by the storage
//! class of each value. PostgreSQL rows are categorized by the column's
//! reported type name.

use serde_json::Value as JsonValue;

/// Logical category for column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Null,
    Unknown,
}

/// Classify a SQLite storage class (`INTEGER`, `REAL`, `TEXT`, `BLOB`, `NULL`).
pub fn categorize_sqlite(storage_class: &str) -> TypeCategory {
    match storage_class.to_uppercase().as_str() {
        "NULL" => TypeCategory::Null,
        "INTEGER" | "INT" | "INT64" | "BOOLEAN" => TypeCategory::Integer,
        "REAL" | "NUMERIC" | "FLOAT" | "DOUBLE" => TypeCategory::Float,
        "BLOB" => TypeCategory::Binary,
        "TEXT" => TypeCategory::Text,
        _ => TypeCategory::Unknown,
    }
}

/// Classify a PostgreSQL type name as reported by the wire protocol.
pub fn categorize_postgres(type_name: &str) -> TypeCategory {
    match type_name.to_lowercase().as_str() {
        "int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" => TypeCategory::Integer,
        "float4" | "float8" | "real" | "double precision" => TypeCategory::Float,
        "numeric" | "decimal" => TypeCategory::Decimal,
        "bool" | "boolean" => TypeCategory::Boolean,
        "json" | "jsonb" => TypeCategory::Json,
        "uuid" => TypeCategory::Uuid,
        "bytea" => TypeCategory::Binary,
        "timestamp" => TypeCategory::Timestamp,
        "timestamptz" => TypeCategory::TimestampTz,
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        "text" | "varchar" | "bpchar" | "char" | "name" | "citext" => TypeCategory::Text,
        _ => TypeCategory::Unknown,
    }
}

/// Encode binary data as a base64 JSON string.
pub fn encode_binary(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    JsonValue::String(STANDARD.encode(bytes))
}

/// Map a float to a JSON number, falling back to a string for NaN and infinities.
pub fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn column_names(&self) -> Vec<String>;
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Column, Row, TypeInfo, ValueRef};

    impl RowToJson for SqliteRow {
        fn column_names(&self) -> Vec<String> {
            self.columns().iter().map(|c| c.name().to_string()).collect()
        }

        fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
            self.columns()
                .iter()
                .enumerate()
                .map(|(idx, col)| {
                    let declared = col.type_info().name();
                    (col.name().to_string(), decode_column(self, idx, declared))
                })
                .collect()
        }
    }

    fn decode_column(row: &SqliteRow, idx: usize, declared: &str) -> JsonValue {
        let category = match row.try_get_raw(idx) {
            Ok(value) if value.is_null() => TypeCategory::Null,
            Ok(value) => categorize_sqlite(value.type_info().name()),
            Err(_) => TypeCategory::Unknown,
        };

        match category {
            TypeCategory::Null => JsonValue::Null,
            TypeCategory::Integer => row
                .try_get_unchecked::<Option<i64>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::Number(v.into()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Float => row
                .try_get_unchecked::<Option<f64>, _>(idx)
                .ok()
                .flatten()
                .map(float_value)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => row
                .try_get_unchecked::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| encode_binary(&v))
                .unwrap_or(JsonValue::Null),
            _ => decode_text(row, idx, declared),
        }
    }

    fn decode_text(row: &SqliteRow, idx: usize, declared: &str) -> JsonValue {
        match row.try_get_unchecked::<Option<String>, _>(idx) {
            Ok(Some(v)) => {
                // JSON columns are stored as TEXT
                if declared.to_lowercase().contains("json") {
                    if let Ok(json) = serde_json::from_str::<JsonValue>(&v) {
                        return json;
                    }
                }
                JsonValue::String(v)
            }
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::debug!(column = idx, error = %e, "Undecodable SQLite value");
                JsonValue::Null
            }
        }
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use rust_decimal::Decimal;
    use sqlx::postgres::PgRow;
    use sqlx::types::Uuid;
    use sqlx::{Column, Row, TypeInfo};

    impl RowToJson for PgRow {
        fn column_names(&self) -> Vec<String> {
            self.columns().iter().map(|c| c.name().to_string()).collect()
        }

        fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
            self.columns()
                .iter()
                .enumerate()
                .map(|(idx, col)| {
                    let type_name = col.type_info().name();
                    let category = categorize_postgres(type_name);
                    (
                        col.name().to_string(),
                        decode_column(self, idx, type_name, category),
                    )
                })
                .collect()
        }
    }

    /// Decode `Option<T>` and map it, logging undecodable values.
    fn decode_with<'r, T, F>(row: &'r PgRow, idx: usize, type_name: &str, map: F) -> JsonValue
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
        F: FnOnce(T) -> JsonValue,
    {
        match row.try_get::<Option<T>, _>(idx) {
            Ok(Some(v)) => map(v),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::debug!(column = idx, type_name, error = %e, "Undecodable PostgreSQL value");
                JsonValue::Null
            }
        }
    }

    fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> JsonValue {
        match category {
            TypeCategory::Integer => match type_name.to_lowercase().as_str() {
                "int2" | "smallint" => {
                    decode_with::<i16, _>(row, idx, type_name, |v| JsonValue::Number(v.into()))
                }
                "int4" | "integer" => {
                    decode_with::<i32, _>(row, idx, type_name, |v| JsonValue::Number(v.into()))
                }
                _ => decode_with::<i64, _>(row, idx, type_name, |v| JsonValue::Number(v.into())),
            },
            TypeCategory::Float => match type_name.to_lowercase().as_str() {
                "float4" | "real" => {
                    decode_with::<f32, _>(row, idx, type_name, |v| float_value(v as f64))
                }
                _ => decode_with::<f64, _>(row, idx, type_name, float_value),
            },
            TypeCategory::Decimal => decode_with::<Decimal, _>(row, idx, type_name, |v| {
                JsonValue::String(v.to_string())
            }),
            TypeCategory::Boolean => decode_with::<bool, _>(row, idx, type_name, JsonValue::Bool),
            TypeCategory::Json => decode_with::<JsonValue, _>(row, idx, type_name, |v| v),
            TypeCategory::Uuid => {
                decode_with::<Uuid, _>(row, idx, type_name, |v| JsonValue::String(v.to_string()))
            }
            TypeCategory::Binary => {
                decode_with::<Vec<u8>, _>(row, idx, type_name, |v| encode_binary(&v))
            }
            TypeCategory::TimestampTz => {
                decode_with::<DateTime<Utc>, _>(row, idx, type_name, |v| {
                    JsonValue::String(v.to_rfc3339())
                })
            }
            TypeCategory::Timestamp => decode_with::<NaiveDateTime, _>(row, idx, type_name, |v| {
                JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }),
            TypeCategory::Date => decode_with::<NaiveDate, _>(row, idx, type_name, |v| {
                JsonValue::String(v.to_string())
            }),
            TypeCategory::Time => decode_with::<NaiveTime, _>(row, idx, type_name, |v| {
                JsonValue::String(v.to_string())
            }),
            _ => decode_with::<String, _>(row, idx, type_name, JsonValue::String),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_sqlite_storage_classes() {
        assert_eq!(categorize_sqlite("INTEGER"), TypeCategory::Integer);
        assert_eq!(categorize_sqlite("REAL"), TypeCategory::Float);
        assert_eq!(categorize_sqlite("TEXT"), TypeCategory::Text);
        assert_eq!(categorize_sqlite("BLOB"), TypeCategory::Binary);
        assert_eq!(categorize_sqlite("NULL"), TypeCategory::Null);
    }

    #[test]
    fn test_categorize_postgres() {
        assert_eq!(categorize_postgres("INT8"), TypeCategory::Integer);
        assert_eq!(categorize_postgres("FLOAT8"), TypeCategory::Float);
        assert_eq!(categorize_postgres("NUMERIC"), TypeCategory::Decimal);
        assert_eq!(categorize_postgres("JSONB"), TypeCategory::Json);
        assert_eq!(categorize_postgres("TIMESTAMPTZ"), TypeCategory::TimestampTz);
        assert_eq!(categorize_postgres("VARCHAR"), TypeCategory::Text);
    }

    #[test]
    fn test_interval_is_not_an_integer() {
        assert_eq!(categorize_postgres("INTERVAL"), TypeCategory::Unknown);
    }

    #[test]
    fn test_encode_binary() {
        assert_eq!(
            encode_binary(b"hello world"),
            JsonValue::String("aGVsbG8gd29ybGQ=".to_string())
        );
        assert_eq!(
            encode_binary(&[0xFF, 0xFE, 0x00, 0x01]),
            JsonValue::String("//4AAQ==".to_string())
        );
        assert_eq!(encode_binary(&[]), JsonValue::String(String::new()));
    }

    #[test]
    fn test_float_value_non_finite() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), JsonValue::String("NaN".to_string()));
        assert_eq!(
            float_value(f64::INFINITY),
            JsonValue::String("inf".to_string())
        );
    }
}
