//! Row decoding into JSON maps.

use crate::db::macros::impl_row_to_json;
use crate::models::{ColumnMetadata, QueryResult};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use std::time::Instant;

/// Coarse grouping of driver type names, used to pick a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Boolean,
    Binary,
    Json,
    Text,
    Other,
}

/// Group a driver type name ("INT8", "BIGINT UNSIGNED", "TEXT", "BLOB", ...).
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_ascii_lowercase();
    if lower.contains("bool") {
        TypeCategory::Boolean
    } else if lower.contains("int") && !lower.contains("interval") && !lower.contains("point") {
        TypeCategory::Integer
    } else if lower.contains("float") || lower.contains("double") || lower == "real" {
        TypeCategory::Float
    } else if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        TypeCategory::Binary
    } else if lower.contains("json") {
        TypeCategory::Json
    } else if lower.contains("char") || lower.contains("text") || lower == "name" {
        TypeCategory::Text
    } else {
        TypeCategory::Other
    }
}

/// Binary columns are returned base64 encoded.
pub fn encode_binary(bytes: &[u8]) -> JsonValue {
    JsonValue::String(STANDARD.encode(bytes))
}

/// Conversion of a backend row into a JSON object keyed by column name.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
    fn column_metadata(&self) -> Vec<ColumnMetadata>;
}

impl_row_to_json!(MySqlRow, ints: [i64, u64, i32], floats: [f64, f32]);
impl_row_to_json!(PgRow, ints: [i64, i32, i16], floats: [f64, f32]);
impl_row_to_json!(SqliteRow, ints: [i64], floats: [f64]);

/// Build a [`QueryResult`] from fetched rows.
pub(crate) fn rows_to_result<R: RowToJson>(rows: &[R], start: Instant) -> QueryResult {
    QueryResult {
        columns: rows.first().map(R::column_metadata).unwrap_or_default(),
        rows: rows.iter().map(R::to_json_map).collect(),
        execution_time_ms: start.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type() {
        assert_eq!(categorize_type("INT8"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT UNSIGNED"), TypeCategory::Integer);
        assert_eq!(categorize_type("INTEGER"), TypeCategory::Integer);
        assert_eq!(categorize_type("INTERVAL"), TypeCategory::Other);
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Boolean);
        assert_eq!(categorize_type("FLOAT8"), TypeCategory::Float);
        assert_eq!(categorize_type("REAL"), TypeCategory::Float);
        assert_eq!(categorize_type("BYTEA"), TypeCategory::Binary);
        assert_eq!(categorize_type("JSONB"), TypeCategory::Json);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Other);
    }

    #[test]
    fn test_encode_binary() {
        assert_eq!(encode_binary(b"hi"), JsonValue::String("aGk=".to_string()));
    }
}
