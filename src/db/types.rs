//! Database-agnostic row decoding.
//!
//! Every driver row is turned into an ordered JSON object keyed by column
//! name, which the marshaler then deserializes into the caller's type.
//!
//! # Architecture
//!
//! Decoding uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! A value that cannot be decoded is a scan error, never a silent NULL.

use crate::error::{SqlError, SqlResult};
use crate::models::DatabaseType;
use serde_json::Value as JsonValue;
use serde_json::map::Entry;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

/// A decoded row: column name to value, in select-list order.
///
/// Column names are unique within a row; a result set that repeats a name
/// fails to decode with a scan error.
pub type JsonRow = serde_json::Map<String, JsonValue>;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
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
    /// Timestamp with time zone
    Timestamp,
    /// Timestamp without time zone
    DateTime,
    Date,
    Time,
    /// PostgreSQL INTERVAL
    Interval,
    Unknown,
}

const INTEGER_TYPES: &[&str] = &[
    "int", "int2", "int4", "int8", "integer", "smallint", "bigint", "tinyint", "mediumint",
    "serial", "serial2", "serial4", "serial8", "smallserial", "bigserial",
];

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    // Text types, before integers so TINYTEXT is not taken for TINYINT
    if lower.contains("char") || lower.contains("text") {
        return TypeCategory::Text;
    }

    // Integer types, matched by name so INTERVAL and POINT stay out
    if INTEGER_TYPES.contains(&lower.trim_end_matches(" unsigned")) {
        return TypeCategory::Integer;
    }

    // Boolean
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    // Float types
    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    // JSON types
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    // UUID (PostgreSQL)
    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    // Binary types
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    // Date/Time. MySQL TIMESTAMP is stored as UTC, PostgreSQL TIMESTAMP is naive.
    match lower.as_str() {
        "timestamptz" => return TypeCategory::Timestamp,
        "timestamp" if db == DatabaseType::MySQL => return TypeCategory::Timestamp,
        "timestamp" | "datetime" => return TypeCategory::DateTime,
        "date" => return TypeCategory::Date,
        "time" => return TypeCategory::Time,
        "interval" => return TypeCategory::Interval,
        _ => {}
    }

    if lower == "name" || lower == "enum" {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw MySQL DECIMAL values as strings.
///
/// MySQL sends DECIMAL as text in both protocols, so the exact database
/// representation is preserved.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Value Helpers
// =============================================================================

/// Encode binary data as a base64 JSON string.
pub fn encode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    JsonValue::String(STANDARD.encode(bytes))
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn decode_error(column: &str, type_name: &str, err: impl std::fmt::Display) -> SqlError {
    SqlError::scan(format!(
        "Failed to decode column '{}' ({}): {}",
        column, type_name, err
    ))
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON objects.
pub trait RowToJson {
    fn to_json_map(&self) -> SqlResult<JsonRow>;
}

/// Gather decoded columns into a row, rejecting repeated column names.
fn collect_row<I>(columns: I) -> SqlResult<JsonRow>
where
    I: IntoIterator<Item = SqlResult<(String, JsonValue)>>,
{
    let mut row = JsonRow::new();
    for column in columns {
        let (name, value) = column?;
        match row.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(slot) => {
                return Err(SqlError::scan(format!(
                    "Duplicate column name '{}', alias it to scan the row",
                    slot.key()
                )));
            }
        }
    }
    Ok(row)
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> SqlResult<JsonRow> {
        let columns = self
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| -> SqlResult<(String, JsonValue)> {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::MySQL);
                let value = mysql::decode_column(self, idx, category)
                    .map_err(|e| decode_error(col.name(), type_name, e))?;
                Ok((col.name().to_string(), value))
            });
        collect_row(columns)
    }
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> SqlResult<JsonRow> {
        let columns = self
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| -> SqlResult<(String, JsonValue)> {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::PostgreSQL);
                let value = postgres::decode_column(self, idx, type_name, category)
                    .map_err(|e| decode_error(col.name(), type_name, e))?;
                Ok((col.name().to_string(), value))
            });
        collect_row(columns)
    }
}

impl RowToJson for SqliteRow {
    fn to_json_map(&self) -> SqlResult<JsonRow> {
        let columns = self
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| -> SqlResult<(String, JsonValue)> {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::SQLite);
                let value = sqlite::decode_column(self, idx, category)
                    .map_err(|e| decode_error(col.name(), type_name, e))?;
                Ok((col.name().to_string(), value))
            });
        collect_row(columns)
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================
//
// Each module below decodes one column of its driver's row. Decoders return
// the raw sqlx error; the caller adds the column context.

type DecodeResult = Result<JsonValue, sqlx::Error>;

mod mysql {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> DecodeResult {
        if row.try_get_raw(idx)?.is_null() {
            return Ok(JsonValue::Null);
        }
        match category {
            TypeCategory::Decimal => Ok(JsonValue::String(row.try_get::<RawDecimal, _>(idx)?.0)),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => Ok(JsonValue::Bool(row.try_get::<bool, _>(idx)?)),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => Ok(encode_binary_value(&row.try_get::<Vec<u8>, _>(idx)?)),
            TypeCategory::Json => row.try_get::<JsonValue, _>(idx),
            TypeCategory::Timestamp => temporal(row.try_get::<DateTime<Utc>, _>(idx)?),
            TypeCategory::DateTime => temporal(row.try_get::<NaiveDateTime, _>(idx)?),
            TypeCategory::Date => temporal(row.try_get::<NaiveDate, _>(idx)?),
            TypeCategory::Time => temporal(row.try_get::<NaiveTime, _>(idx)?),
            _ => Ok(JsonValue::String(row.try_get::<String, _>(idx)?)),
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> DecodeResult {
        // Try signed types, then unsigned
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Ok(JsonValue::Number(v.into()));
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Ok(JsonValue::Number(v.into()));
        }
        if let Ok(v) = row.try_get::<i16, _>(idx) {
            return Ok(JsonValue::Number(v.into()));
        }
        if let Ok(v) = row.try_get::<i8, _>(idx) {
            return Ok(JsonValue::Number(v.into()));
        }
        row.try_get::<u64, _>(idx).map(|v| JsonValue::Number(v.into()))
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> DecodeResult {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Ok(float_value(v));
        }
        row.try_get::<f32, _>(idx).map(|v| float_value(v.into()))
    }

    fn temporal<T: serde::Serialize>(value: T) -> DecodeResult {
        serde_json::to_value(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }
}

mod postgres {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use rust_decimal::Decimal;
    use sqlx::postgres::types::PgInterval;
    use uuid::Uuid;

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> DecodeResult {
        if row.try_get_raw(idx)?.is_null() {
            return Ok(JsonValue::Null);
        }
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => Ok(JsonValue::Bool(row.try_get::<bool, _>(idx)?)),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => Ok(encode_binary_value(&row.try_get::<Vec<u8>, _>(idx)?)),
            TypeCategory::Json => row.try_get::<JsonValue, _>(idx),
            TypeCategory::Uuid => Ok(JsonValue::String(
                row.try_get::<Uuid, _>(idx)?.to_string(),
            )),
            TypeCategory::Timestamp => temporal(row.try_get::<DateTime<Utc>, _>(idx)?),
            TypeCategory::DateTime => temporal(row.try_get::<NaiveDateTime, _>(idx)?),
            TypeCategory::Date => temporal(row.try_get::<NaiveDate, _>(idx)?),
            TypeCategory::Time => temporal(row.try_get::<NaiveTime, _>(idx)?),
            TypeCategory::Decimal => Ok(JsonValue::String(
                row.try_get::<Decimal, _>(idx)?.to_string(),
            )),
            TypeCategory::Interval => {
                let interval = row.try_get::<PgInterval, _>(idx)?;
                Ok(serde_json::json!({
                    "months": interval.months,
                    "days": interval.days,
                    "microseconds": interval.microseconds,
                }))
            }
            _ => row.try_get::<String, _>(idx).map(JsonValue::String).map_err(|e| {
                sqlx::Error::Decode(format!("{} is not decodable as text: {}", type_name, e).into())
            }),
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> DecodeResult {
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Ok(JsonValue::Number(v.into()));
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Ok(JsonValue::Number(v.into()));
        }
        row.try_get::<i16, _>(idx).map(|v| JsonValue::Number(v.into()))
    }

    fn decode_float(row: &PgRow, idx: usize) -> DecodeResult {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Ok(float_value(v));
        }
        row.try_get::<f32, _>(idx).map(|v| float_value(v.into()))
    }

    fn temporal<T: serde::Serialize>(value: T) -> DecodeResult {
        serde_json::to_value(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }
}

mod sqlite {
    use super::*;

    /// SQLite is dynamically typed: decode by the storage class of the value,
    /// using the declared type only to recover booleans and JSON.
    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> DecodeResult {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(JsonValue::Null);
        }
        let storage = raw.type_info().name().to_string();

        match storage.as_str() {
            "INTEGER" | "BOOLEAN" => {
                let v = row.try_get_unchecked::<i64, _>(idx)?;
                if category == TypeCategory::Boolean {
                    Ok(JsonValue::Bool(v != 0))
                } else {
                    Ok(JsonValue::Number(v.into()))
                }
            }
            "REAL" => Ok(float_value(row.try_get_unchecked::<f64, _>(idx)?)),
            "BLOB" => Ok(encode_binary_value(
                &row.try_get_unchecked::<Vec<u8>, _>(idx)?,
            )),
            _ => {
                let v = row.try_get_unchecked::<String, _>(idx)?;
                if category == TypeCategory::Json {
                    if let Ok(json) = serde_json::from_str::<JsonValue>(&v) {
                        return Ok(json);
                    }
                }
                Ok(JsonValue::String(v))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(
            categorize_type("INT", DatabaseType::MySQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("BIGINT", DatabaseType::PostgreSQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("TINYINT", DatabaseType::MySQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("SERIAL", DatabaseType::PostgreSQL),
            TypeCategory::Integer
        );
    }

    #[test]
    fn test_categorize_type_decimal() {
        assert_eq!(
            categorize_type("DECIMAL", DatabaseType::MySQL),
            TypeCategory::Decimal
        );
        assert_eq!(
            categorize_type("NUMERIC", DatabaseType::PostgreSQL),
            TypeCategory::Decimal
        );
        // SQLite NUMERIC is a float
        assert_eq!(
            categorize_type("numeric", DatabaseType::SQLite),
            TypeCategory::Float
        );
    }

    #[test]
    fn test_categorize_type_json() {
        assert_eq!(
            categorize_type("json", DatabaseType::PostgreSQL),
            TypeCategory::Json
        );
        assert_eq!(
            categorize_type("jsonb", DatabaseType::PostgreSQL),
            TypeCategory::Json
        );
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(
            categorize_type("TIMESTAMP", DatabaseType::MySQL),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("TIMESTAMP", DatabaseType::PostgreSQL),
            TypeCategory::DateTime
        );
        assert_eq!(
            categorize_type("TIMESTAMPTZ", DatabaseType::PostgreSQL),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("DATETIME", DatabaseType::MySQL),
            TypeCategory::DateTime
        );
        assert_eq!(
            categorize_type("DATE", DatabaseType::MySQL),
            TypeCategory::Date
        );
    }

    #[test]
    fn test_categorize_type_text_and_unknown() {
        assert_eq!(
            categorize_type("VARCHAR", DatabaseType::MySQL),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("TINYTEXT", DatabaseType::MySQL),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("INET", DatabaseType::PostgreSQL),
            TypeCategory::Unknown
        );
    }

    #[test]
    fn test_encode_binary_value() {
        assert_eq!(
            encode_binary_value(b"hello world"),
            JsonValue::String("aGVsbG8gd29ybGQ=".to_string())
        );
        assert_eq!(
            encode_binary_value(&[0xFF, 0xFE, 0x00, 0x01]),
            JsonValue::String("//4AAQ==".to_string())
        );
        assert_eq!(encode_binary_value(&[]), JsonValue::String(String::new()));
    }

    #[test]
    fn test_categorize_type_keeps_interval_and_point_out_of_integers() {
        assert_eq!(
            categorize_type("INTERVAL", DatabaseType::PostgreSQL),
            TypeCategory::Interval
        );
        assert_eq!(
            categorize_type("POINT", DatabaseType::PostgreSQL),
            TypeCategory::Unknown
        );
        assert_eq!(
            categorize_type("INT UNSIGNED", DatabaseType::MySQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("INT8", DatabaseType::PostgreSQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("TINYBLOB", DatabaseType::MySQL),
            TypeCategory::Binary
        );
    }

    #[test]
    fn test_categorize_type_uuid() {
        assert_eq!(
            categorize_type("UUID", DatabaseType::PostgreSQL),
            TypeCategory::Uuid
        );
    }

    #[test]
    fn test_collect_row_rejects_duplicate_names() {
        let row = collect_row(vec![
            Ok(("id".to_string(), serde_json::json!(1))),
            Ok(("name".to_string(), serde_json::json!("a"))),
        ])
        .unwrap();
        assert_eq!(row.len(), 2);

        let err = collect_row(vec![
            Ok(("id".to_string(), serde_json::json!(1))),
            Ok(("id".to_string(), serde_json::json!(2))),
        ])
        .unwrap_err();
        assert!(err.is_scan_error());
        assert!(err.to_string().contains("Duplicate column name 'id'"));
    }

    #[test]
    fn test_float_value_non_finite_falls_back_to_string() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), JsonValue::String("NaN".to_string()));
    }
}
