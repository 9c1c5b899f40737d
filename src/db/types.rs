//! Decoding of sqlx rows into [`SqlValue`]s.
//!
//! # Architecture
//!
//! PostgreSQL and MySQL rows are decoded in two phases:
//! 1. `TypeCategory` classifies the column's declared type into a logical category
//! 2. Database-specific decoders extract the value for that category
//!
//! SQLite columns have no fixed type, so its decoder looks at the storage class
//! of each value instead.

use crate::models::{DatabaseType, SqlValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::error::BoxDynError;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

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
    Temporal,
    /// PostgreSQL INTERVAL, rendered as an ISO 8601 duration.
    Interval,
    Unknown,
}

/// Integer type names, with any MySQL `UNSIGNED` suffix removed.
const INTEGER_TYPES: &[&str] = &[
    "int",
    "int2",
    "int4",
    "int8",
    "integer",
    "tinyint",
    "smallint",
    "mediumint",
    "bigint",
    "serial",
    "serial2",
    "serial4",
    "serial8",
    "smallserial",
    "bigserial",
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

    // Dates and times
    if lower == "date"
        || lower.starts_with("time")
        || lower.starts_with("datetime")
        || lower.starts_with("timestamp")
    {
        return TypeCategory::Temporal;
    }

    if lower == "interval" {
        return TypeCategory::Interval;
    }

    // Integer types. Matched by name, since "int" also occurs in INTERVAL and POINT
    let base = lower.strip_suffix(" unsigned").unwrap_or(&lower);
    if INTEGER_TYPES.contains(&base) {
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

    if lower.contains("char") || lower.contains("text") || lower == "name" || lower == "enum" {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
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
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("NUMERIC")
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        match value.format() {
            PgValueFormat::Text => Ok(RawDecimal(value.as_str()?.to_string())),
            PgValueFormat::Binary => pg_numeric_to_string(value.as_bytes()?).map(RawDecimal),
        }
    }
}

const PG_NUMERIC_NEG: u16 = 0x4000;
const PG_NUMERIC_NAN: u16 = 0xC000;
const PG_NUMERIC_PINF: u16 = 0xD000;
const PG_NUMERIC_NINF: u16 = 0xF000;

/// Render the binary wire form of a PostgreSQL NUMERIC as decimal text.
///
/// The value is a header of four big-endian 16-bit fields (digit count,
/// weight of the first digit, sign, display scale) followed by base-10000
/// digits.
fn pg_numeric_to_string(buf: &[u8]) -> Result<String, BoxDynError> {
    use std::fmt::Write as _;

    let read = |i: usize| -> Result<u16, BoxDynError> {
        buf.get(2 * i..2 * i + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or_else(|| "truncated NUMERIC value".into())
    };

    let ndigits = usize::from(read(0)?);
    let weight = i64::from(read(1)? as i16);
    let sign = read(2)?;
    let dscale = usize::from(read(3)?);

    match sign {
        PG_NUMERIC_NAN => return Ok("NaN".to_string()),
        PG_NUMERIC_PINF => return Ok("Infinity".to_string()),
        PG_NUMERIC_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }

    let digits = (0..ndigits)
        .map(|i| read(4 + i))
        .collect::<Result<Vec<u16>, _>>()?;
    // Digit i has weight `weight - i`; missing positions are zero.
    let digit = |i: i64| -> u16 {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == PG_NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        for i in 0..=weight {
            if i == 0 {
                write!(out, "{}", digit(i))?;
            } else {
                write!(out, "{:04}", digit(i))?;
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut i = weight + 1;
        while fraction.len() < dscale {
            write!(fraction, "{:04}", digit(i))?;
            i += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }
    Ok(out)
}

// =============================================================================
// Row Decoding Trait
// =============================================================================

/// Decode every column of a row, in column order.
pub trait DecodeRow {
    fn decode_values(&self) -> Result<Vec<SqlValue>, sqlx::Error>;
}

impl DecodeRow for MySqlRow {
    fn decode_values(&self) -> Result<Vec<SqlValue>, sqlx::Error> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name(), DatabaseType::MySQL);
                mysql::decode_column(self, idx, category)
            })
            .collect()
    }
}

impl DecodeRow for PgRow {
    fn decode_values(&self) -> Result<Vec<SqlValue>, sqlx::Error> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name(), DatabaseType::PostgreSQL);
                postgres::decode_column(self, idx, category)
            })
            .collect()
    }
}

impl DecodeRow for SqliteRow {
    fn decode_values(&self) -> Result<Vec<SqlValue>, sqlx::Error> {
        (0..self.columns().len())
            .map(|idx| sqlite::decode_column(self, idx))
            .collect()
    }
}

/// Format an interval as an ISO 8601 duration such as `P1Y2M3DT4H5M6.5S`.
fn interval_text(months: i32, days: i32, microseconds: i64) -> String {
    let mut out = String::from("P");
    let (years, months) = (months / 12, months % 12);
    for (value, unit) in [(years as i64, 'Y'), (months as i64, 'M'), (days as i64, 'D')] {
        if value != 0 {
            out.push_str(&format!("{value}{unit}"));
        }
    }

    let hours = microseconds / 3_600_000_000;
    let minutes = microseconds % 3_600_000_000 / 60_000_000;
    let micros = microseconds % 60_000_000;
    if hours != 0 || minutes != 0 || micros != 0 || out.len() == 1 {
        out.push('T');
        if hours != 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes != 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if micros != 0 || out.ends_with('T') {
            let sign = if micros < 0 { "-" } else { "" };
            let (whole, fraction) = (micros.abs() / 1_000_000, micros.abs() % 1_000_000);
            if fraction == 0 {
                out.push_str(&format!("{sign}{whole}S"));
            } else {
                let fraction = format!("{fraction:06}");
                out.push_str(&format!("{sign}{whole}.{}S", fraction.trim_end_matches('0')));
            }
        }
    }
    out
}

fn temporal_text<R>(row: &R, idx: usize) -> Result<SqlValue, sqlx::Error>
where
    R: Row,
    usize: sqlx::ColumnIndex<R>,
    for<'r> DateTime<Utc>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDate: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveTime: Decode<'r, R::Database> + Type<R::Database>,
{
    if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
        return Ok(SqlValue::String(v.to_rfc3339()));
    }
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
        return Ok(SqlValue::String(v.to_string()));
    }
    if let Ok(v) = row.try_get::<NaiveDate, _>(idx) {
        return Ok(SqlValue::String(v.to_string()));
    }
    row.try_get::<NaiveTime, _>(idx)
        .map(|v| SqlValue::String(v.to_string()))
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        category: TypeCategory,
    ) -> Result<SqlValue, sqlx::Error> {
        if row.try_get_raw(idx)?.is_null() {
            return Ok(SqlValue::Null);
        }
        match category {
            TypeCategory::Decimal => row
                .try_get::<RawDecimal, _>(idx)
                .map(|v| SqlValue::String(v.0)),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).map(SqlValue::Bool),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => row.try_get::<Vec<u8>, _>(idx).map(SqlValue::Bytes),
            // MySQL JSON type should be decoded as serde_json::Value directly
            TypeCategory::Json => row.try_get::<JsonValue, _>(idx).map(SqlValue::Json),
            TypeCategory::Temporal => temporal_text(row, idx),
            TypeCategory::Text | TypeCategory::Uuid => {
                row.try_get::<String, _>(idx).map(SqlValue::String)
            }
            TypeCategory::Interval | TypeCategory::Unknown => decode_fallback(row, idx),
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Ok(SqlValue::Int(v));
        }
        // Unsigned BIGINT beyond i64 is kept exact as text
        row.try_get::<u64, _>(idx).map(|v| {
            i64::try_from(v).map_or_else(|_| SqlValue::String(v.to_string()), SqlValue::Int)
        })
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Ok(SqlValue::Float(v));
        }
        row.try_get::<f32, _>(idx).map(|v| SqlValue::Float(v.into()))
    }

    fn decode_fallback(row: &MySqlRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        if let Ok(v) = row.try_get::<String, _>(idx) {
            return Ok(SqlValue::String(v));
        }
        row.try_get::<Vec<u8>, _>(idx).map(SqlValue::Bytes)
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        category: TypeCategory,
    ) -> Result<SqlValue, sqlx::Error> {
        if row.try_get_raw(idx)?.is_null() {
            return Ok(SqlValue::Null);
        }
        match category {
            TypeCategory::Decimal => row
                .try_get::<RawDecimal, _>(idx)
                .map(|v| SqlValue::String(v.0)),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).map(SqlValue::Bool),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => row.try_get::<Vec<u8>, _>(idx).map(SqlValue::Bytes),
            TypeCategory::Json => row.try_get::<JsonValue, _>(idx).map(SqlValue::Json),
            TypeCategory::Uuid => row
                .try_get::<uuid::Uuid, _>(idx)
                .map(|v| SqlValue::String(v.to_string())),
            TypeCategory::Temporal => temporal_text(row, idx),
            TypeCategory::Interval => row
                .try_get::<PgInterval, _>(idx)
                .map(|v| SqlValue::String(interval_text(v.months, v.days, v.microseconds))),
            TypeCategory::Text => row.try_get::<String, _>(idx).map(SqlValue::String),
            TypeCategory::Unknown => decode_fallback(row, idx),
        }
    }

    /// Types without a decoder (geometric, network, ranges) are read as text
    /// when the server sent text, and as raw bytes otherwise.
    fn decode_fallback(row: &PgRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        if let Ok(v) = row.try_get::<String, _>(idx) {
            return Ok(SqlValue::String(v));
        }
        match row.try_get_raw(idx)?.format() {
            PgValueFormat::Text => row
                .try_get_unchecked::<String, _>(idx)
                .map(SqlValue::String),
            PgValueFormat::Binary => row
                .try_get_unchecked::<Vec<u8>, _>(idx)
                .map(SqlValue::Bytes),
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Ok(SqlValue::Int(v));
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Ok(SqlValue::Int(v.into()));
        }
        row.try_get::<i16, _>(idx).map(|v| SqlValue::Int(v.into()))
    }

    fn decode_float(row: &PgRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Ok(SqlValue::Float(v));
        }
        row.try_get::<f32, _>(idx).map(|v| SqlValue::Float(v.into()))
    }
}

mod sqlite {
    use super::*;

    /// Decode by the value's storage class. Declared types are advisory in
    /// SQLite, so a column may hold different classes row to row.
    pub fn decode_column(row: &SqliteRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }
        let storage_class = raw.type_info().name().to_string();
        match storage_class.as_str() {
            "INTEGER" | "INT4" | "INT8" | "BIGINT" => {
                row.try_get_unchecked::<i64, _>(idx).map(SqlValue::Int)
            }
            "BOOLEAN" => row.try_get_unchecked::<bool, _>(idx).map(SqlValue::Bool),
            "REAL" | "NUMERIC" => row.try_get_unchecked::<f64, _>(idx).map(SqlValue::Float),
            "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(idx).map(SqlValue::Bytes),
            _ => row.try_get_unchecked::<String, _>(idx).map(SqlValue::String),
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
    fn test_categorize_type_names_containing_int() {
        assert_eq!(
            categorize_type("INTERVAL", DatabaseType::PostgreSQL),
            TypeCategory::Interval
        );
        assert_eq!(
            categorize_type("POINT", DatabaseType::PostgreSQL),
            TypeCategory::Unknown
        );
        assert_eq!(
            categorize_type("INT4RANGE", DatabaseType::PostgreSQL),
            TypeCategory::Unknown
        );
        assert_eq!(
            categorize_type("BIGINT UNSIGNED", DatabaseType::MySQL),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("INT2", DatabaseType::PostgreSQL),
            TypeCategory::Integer
        );
    }

    #[test]
    fn test_interval_text() {
        assert_eq!(interval_text(0, 0, 0), "PT0S");
        assert_eq!(interval_text(14, 3, 0), "P1Y2M3D");
        assert_eq!(
            interval_text(0, 1, 4 * 3_600_000_000 + 5 * 60_000_000 + 6_500_000),
            "P1DT4H5M6.5S"
        );
        assert_eq!(interval_text(0, 0, -1_500_000), "PT-1.5S");
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
    fn test_categorize_type_temporal_and_text() {
        assert_eq!(
            categorize_type("TIMESTAMPTZ", DatabaseType::PostgreSQL),
            TypeCategory::Temporal
        );
        assert_eq!(
            categorize_type("DATETIME", DatabaseType::MySQL),
            TypeCategory::Temporal
        );
        assert_eq!(
            categorize_type("DATE", DatabaseType::MySQL),
            TypeCategory::Temporal
        );
        assert_eq!(
            categorize_type("VARCHAR", DatabaseType::MySQL),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("jsonb", DatabaseType::PostgreSQL),
            TypeCategory::Json
        );
    }

    fn numeric(ndigits: u16, weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut buf = Vec::new();
        for field in [ndigits, weight as u16, sign, dscale] {
            buf.extend_from_slice(&field.to_be_bytes());
        }
        for d in digits {
            buf.extend_from_slice(&d.to_be_bytes());
        }
        buf
    }

    #[test]
    fn test_pg_numeric_binary() {
        assert_eq!(
            pg_numeric_to_string(&numeric(3, 1, 0, 3, &[1, 2345, 6780])).unwrap(),
            "12345.678"
        );
        assert_eq!(
            pg_numeric_to_string(&numeric(1, -1, 0, 1, &[5000])).unwrap(),
            "0.5"
        );
        assert_eq!(
            pg_numeric_to_string(&numeric(1, -2, PG_NUMERIC_NEG, 5, &[5000])).unwrap(),
            "-0.00005"
        );
        assert_eq!(
            pg_numeric_to_string(&numeric(1, 1, 0, 0, &[42])).unwrap(),
            "420000"
        );
        assert_eq!(pg_numeric_to_string(&numeric(0, 0, 0, 2, &[])).unwrap(), "0.00");
        assert_eq!(
            pg_numeric_to_string(&numeric(0, 0, PG_NUMERIC_NAN, 0, &[])).unwrap(),
            "NaN"
        );
    }

    #[test]
    fn test_pg_numeric_truncated() {
        assert!(pg_numeric_to_string(&[0, 1]).is_err());
        assert!(pg_numeric_to_string(&numeric(2, 0, 0, 0, &[1])).is_err());
    }
}
