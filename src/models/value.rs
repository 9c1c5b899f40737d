//! Untyped column and parameter values.

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A value read from or bound to a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// NULL value
    Null,
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    String(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
    Json(JsonValue),
}

impl SqlValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
        }
    }

    /// Parse a command-line literal: JSON scalars are taken as typed values,
    /// anything else is kept as a plain string.
    pub fn from_literal(literal: &str) -> Self {
        match serde_json::from_str::<JsonValue>(literal) {
            Ok(JsonValue::Null) => Self::Null,
            Ok(JsonValue::Bool(b)) => Self::Bool(b),
            Ok(JsonValue::Number(n)) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or_else(|| Self::String(literal.to_string()), Self::Float),
            },
            Ok(JsonValue::String(s)) => Self::String(s),
            Ok(json @ (JsonValue::Array(_) | JsonValue::Object(_))) => Self::Json(json),
            Err(_) => Self::String(literal.to_string()),
        }
    }

    /// Convert to a JSON value; bytes become base64 strings.
    pub fn to_json(&self) -> JsonValue {
        use base64::{Engine as _, engine::general_purpose::STANDARD};

        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(f.to_string())),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Bytes(b) => JsonValue::String(STANDARD.encode(b)),
            Self::Json(v) => v.clone(),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<JsonValue> for SqlValue {
    fn from(v: JsonValue) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Typed read of a [`SqlValue`].
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: SqlValue) -> DbResult<Self>;
}

fn mismatch(expected: &str, value: &SqlValue) -> DbError {
    DbError::extract(format!("cannot read {} value as {expected}", value.type_name()))
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        Ok(value)
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Int(i) => Ok(i),
            other => Err(mismatch("i64", &other)),
        }
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Int(i) => i32::try_from(i)
                .map_err(|_| DbError::extract(format!("integer {i} does not fit in i32"))),
            other => Err(mismatch("i32", &other)),
        }
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            // SQLite and MySQL store booleans as 0/1 integers
            SqlValue::Int(0) => Ok(false),
            SqlValue::Int(1) => Ok(true),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Float(f) => Ok(f),
            SqlValue::Int(i) => Ok(i as f64),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Bytes(b) => Ok(b),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

impl FromSqlValue for JsonValue {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Json(v) => Ok(v),
            // Drivers without a native JSON type hand back text
            SqlValue::String(s) => serde_json::from_str(&s).map_err(DbError::extract),
            other => Ok(other.to_json()),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
