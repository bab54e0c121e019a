//! Property types and their SQL mapping.

use crate::connection::Dialect;
use crate::error::{Error, Result, TypeError};
use crate::value::Value;

/// 2^63, the first whole double past `i64::MAX`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Default length of a `String` property.
pub const DEFAULT_STRING_LENGTH: u32 = 50;

/// Type of a mapped property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    /// Auto-incrementing integer key
    Serial,
    Integer,
    Float,
    Decimal,
    /// Bounded string (VARCHAR)
    String(u32),
    Text,
    Boolean,
    Blob,
    Json,
}

impl PropertyType {
    /// Get the column type for this property in the given dialect.
    pub fn sql_name(self, dialect: Dialect) -> String {
        match self {
            PropertyType::Serial | PropertyType::Integer => "INTEGER".to_string(),
            PropertyType::Float => match dialect {
                Dialect::Sqlite => "REAL".to_string(),
                Dialect::Postgres => "DOUBLE PRECISION".to_string(),
                Dialect::Mysql => "DOUBLE".to_string(),
            },
            PropertyType::Decimal => "DECIMAL(10, 2)".to_string(),
            PropertyType::String(len) => format!("VARCHAR({})", len),
            PropertyType::Text => "TEXT".to_string(),
            PropertyType::Boolean => "BOOLEAN".to_string(),
            PropertyType::Blob => match dialect {
                Dialect::Postgres => "BYTEA".to_string(),
                Dialect::Sqlite | Dialect::Mysql => "BLOB".to_string(),
            },
            PropertyType::Json => match dialect {
                Dialect::Sqlite => "TEXT".to_string(),
                Dialect::Postgres => "JSONB".to_string(),
                Dialect::Mysql => "JSON".to_string(),
            },
        }
    }

    /// Name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            PropertyType::Serial => "serial",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::Decimal => "decimal",
            PropertyType::String(_) => "string",
            PropertyType::Text => "text",
            PropertyType::Boolean => "boolean",
            PropertyType::Blob => "blob",
            PropertyType::Json => "json",
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(self, PropertyType::Serial | PropertyType::Integer)
    }

    /// Normalise a value read from the store to this property type.
    ///
    /// Stores report integers at whatever width fits and booleans as
    /// integers; this folds them into one representation per type so that
    /// loaded values compare equal to values set by the caller.
    pub fn typecast(self, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        let mismatch = |value: &Value| {
            Error::Type(TypeError {
                expected: self.name(),
                actual: value.type_name().to_string(),
                column: None,
            })
        };

        match self {
            PropertyType::Serial | PropertyType::Integer => match value {
                Value::Int(v) => Ok(Value::BigInt(i64::from(v))),
                Value::BigInt(_) => Ok(value),
                Value::Bool(b) => Ok(Value::BigInt(i64::from(b))),
                Value::Double(f) if f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f) => {
                    Ok(Value::BigInt(f as i64))
                }
                Value::Text(ref s) | Value::Decimal(ref s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::BigInt)
                    .map_err(|_| mismatch(&value)),
                other => Err(mismatch(&other)),
            },
            PropertyType::Float => match value.as_f64() {
                Some(f) => Ok(Value::Double(f)),
                None => match value {
                    Value::Text(ref s) => s
                        .trim()
                        .parse::<f64>()
                        .map(Value::Double)
                        .map_err(|_| mismatch(&value)),
                    other => Err(mismatch(&other)),
                },
            },
            PropertyType::Decimal => match value {
                Value::Decimal(_) => Ok(value),
                Value::Text(s) => Ok(Value::Decimal(s)),
                Value::Int(v) => Ok(Value::Decimal(v.to_string())),
                Value::BigInt(v) => Ok(Value::Decimal(v.to_string())),
                Value::Double(v) => Ok(Value::Decimal(v.to_string())),
                other => Err(mismatch(&other)),
            },
            PropertyType::String(_) | PropertyType::Text => match value {
                Value::Text(_) => Ok(value),
                Value::Decimal(s) => Ok(Value::Text(s)),
                Value::Int(v) => Ok(Value::Text(v.to_string())),
                Value::BigInt(v) => Ok(Value::Text(v.to_string())),
                Value::Double(v) => Ok(Value::Text(v.to_string())),
                Value::Bytes(ref b) => String::from_utf8(b.clone())
                    .map(Value::Text)
                    .map_err(|_| mismatch(&value)),
                other => Err(mismatch(&other)),
            },
            PropertyType::Boolean => match value {
                Value::Text(ref s) => match s.as_str() {
                    "t" | "true" | "1" => Ok(Value::Bool(true)),
                    "f" | "false" | "0" => Ok(Value::Bool(false)),
                    _ => Err(mismatch(&value)),
                },
                other => other
                    .as_bool()
                    .map(Value::Bool)
                    .ok_or_else(|| mismatch(&other)),
            },
            PropertyType::Blob => match value {
                Value::Bytes(_) => Ok(value),
                Value::Text(s) => Ok(Value::Bytes(s.into_bytes())),
                other => Err(mismatch(&other)),
            },
            PropertyType::Json => match value {
                Value::Json(_) => Ok(value),
                Value::Text(ref s) => serde_json::from_str(s)
                    .map(Value::Json)
                    .map_err(|_| mismatch(&value)),
                other => Ok(Value::Json(other.to_json())),
            },
        }
    }
}
