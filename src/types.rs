use clap::ValueEnum;
use serde::Deserialize;

use crate::error::PooledSqlError;

/// Values that can be stored in a database row or bound as statement parameters.
///
/// Exactly one variant is active; binding and decoding dispatch on it:
/// ```rust
/// use pooled_sql::prelude::*;
///
/// let params = vec![
///     Value::Int(1),
///     Value::BigInt(9_000_000_000),
///     Value::Text("alice".into()),
///     Value::Null,
/// ];
/// assert_eq!(params[0].get::<i32>().unwrap(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL NULL
    #[default]
    Null,
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    BigInt(i64),
    /// Floating point value (64-bit)
    Double(f64),
    /// Text/string value
    Text(String),
    /// Binary data
    Bytes(Vec<u8>),
}

impl Value {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the active variant.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        if let Value::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// Integer value, widening `Int` to 64 bits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(i64::from(*value)),
            Value::BigInt(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        if let Value::Double(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        if let Value::Bytes(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Extract the value as `T`, failing when the active variant is not the one `T` maps to.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::TypeMismatch`] on a variant mismatch.
    pub fn get<T: FromValue>(&self) -> Result<T, PooledSqlError> {
        T::from_value(self)
    }

    /// Like [`Value::get`], returning `None` instead of an error.
    #[must_use]
    pub fn get_opt<T: FromValue>(&self) -> Option<T> {
        T::from_value(self).ok()
    }
}

/// Strict conversion out of a [`Value`].
pub trait FromValue: Sized {
    /// Convert the value, failing on a variant mismatch.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::TypeMismatch`] when the value holds a different variant.
    fn from_value(value: &Value) -> Result<Self, PooledSqlError>;
}

fn mismatch(expected: &'static str, value: &Value) -> PooledSqlError {
    PooledSqlError::TypeMismatch {
        expected,
        found: value.type_name(),
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, PooledSqlError> {
        value.as_i32().ok_or_else(|| mismatch("int", value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, PooledSqlError> {
        if let Value::BigInt(v) = value {
            Ok(*v)
        } else {
            Err(mismatch("bigint", value))
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, PooledSqlError> {
        value.as_f64().ok_or_else(|| mismatch("double", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, PooledSqlError> {
        value
            .as_text()
            .map(str::to_owned)
            .ok_or_else(|| mismatch("text", value))
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, PooledSqlError> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| mismatch("bytes", value))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, PooledSqlError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::BigInt(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::BigInt(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Int(i32::from(value))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Double(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// The client library a [`crate::ConnectionConfig`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `SQLite` through `rusqlite`; `database` is the file path or URI
    Sqlite,
    /// `MySQL` through `mysql_async`
    Mysql,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "sqlite") {
            Backend::Sqlite
        } else {
            Backend::Mysql
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_get_rejects_wrong_variant() {
        let value = Value::Text("42".into());
        match value.get::<i32>() {
            Err(PooledSqlError::TypeMismatch { expected, found }) => {
                assert_eq!(expected, "int");
                assert_eq!(found, "text");
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
        assert_eq!(value.get_opt::<i32>(), None);
        assert_eq!(value.get::<String>().unwrap(), "42");
    }

    #[test]
    fn int_and_bigint_stay_distinct() {
        assert!(Value::Int(7).get::<i64>().is_err());
        assert_eq!(Value::Int(7).as_i64(), Some(7));
        assert_eq!(Value::BigInt(7).get::<i64>().unwrap(), 7);
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Value::Null.get::<Option<f64>>().unwrap(), None);
        assert_eq!(Value::Double(1.5).get::<Option<f64>>().unwrap(), Some(1.5));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn backend_parses_by_name() {
        assert_eq!(Backend::from_str("MySQL", true).unwrap(), Backend::Mysql);
        assert!(Backend::from_str("oracle", true).is_err());
    }
}
