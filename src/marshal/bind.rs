use crate::client::FieldType;
use crate::error::PooledSqlError;
use crate::types::Value;

/// One positional parameter in wire-ready form.
///
/// The slot owns its buffer, so a bound value stays valid for every execution
/// until the statement is reset. Fixed-width numbers are stored little-endian.
#[derive(Debug, Clone, PartialEq)]
pub struct BindSlot {
    field_type: FieldType,
    is_null: bool,
    buffer: Vec<u8>,
}

impl BindSlot {
    #[must_use]
    pub fn null() -> Self {
        Self {
            field_type: FieldType::Null,
            is_null: true,
            buffer: Vec::new(),
        }
    }

    #[must_use]
    pub fn long(value: i32) -> Self {
        Self::fixed(FieldType::Long, value.to_le_bytes().to_vec())
    }

    #[must_use]
    pub fn long_long(value: i64) -> Self {
        Self::fixed(FieldType::LongLong, value.to_le_bytes().to_vec())
    }

    #[must_use]
    pub fn double(value: f64) -> Self {
        Self::fixed(FieldType::Double, value.to_le_bytes().to_vec())
    }

    #[must_use]
    pub fn string(value: &str) -> Self {
        Self::fixed(FieldType::String, value.as_bytes().to_vec())
    }

    #[must_use]
    pub fn blob(value: &[u8]) -> Self {
        Self::fixed(FieldType::Blob, value.to_vec())
    }

    fn fixed(field_type: FieldType, buffer: Vec<u8>) -> Self {
        Self {
            field_type,
            is_null: false,
            buffer,
        }
    }

    /// Encode a [`Value`] into the slot matching its active variant.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::null(),
            Value::Int(v) => Self::long(*v),
            Value::BigInt(v) => Self::long_long(*v),
            Value::Double(v) => Self::double(*v),
            Value::Text(s) => Self::string(s),
            Value::Bytes(b) => Self::blob(b),
        }
    }

    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.is_null
    }

    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.buffer.len()
    }

    /// Decode the slot back into a [`Value`]; clients use this to build their native parameters.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ParameterError`] if the buffer does not match the slot type.
    pub fn to_value(&self) -> Result<Value, PooledSqlError> {
        if self.is_null {
            return Ok(Value::Null);
        }
        match self.field_type {
            FieldType::Long => Ok(Value::Int(i32::from_le_bytes(self.fixed_bytes()?))),
            FieldType::LongLong => Ok(Value::BigInt(i64::from_le_bytes(self.fixed_bytes()?))),
            FieldType::Double => Ok(Value::Double(f64::from_le_bytes(self.fixed_bytes()?))),
            FieldType::String => String::from_utf8(self.buffer.clone())
                .map(Value::Text)
                .map_err(|e| PooledSqlError::ParameterError(format!("text slot is not UTF-8: {e}"))),
            FieldType::Blob => Ok(Value::Bytes(self.buffer.clone())),
            other => Err(PooledSqlError::ParameterError(format!(
                "unsupported bind slot type {other:?}"
            ))),
        }
    }

    fn fixed_bytes<const N: usize>(&self) -> Result<[u8; N], PooledSqlError> {
        self.buffer.as_slice().try_into().map_err(|_| {
            PooledSqlError::ParameterError(format!(
                "{:?} slot holds {} bytes, expected {N}",
                self.field_type,
                self.buffer.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_type_follows_variant() {
        assert_eq!(BindSlot::from_value(&Value::Int(3)).field_type(), FieldType::Long);
        assert_eq!(BindSlot::from_value(&Value::BigInt(3)).field_type(), FieldType::LongLong);
        assert_eq!(BindSlot::from_value(&Value::Double(3.0)).field_type(), FieldType::Double);
        assert_eq!(BindSlot::from_value(&Value::from("x")).field_type(), FieldType::String);
        assert_eq!(BindSlot::from_value(&Value::Bytes(vec![1])).field_type(), FieldType::Blob);
        let null = BindSlot::from_value(&Value::Null);
        assert!(null.is_null());
        assert_eq!(null.length(), 0);
    }

    #[test]
    fn text_slot_owns_its_bytes() {
        let slot = {
            let temp = String::from("short-lived");
            BindSlot::from_value(&Value::Text(temp))
        };
        assert_eq!(slot.length(), 11);
        assert_eq!(slot.to_value().unwrap(), Value::Text("short-lived".into()));
    }

    #[test]
    fn extreme_numbers_survive_encoding() {
        for value in [
            Value::Int(i32::MIN),
            Value::BigInt(i64::MAX),
            Value::Double(-0.000_123_456_789),
        ] {
            assert_eq!(BindSlot::from_value(&value).to_value().unwrap(), value);
        }
    }
}
