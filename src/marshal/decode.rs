use crate::client::{ColumnMeta, FieldType, RawOutcome, WireValue};
use crate::error::PooledSqlError;
use crate::results::{QueryResult, ResultSet};
use crate::types::Value;

/// Turn a raw client outcome into a [`QueryResult`].
///
/// Row results record the largest encoded length seen per column in the column
/// metadata. `affected_rows` for a row result is the number of rows returned.
///
/// # Errors
/// Returns [`PooledSqlError::StatementError`] when a row is wider or narrower than the
/// column list, or [`PooledSqlError::TypeMismatch`] when a cell cannot be represented.
pub fn decode_outcome(outcome: RawOutcome) -> Result<QueryResult, PooledSqlError> {
    match outcome {
        RawOutcome::Affected {
            affected_rows,
            last_insert_id,
        } => Ok(QueryResult::from_affected(affected_rows, last_insert_id)),
        RawOutcome::Rows { mut columns, rows } => {
            let row_count = rows.len() as u64;
            let mut decoded = Vec::with_capacity(rows.len());
            for cells in rows {
                if cells.len() != columns.len() {
                    return Err(PooledSqlError::statement(
                        0,
                        format!(
                            "row has {} cells but the result declares {} columns",
                            cells.len(),
                            columns.len()
                        ),
                    ));
                }
                let mut values = Vec::with_capacity(cells.len());
                for (meta, cell) in columns.iter_mut().zip(cells) {
                    meta.max_length = meta.max_length.max(cell.encoded_len());
                    values.push(decode_cell(meta, cell)?);
                }
                decoded.push(values);
            }
            Ok(QueryResult::new(
                ResultSet::from_values(columns, decoded),
                row_count,
                0,
            ))
        }
    }
}

/// Decode one cell according to its column's declared type.
///
/// # Errors
/// Returns [`PooledSqlError::TypeMismatch`] for an unsigned 64-bit value above `i64::MAX`.
pub fn decode_cell(meta: &ColumnMeta, cell: WireValue) -> Result<Value, PooledSqlError> {
    if matches!(cell, WireValue::Null) {
        return Ok(Value::Null);
    }
    match meta.field_type {
        FieldType::Tiny | FieldType::Short | FieldType::Int24 | FieldType::Long => {
            match integer_of(&cell)? {
                Some(v) => Ok(narrow(v)),
                None => storage_class(cell),
            }
        }
        FieldType::LongLong => match integer_of(&cell)? {
            Some(v) => Ok(Value::BigInt(v)),
            None => storage_class(cell),
        },
        FieldType::Float | FieldType::Double | FieldType::Decimal => match float_of(&cell) {
            Some(v) => Ok(Value::Double(v)),
            None => storage_class(cell),
        },
        FieldType::Unknown | FieldType::Null => storage_class(cell),
        FieldType::String
        | FieldType::VarString
        | FieldType::Blob
        | FieldType::Other => Ok(character_or_binary(cell, meta.binary)),
    }
}

/// Values outside the 32-bit range are promoted, never truncated.
fn narrow(v: i64) -> Value {
    i32::try_from(v).map_or(Value::BigInt(v), Value::Int)
}

fn unsigned(v: u64) -> Result<i64, PooledSqlError> {
    i64::try_from(v).map_err(|_| PooledSqlError::TypeMismatch {
        expected: "bigint",
        found: "unsigned",
    })
}

/// Integer content of a cell; text-protocol clients deliver numbers as text.
fn integer_of(cell: &WireValue) -> Result<Option<i64>, PooledSqlError> {
    Ok(match cell {
        WireValue::Int(v) => Some(*v),
        WireValue::UInt(v) => Some(unsigned(*v)?),
        WireValue::Text(s) => s.trim().parse().ok(),
        WireValue::Bytes(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.trim().parse().ok()),
        WireValue::Null | WireValue::Float(_) => None,
    })
}

#[allow(clippy::cast_precision_loss)]
fn float_of(cell: &WireValue) -> Option<f64> {
    match cell {
        WireValue::Float(v) => Some(*v),
        WireValue::Int(v) => Some(*v as f64),
        WireValue::UInt(v) => Some(*v as f64),
        WireValue::Text(s) => s.trim().parse().ok(),
        WireValue::Bytes(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.trim().parse().ok()),
        WireValue::Null => None,
    }
}

/// Decode by the cell's own representation.
fn storage_class(cell: WireValue) -> Result<Value, PooledSqlError> {
    Ok(match cell {
        WireValue::Null => Value::Null,
        WireValue::Int(v) => narrow(v),
        WireValue::UInt(v) => narrow(unsigned(v)?),
        WireValue::Float(v) => Value::Double(v),
        WireValue::Text(s) => Value::Text(s),
        WireValue::Bytes(b) => Value::Bytes(b),
    })
}

fn character_or_binary(cell: WireValue, binary: bool) -> Value {
    match cell {
        WireValue::Null => Value::Null,
        WireValue::Bytes(b) if binary => Value::Bytes(b),
        WireValue::Bytes(b) => match String::from_utf8(b) {
            Ok(s) => Value::Text(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        WireValue::Text(s) if binary => Value::Bytes(s.into_bytes()),
        WireValue::Text(s) => Value::Text(s),
        WireValue::Int(v) => Value::Text(v.to_string()),
        WireValue::UInt(v) => Value::Text(v.to_string()),
        WireValue::Float(v) => Value::Text(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(field_type: FieldType) -> ColumnMeta {
        ColumnMeta::new("c", field_type, false)
    }

    #[test]
    fn null_wins_over_declared_type() {
        for ft in [FieldType::Long, FieldType::Double, FieldType::VarString, FieldType::Blob] {
            assert_eq!(decode_cell(&col(ft), WireValue::Null).unwrap(), Value::Null);
        }
    }

    #[test]
    fn small_integer_columns_promote_out_of_range_values() {
        assert_eq!(decode_cell(&col(FieldType::Long), WireValue::Int(42)).unwrap(), Value::Int(42));
        assert_eq!(
            decode_cell(&col(FieldType::Long), WireValue::Int(5_000_000_000)).unwrap(),
            Value::BigInt(5_000_000_000)
        );
        assert_eq!(
            decode_cell(&col(FieldType::Tiny), WireValue::Text("-7".into())).unwrap(),
            Value::Int(-7)
        );
    }

    #[test]
    fn long_long_stays_bigint() {
        assert_eq!(
            decode_cell(&col(FieldType::LongLong), WireValue::Int(1)).unwrap(),
            Value::BigInt(1)
        );
        assert!(matches!(
            decode_cell(&col(FieldType::LongLong), WireValue::UInt(u64::MAX)),
            Err(PooledSqlError::TypeMismatch { found: "unsigned", .. })
        ));
    }

    #[test]
    fn decimal_text_decodes_as_double() {
        assert_eq!(
            decode_cell(&col(FieldType::Decimal), WireValue::Bytes(b"12.50".to_vec())).unwrap(),
            Value::Double(12.5)
        );
    }

    #[test]
    fn text_and_binary_columns() {
        assert_eq!(
            decode_cell(&col(FieldType::VarString), WireValue::Bytes(b"abc".to_vec())).unwrap(),
            Value::Text("abc".into())
        );
        assert_eq!(
            decode_cell(&col(FieldType::VarString), WireValue::Bytes(vec![0xff, 0xfe])).unwrap(),
            Value::Bytes(vec![0xff, 0xfe])
        );
        let blob = ColumnMeta::new("b", FieldType::Blob, true);
        assert_eq!(
            decode_cell(&blob, WireValue::Bytes(b"abc".to_vec())).unwrap(),
            Value::Bytes(b"abc".to_vec())
        );
    }

    #[test]
    fn unknown_type_uses_storage_class() {
        let unknown = col(FieldType::Unknown);
        assert_eq!(decode_cell(&unknown, WireValue::Int(3)).unwrap(), Value::Int(3));
        assert_eq!(decode_cell(&unknown, WireValue::Float(0.5)).unwrap(), Value::Double(0.5));
        assert_eq!(
            decode_cell(&unknown, WireValue::Text("t".into())).unwrap(),
            Value::Text("t".into())
        );
    }

    #[test]
    fn outcome_tracks_max_length_per_column() {
        let outcome = RawOutcome::Rows {
            columns: vec![ColumnMeta::new("name", FieldType::VarString, false)],
            rows: vec![
                vec![WireValue::Text("ab".into())],
                vec![WireValue::Text("abcdef".into())],
                vec![WireValue::Null],
            ],
        };
        let result = decode_outcome(outcome).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result.affected_rows(), 3);
        assert_eq!(result.rows().columns()[0].max_length, 6);
        assert_eq!(result[1].get("name"), Some(&Value::Text("abcdef".into())));
    }

    #[test]
    fn affected_outcome_has_no_rows() {
        let result = decode_outcome(RawOutcome::Affected {
            affected_rows: 2,
            last_insert_id: 9,
        })
        .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.affected_rows(), 2);
        assert_eq!(result.last_insert_id(), 9);
    }
}
