/// Build a `Vec<Value>` from heterogeneous arguments via `Value::from`.
///
/// ```rust
/// use pooled_sql::{Value, sql_params};
///
/// let params = sql_params![1, 9_000_000_000_i64, 2.5, "ann", None::<i32>];
/// assert_eq!(params[0], Value::Int(1));
/// assert_eq!(params[1], Value::BigInt(9_000_000_000));
/// assert_eq!(params[4], Value::Null);
/// ```
#[macro_export]
macro_rules! sql_params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}
