use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use crate::client::{StatementId, StatementInfo};
use crate::connection::Connection;
use crate::error::PooledSqlError;
use crate::marshal::{BindSlot, decode_outcome};
use crate::results::QueryResult;
use crate::types::Value;

/// Prepared statement bound to the connection it was prepared on.
///
/// Parameters are bound positionally in call order. Bound values are owned by
/// the statement, so they stay valid across repeated executions until
/// [`PreparedStatement::reset`]. The server-side handle is closed on drop.
///
/// ```rust
/// # use pooled_sql::prelude::*;
/// # fn demo(conn: &Connection) -> Result<(), PooledSqlError> {
/// let mut stmt = conn.prepare("INSERT INTO users (id, name) VALUES (?, ?)")?;
/// stmt.bind_int(1).bind_text("ann");
/// stmt.execute_update()?;
/// stmt.reset()?;
/// stmt.bind_all(&[Value::Int(2), Value::from("bo")]);
/// stmt.execute_update()?;
/// # Ok(())
/// # }
/// ```
pub struct PreparedStatement<'c> {
    conn: &'c Connection,
    id: StatementId,
    param_count: usize,
    slots: Vec<BindSlot>,
    // statements are driven by one thread at a time
    _not_sync: PhantomData<Cell<()>>,
}

impl<'c> PreparedStatement<'c> {
    pub(crate) fn new(conn: &'c Connection, info: StatementInfo) -> Self {
        Self {
            conn,
            id: info.id,
            param_count: info.param_count,
            slots: Vec::with_capacity(info.param_count),
            _not_sync: PhantomData,
        }
    }

    /// Bind the next parameter, dispatching on the value's variant.
    pub fn bind(&mut self, value: Value) -> &mut Self {
        match value {
            Value::Null => self.bind_null(),
            Value::Int(v) => self.bind_int(v),
            Value::BigInt(v) => self.bind_bigint(v),
            Value::Double(v) => self.bind_double(v),
            Value::Text(s) => self.bind_text(&s),
            Value::Bytes(b) => self.bind_bytes(&b),
        }
    }

    pub fn bind_int(&mut self, value: i32) -> &mut Self {
        self.push(BindSlot::long(value))
    }

    pub fn bind_bigint(&mut self, value: i64) -> &mut Self {
        self.push(BindSlot::long_long(value))
    }

    pub fn bind_double(&mut self, value: f64) -> &mut Self {
        self.push(BindSlot::double(value))
    }

    pub fn bind_text(&mut self, value: &str) -> &mut Self {
        self.push(BindSlot::string(value))
    }

    pub fn bind_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.push(BindSlot::blob(value))
    }

    pub fn bind_null(&mut self) -> &mut Self {
        self.push(BindSlot::null())
    }

    /// Bind every value in order.
    pub fn bind_all(&mut self, values: &[Value]) -> &mut Self {
        self.slots.reserve(values.len());
        for value in values {
            self.slots.push(BindSlot::from_value(value));
        }
        self
    }

    fn push(&mut self, slot: BindSlot) -> &mut Self {
        self.slots.push(slot);
        self
    }

    /// Execute with the bound parameters and decode the outcome.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ParameterError`] if the number of bound values differs
    /// from the statement's placeholders, or the client's error if execution fails.
    pub fn execute(&mut self) -> Result<QueryResult, PooledSqlError> {
        self.check_param_count()?;
        decode_outcome(self.conn.execute_prepared(self.id, &self.slots)?)
    }

    /// Execute and return only the affected-row count.
    ///
    /// # Errors
    /// Same as [`PreparedStatement::execute`].
    pub fn execute_update(&mut self) -> Result<u64, PooledSqlError> {
        self.check_param_count()?;
        Ok(self.conn.execute_prepared(self.id, &self.slots)?.affected_rows())
    }

    /// Clear bound parameters so the statement can be bound and executed again.
    ///
    /// # Errors
    /// Propagates the client's error if the server-side handle cannot be reset.
    pub fn reset(&mut self) -> Result<(), PooledSqlError> {
        self.slots.clear();
        self.conn.reset_prepared(self.id)
    }

    /// Number of placeholders declared by the statement.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Number of values bound so far.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.slots.len()
    }

    fn check_param_count(&self) -> Result<(), PooledSqlError> {
        if self.slots.len() == self.param_count {
            Ok(())
        } else {
            Err(PooledSqlError::ParameterError(format!(
                "statement expects {} parameters, {} bound",
                self.param_count,
                self.slots.len()
            )))
        }
    }
}

impl Drop for PreparedStatement<'_> {
    fn drop(&mut self) {
        self.conn.close_prepared(self.id);
    }
}

impl fmt::Debug for PreparedStatement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("id", &self.id)
            .field("param_count", &self.param_count)
            .field("bound", &self.slots.len())
            .finish()
    }
}
