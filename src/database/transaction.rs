use std::fmt;

use tracing::warn;

use crate::connection::Connection;
use crate::error::PooledSqlError;
use crate::pool::PooledConnection;
use crate::results::QueryResult;
use crate::statement::PreparedStatement;
use crate::types::Value;

use super::{execute_prepared, query_prepared};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// A transaction holding one pooled connection for its whole scope.
///
/// `commit` and `rollback` consume the transaction. Dropping it while still
/// open rolls back before the connection goes back to the pool.
pub struct Transaction {
    conn: PooledConnection,
    state: TransactionState,
}

impl Transaction {
    pub(crate) fn begin(conn: PooledConnection) -> Result<Self, PooledSqlError> {
        conn.begin_transaction()?;
        Ok(Self {
            conn,
            state: TransactionState::Open,
        })
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Connection the transaction runs on.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// # Errors
    /// Propagates the client's error.
    pub fn query(&self, sql: &str) -> Result<QueryResult, PooledSqlError> {
        self.conn.query(sql)
    }

    /// # Errors
    /// Returns [`PooledSqlError::ParameterError`] on a placeholder mismatch, or the
    /// client's error.
    pub fn query_with(&self, sql: &str, params: &[Value]) -> Result<QueryResult, PooledSqlError> {
        query_prepared(&self.conn, sql, params)
    }

    /// # Errors
    /// Propagates the client's error.
    pub fn execute(&self, sql: &str) -> Result<u64, PooledSqlError> {
        self.conn.execute(sql)
    }

    /// # Errors
    /// Same as [`Transaction::query_with`].
    pub fn execute_with(&self, sql: &str, params: &[Value]) -> Result<u64, PooledSqlError> {
        execute_prepared(&self.conn, sql, params)
    }

    /// # Errors
    /// Propagates the client's error.
    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement<'_>, PooledSqlError> {
        self.conn.prepare(sql)
    }

    /// Commit and release the connection.
    ///
    /// # Errors
    /// Propagates the client's error; the transaction is then rolled back on drop.
    pub fn commit(mut self) -> Result<(), PooledSqlError> {
        self.conn.commit()?;
        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Roll back and release the connection.
    ///
    /// # Errors
    /// Propagates the client's error; the pool evicts the connection on release.
    pub fn rollback(mut self) -> Result<(), PooledSqlError> {
        let outcome = self.conn.rollback();
        self.state = TransactionState::RolledBack;
        outcome
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Open {
            if let Err(err) = self.conn.rollback() {
                warn!(error = %err, "rollback of dropped transaction failed");
            }
            self.state = TransactionState::RolledBack;
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("state", &self.state)
            .field("conn", &self.conn)
            .finish()
    }
}
