use tracing::debug;

use crate::error::PooledSqlError;

use super::core::Connection;

impl Connection {
    /// Open a transaction on this connection.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::TransactionError`] if one is already open, or the
    /// client's error if the begin statement fails.
    pub fn begin_transaction(&self) -> Result<(), PooledSqlError> {
        let mut session = self.lock();
        session.ensure_connected()?;
        if session.in_transaction {
            return Err(PooledSqlError::TransactionError(
                "a transaction is already open on this connection".into(),
            ));
        }
        let begin = session.client.begin_statement();
        session.client.run_query(begin)?;
        session.in_transaction = true;
        debug!("transaction started");
        Ok(())
    }

    /// Commit the open transaction.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::TransactionError`] if none is open. A failed commit
    /// leaves the transaction open so it can still be rolled back.
    pub fn commit(&self) -> Result<(), PooledSqlError> {
        self.finish_transaction("COMMIT")
    }

    /// Roll back the open transaction.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::TransactionError`] if none is open.
    pub fn rollback(&self) -> Result<(), PooledSqlError> {
        self.finish_transaction("ROLLBACK")
    }

    fn finish_transaction(&self, statement: &str) -> Result<(), PooledSqlError> {
        let mut session = self.lock();
        if !session.in_transaction {
            return Err(PooledSqlError::TransactionError(format!(
                "{statement} without an open transaction"
            )));
        }
        session.ensure_connected()?;
        session.client.run_query(statement)?;
        session.in_transaction = false;
        debug!(statement, "transaction finished");
        Ok(())
    }
}
