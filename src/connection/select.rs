use tracing::debug;

use crate::client::{RawOutcome, StatementId};
use crate::error::PooledSqlError;
use crate::marshal::{BindSlot, decode_outcome};
use crate::results::QueryResult;
use crate::statement::PreparedStatement;

use super::core::Connection;

impl Connection {
    /// Run a statement and decode what it produced.
    ///
    /// Statements that return no result columns yield an empty row set with
    /// `affected_rows` and `last_insert_id` filled in.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ConnectionFailure`] on a closed connection and
    /// [`PooledSqlError::StatementError`] when the server rejects the statement.
    pub fn query(&self, sql: &str) -> Result<QueryResult, PooledSqlError> {
        let outcome = {
            let mut session = self.lock();
            session.ensure_connected()?;
            session.client.run_query(sql)?
        };
        decode_outcome(outcome)
    }

    /// Run a statement and return the affected-row count, skipping row decoding.
    ///
    /// # Errors
    /// Same as [`Connection::query`].
    pub fn execute(&self, sql: &str) -> Result<u64, PooledSqlError> {
        let mut session = self.lock();
        session.ensure_connected()?;
        Ok(session.client.run_query(sql)?.affected_rows())
    }

    /// Prepare `sql` on this connection.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::StatementError`] when the server rejects the statement.
    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement<'_>, PooledSqlError> {
        let info = {
            let mut session = self.lock();
            session.ensure_connected()?;
            session.client.prepare(sql)?
        };
        debug!(statement = info.id.0, params = info.param_count, "statement prepared");
        Ok(PreparedStatement::new(self, info))
    }

    pub(crate) fn execute_prepared(
        &self,
        statement: StatementId,
        params: &[BindSlot],
    ) -> Result<RawOutcome, PooledSqlError> {
        let mut session = self.lock();
        session.ensure_connected()?;
        session.client.bind_and_execute(statement, params)
    }

    pub(crate) fn reset_prepared(&self, statement: StatementId) -> Result<(), PooledSqlError> {
        self.lock().client.reset_statement(statement)
    }

    pub(crate) fn close_prepared(&self, statement: StatementId) {
        self.lock().client.close_statement(statement);
    }
}
