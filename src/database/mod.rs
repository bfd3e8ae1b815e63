//! Entry point: a pool plus a dispatcher behind one handle.

mod batch;
mod transaction;

pub use transaction::{Transaction, TransactionState};

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::client::{Driver, driver_for};
use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::dispatcher::{Deferred, Dispatcher};
use crate::error::PooledSqlError;
use crate::pool::ConnectionPool;
use crate::results::QueryResult;
use crate::types::Value;

/// Connection pool and async dispatcher for one database.
///
/// Synchronous calls run on the caller's thread; `*_async` calls run on the
/// dispatcher's workers. Either way a connection is checked out for the call
/// and returned afterwards, on success and failure alike.
///
/// ```rust,no_run
/// use pooled_sql::prelude::*;
///
/// # fn main() -> Result<(), PooledSqlError> {
/// let db = Database::new(ConnectionConfig::sqlite("app.db"))?;
/// db.execute("CREATE TABLE IF NOT EXISTS users (id INTEGER, name TEXT)")?;
/// db.execute_with("INSERT INTO users VALUES (?, ?)", &sql_params![1, "ann"])?;
///
/// let pending = db.query_async("SELECT name FROM users");
/// let rows = pending.wait()?;
/// assert_eq!(rows[0].get_as::<String>("name")?, "ann");
/// # Ok(())
/// # }
/// ```
pub struct Database {
    pool: ConnectionPool,
    dispatcher: Dispatcher,
}

impl Database {
    /// Start the pool and the dispatcher for `config`.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ConfigError`] for an invalid config, or
    /// [`PooledSqlError::TaskFailed`] if worker threads cannot be spawned.
    pub fn new(config: ConnectionConfig) -> Result<Self, PooledSqlError> {
        let driver = driver_for(&config)?;
        Self::with_driver(config, driver)
    }

    /// Like [`Database::new`] with an explicit client driver.
    ///
    /// # Errors
    /// Same as [`Database::new`].
    pub fn with_driver(
        config: ConnectionConfig,
        driver: Arc<dyn Driver>,
    ) -> Result<Self, PooledSqlError> {
        let workers = config.worker_threads.unwrap_or_else(Dispatcher::default_size);
        let pool = ConnectionPool::with_driver(config, driver)?;
        let dispatcher = Dispatcher::new(workers)?;
        Ok(Self { pool, dispatcher })
    }

    /// Parse `url` with [`ConnectionConfig::from_url`] and start a database.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ConfigError`] for a malformed URL.
    pub fn from_url(url: &str) -> Result<Self, PooledSqlError> {
        Self::new(ConnectionConfig::from_url(url)?)
    }

    /// # Errors
    /// Returns pool errors from checkout and client errors from the statement.
    pub fn query(&self, sql: &str) -> Result<QueryResult, PooledSqlError> {
        self.pool.acquire()?.query(sql)
    }

    /// Prepare `sql`, bind `params` positionally and run it.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ParameterError`] when `params` does not match the
    /// placeholders, plus everything [`Database::query`] can return.
    pub fn query_with(&self, sql: &str, params: &[Value]) -> Result<QueryResult, PooledSqlError> {
        let conn = self.pool.acquire()?;
        query_prepared(&conn, sql, params)
    }

    /// # Errors
    /// Same as [`Database::query`].
    pub fn execute(&self, sql: &str) -> Result<u64, PooledSqlError> {
        self.pool.acquire()?.execute(sql)
    }

    /// # Errors
    /// Same as [`Database::query_with`].
    pub fn execute_with(&self, sql: &str, params: &[Value]) -> Result<u64, PooledSqlError> {
        let conn = self.pool.acquire()?;
        execute_prepared(&conn, sql, params)
    }

    /// Run [`Database::query`] on a worker thread.
    pub fn query_async(&self, sql: impl Into<String>) -> Deferred<QueryResult> {
        let pool = self.pool.clone();
        let sql = sql.into();
        debug!(sql = %sql, "dispatching query");
        self.dispatcher.submit(move || pool.acquire()?.query(&sql))
    }

    /// Run [`Database::query_with`] on a worker thread.
    pub fn query_async_with(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Deferred<QueryResult> {
        let pool = self.pool.clone();
        let sql = sql.into();
        debug!(sql = %sql, params = params.len(), "dispatching query");
        self.dispatcher.submit(move || {
            let conn = pool.acquire()?;
            query_prepared(&conn, &sql, &params)
        })
    }

    /// Run [`Database::execute`] on a worker thread.
    pub fn execute_async(&self, sql: impl Into<String>) -> Deferred<u64> {
        let pool = self.pool.clone();
        let sql = sql.into();
        debug!(sql = %sql, "dispatching statement");
        self.dispatcher.submit(move || pool.acquire()?.execute(&sql))
    }

    /// Check out a connection and open a transaction on it.
    ///
    /// # Errors
    /// Returns pool errors from checkout or the client's error from the begin statement.
    pub fn begin_transaction(&self) -> Result<Transaction, PooledSqlError> {
        Transaction::begin(self.pool.acquire()?)
    }

    /// Escape `text` with a pooled connection's dialect.
    ///
    /// # Errors
    /// Returns pool errors from checkout.
    pub fn escape(&self, text: &str) -> Result<String, PooledSqlError> {
        Ok(self.pool.acquire()?.escape(text))
    }

    #[must_use]
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Stop the dispatcher and the pool, then join the workers. Also runs on drop.
    ///
    /// Queued tasks still run; those that reach the pool after this point fail
    /// with [`PooledSqlError::PoolStopped`], and a worker blocked waiting for a
    /// connection is woken the same way.
    pub fn shutdown(&self) {
        self.dispatcher.stop();
        self.pool.shutdown();
        self.dispatcher.join();
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("pool", &self.pool)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

pub(crate) fn query_prepared(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<QueryResult, PooledSqlError> {
    let mut stmt = conn.prepare(sql)?;
    stmt.bind_all(params);
    stmt.execute()
}

pub(crate) fn execute_prepared(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<u64, PooledSqlError> {
    let mut stmt = conn.prepare(sql)?;
    stmt.bind_all(params);
    stmt.execute_update()
}
