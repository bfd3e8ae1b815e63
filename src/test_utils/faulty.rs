use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::client::{
    ClientErrorInfo, ClientSession, Driver, RawOutcome, StatementId, StatementInfo,
};
use crate::config::ConnectionConfig;
use crate::error::PooledSqlError;
use crate::marshal::BindSlot;

/// Switches and counters shared by every session of a [`FaultyDriver`].
#[derive(Debug, Default)]
pub struct Faults {
    fail_connect: AtomicBool,
    fail_ping: AtomicBool,
    fail_rollback: AtomicBool,
    connects: AtomicUsize,
    executions: AtomicUsize,
    prepares: AtomicUsize,
}

impl Faults {
    /// Make every subsequent connect attempt fail.
    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Make every liveness check report a dead session.
    pub fn fail_ping(&self, fail: bool) {
        self.fail_ping.store(fail, Ordering::SeqCst);
    }

    /// Make `ROLLBACK` statements fail.
    pub fn fail_rollback(&self, fail: bool) {
        self.fail_rollback.store(fail, Ordering::SeqCst);
    }

    /// Connect attempts so far, failed ones included.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Statements sent to the wrapped client, plain and prepared.
    #[must_use]
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn prepares(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.connects.store(0, Ordering::SeqCst);
        self.executions.store(0, Ordering::SeqCst);
        self.prepares.store(0, Ordering::SeqCst);
    }
}

/// Driver wrapping a real driver and injecting failures on demand.
pub struct FaultyDriver {
    inner: Arc<dyn Driver>,
    faults: Arc<Faults>,
}

impl FaultyDriver {
    #[must_use]
    pub fn new(inner: Arc<dyn Driver>) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::default()),
        }
    }

    /// Wrap the `SQLite` driver.
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlite() -> Self {
        Self::new(Arc::new(crate::client::sqlite::SqliteDriver))
    }

    /// Handle for flipping switches after the driver has been handed to a pool.
    #[must_use]
    pub fn faults(&self) -> Arc<Faults> {
        Arc::clone(&self.faults)
    }
}

impl Driver for FaultyDriver {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn open_session(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn ClientSession>, PooledSqlError> {
        Ok(Box::new(FaultySession {
            inner: self.inner.open_session(config)?,
            faults: Arc::clone(&self.faults),
        }))
    }
}

struct FaultySession {
    inner: Box<dyn ClientSession>,
    faults: Arc<Faults>,
}

impl ClientSession for FaultySession {
    fn connect(&mut self, config: &ConnectionConfig) -> Result<(), PooledSqlError> {
        self.faults.connects.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_connect.load(Ordering::SeqCst) {
            return Err(PooledSqlError::ConnectionFailure(
                "injected connect failure".into(),
            ));
        }
        self.inner.connect(config)
    }

    fn close(&mut self) {
        self.inner.close();
    }

    fn ping(&mut self) -> bool {
        !self.faults.fail_ping.load(Ordering::SeqCst) && self.inner.ping()
    }

    fn run_query(&mut self, sql: &str) -> Result<RawOutcome, PooledSqlError> {
        if self.faults.fail_rollback.load(Ordering::SeqCst)
            && sql.trim().eq_ignore_ascii_case("ROLLBACK")
        {
            return Err(PooledSqlError::statement(5, "injected rollback failure"));
        }
        self.faults.executions.fetch_add(1, Ordering::SeqCst);
        self.inner.run_query(sql)
    }

    fn prepare(&mut self, sql: &str) -> Result<StatementInfo, PooledSqlError> {
        self.faults.prepares.fetch_add(1, Ordering::SeqCst);
        self.inner.prepare(sql)
    }

    fn bind_and_execute(
        &mut self,
        statement: StatementId,
        params: &[BindSlot],
    ) -> Result<RawOutcome, PooledSqlError> {
        self.faults.executions.fetch_add(1, Ordering::SeqCst);
        self.inner.bind_and_execute(statement, params)
    }

    fn reset_statement(&mut self, statement: StatementId) -> Result<(), PooledSqlError> {
        self.inner.reset_statement(statement)
    }

    fn close_statement(&mut self, statement: StatementId) {
        self.inner.close_statement(statement);
    }

    fn escape(&self, text: &str) -> String {
        self.inner.escape(text)
    }

    fn last_error(&self) -> Option<ClientErrorInfo> {
        self.inner.last_error()
    }

    fn begin_statement(&self) -> &'static str {
        self.inner.begin_statement()
    }
}
