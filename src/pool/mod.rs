//! Bounded, blocking connection pool.
//!
//! One mutex guards the idle queue and the counters; callers that find the
//! pool exhausted wait on a condvar until a connection is released or the pool
//! stops. Connections are opened eagerly up to `pool_size` and on demand up to
//! `max_pool_size`.

mod guard;

pub use guard::PooledConnection;

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::client::{Driver, driver_for};
use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::PooledSqlError;

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Connections waiting in the idle queue.
    pub idle: usize,
    /// Connections currently held by callers.
    pub checked_out: usize,
    /// Connections open or being opened.
    pub total: usize,
    /// `max_pool_size`.
    pub capacity: usize,
}

/// Shared handle to a connection pool; clones refer to the same pool.
#[derive(Clone)]
pub struct ConnectionPool {
    shared: Arc<PoolShared>,
}

struct PoolShared {
    config: ConnectionConfig,
    driver: Arc<dyn Driver>,
    state: Mutex<PoolState>,
    available: Condvar,
}

#[derive(Default)]
struct PoolState {
    idle: VecDeque<Arc<Connection>>,
    checked_out: usize,
    total: usize,
    stopped: bool,
}

enum Checkout {
    Idle(Arc<Connection>),
    Grow,
}

impl ConnectionPool {
    /// Start a pool for the configured backend.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ConfigError`] for an invalid config or a backend that is
    /// not compiled in. Failing initial connections are logged and skipped.
    pub fn new(config: ConnectionConfig) -> Result<Self, PooledSqlError> {
        let driver = driver_for(&config)?;
        Self::with_driver(config, driver)
    }

    /// Start a pool that opens its sessions through `driver`.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ConfigError`] if the config does not validate.
    pub fn with_driver(
        config: ConnectionConfig,
        driver: Arc<dyn Driver>,
    ) -> Result<Self, PooledSqlError> {
        config.validate()?;
        let requested = config.pool_size.min(config.max_pool_size);
        let mut state = PoolState::default();
        for attempt in 0..requested {
            match Connection::open(config.clone(), driver.as_ref()) {
                Ok(conn) => {
                    state.idle.push_back(Arc::new(conn));
                    state.total += 1;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "initial connection failed, starting without it");
                }
            }
        }
        info!(
            driver = driver.name(),
            opened = state.total,
            requested,
            capacity = config.max_pool_size,
            "connection pool started"
        );
        Ok(Self {
            shared: Arc::new(PoolShared {
                config,
                driver,
                state: Mutex::new(state),
                available: Condvar::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Check out a connection, blocking while the pool is exhausted.
    ///
    /// An idle connection is pinged first; a dead one is closed and replaced by a
    /// freshly opened connection.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::PoolStopped`] after [`ConnectionPool::shutdown`] and
    /// [`PooledSqlError::ConnectionFailure`] if a new connection cannot be opened.
    pub fn acquire(&self) -> Result<PooledConnection, PooledSqlError> {
        let checkout = {
            let mut state = self.lock();
            loop {
                if state.stopped {
                    return Err(PooledSqlError::PoolStopped);
                }
                if let Some(conn) = state.idle.pop_front() {
                    state.checked_out += 1;
                    break Checkout::Idle(conn);
                }
                if state.total < self.shared.config.max_pool_size {
                    state.total += 1;
                    state.checked_out += 1;
                    break Checkout::Grow;
                }
                state = self
                    .shared
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let conn = match checkout {
            Checkout::Idle(conn) if conn.ping() => conn,
            Checkout::Idle(conn) => {
                warn!("idle connection failed validation, replacing it");
                conn.disconnect();
                drop(conn);
                self.open_reserved()?
            }
            Checkout::Grow => {
                debug!("no idle connection, opening a new one");
                self.open_reserved()?
            }
        };
        debug!("connection acquired");
        Ok(PooledConnection::new(conn, self.clone()))
    }

    /// Open a connection for a slot already counted in `total` and `checked_out`.
    fn open_reserved(&self) -> Result<Arc<Connection>, PooledSqlError> {
        match Connection::open(self.shared.config.clone(), self.shared.driver.as_ref()) {
            Ok(conn) => Ok(Arc::new(conn)),
            Err(err) => {
                {
                    let mut state = self.lock();
                    state.total = state.total.saturating_sub(1);
                    state.checked_out = state.checked_out.saturating_sub(1);
                }
                self.shared.available.notify_one();
                Err(match err {
                    PooledSqlError::ConnectionFailure(_) => err,
                    other => PooledSqlError::ConnectionFailure(other.to_string()),
                })
            }
        }
    }

    /// Return a checked-out connection; same as dropping the guard.
    pub fn release(&self, conn: PooledConnection) {
        drop(conn);
    }

    /// Put a connection back in the idle queue, rolling back an open transaction first.
    pub(crate) fn give_back(&self, conn: Arc<Connection>) {
        if conn.in_transaction() {
            if let Err(err) = conn.rollback() {
                warn!(error = %err, "rollback on release failed, evicting connection");
                conn.disconnect();
                self.forget_checked_out();
                return;
            }
            debug!("rolled back open transaction on release");
        }

        let mut state = self.lock();
        state.checked_out = state.checked_out.saturating_sub(1);
        if state.stopped {
            state.total = state.total.saturating_sub(1);
            drop(state);
            conn.disconnect();
            return;
        }
        if state.idle.len() >= self.shared.config.max_pool_size {
            state.total = state.total.saturating_sub(1);
            drop(state);
            debug!("idle queue full, closing released connection");
            conn.disconnect();
            self.shared.available.notify_one();
            return;
        }
        state.idle.push_back(conn);
        drop(state);
        debug!("connection released");
        self.shared.available.notify_one();
    }

    fn forget_checked_out(&self) {
        {
            let mut state = self.lock();
            state.checked_out = state.checked_out.saturating_sub(1);
            state.total = state.total.saturating_sub(1);
        }
        self.shared.available.notify_one();
    }

    /// Idle connections right now; advisory only.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lock().idle.len()
    }

    /// Same as [`ConnectionPool::size`].
    #[must_use]
    pub fn available(&self) -> usize {
        self.size()
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.lock();
        PoolStatus {
            idle: state.idle.len(),
            checked_out: state.checked_out,
            total: state.total,
            capacity: self.shared.config.max_pool_size,
        }
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    /// Stop the pool: wake every waiter and close idle connections.
    ///
    /// Connections still checked out are closed when they come back.
    pub fn shutdown(&self) {
        let drained: Vec<Arc<Connection>> = {
            let mut state = self.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
            let drained: Vec<_> = state.idle.drain(..).collect();
            state.total = state.total.saturating_sub(drained.len());
            drained
        };
        self.shared.available.notify_all();
        let closed = drained.len();
        for conn in drained {
            conn.disconnect();
        }
        info!(closed, "connection pool stopped");
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("driver", &self.shared.driver.name())
            .field("status", &self.status())
            .finish()
    }
}
