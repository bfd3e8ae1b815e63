use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::client::{ClientErrorInfo, ClientSession, Driver, driver_for};
use crate::config::ConnectionConfig;
use crate::error::PooledSqlError;

/// One server session plus the state the pool and transactions rely on.
///
/// Every operation takes the connection's own mutex, so a `Connection` can be
/// shared behind an `Arc` while calls on it stay serialized.
pub struct Connection {
    pub(super) config: ConnectionConfig,
    driver_name: &'static str,
    session: Mutex<Session>,
}

pub(super) struct Session {
    pub(super) client: Box<dyn ClientSession>,
    pub(super) connected: bool,
    pub(super) in_transaction: bool,
}

impl Session {
    pub(super) fn ensure_connected(&self) -> Result<(), PooledSqlError> {
        if self.connected {
            Ok(())
        } else {
            Err(PooledSqlError::ConnectionFailure(
                "connection is not open".into(),
            ))
        }
    }
}

impl Connection {
    /// Create a disconnected connection for the configured backend.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ConfigError`] if the backend is not compiled in, or the
    /// driver's error if a session cannot be created.
    pub fn new(config: ConnectionConfig) -> Result<Self, PooledSqlError> {
        let driver = driver_for(&config)?;
        Self::with_driver(config, driver.as_ref())
    }

    /// Create a disconnected connection using an explicit driver.
    ///
    /// # Errors
    /// Propagates the driver's error if a session cannot be created.
    pub fn with_driver(
        config: ConnectionConfig,
        driver: &dyn Driver,
    ) -> Result<Self, PooledSqlError> {
        let client = driver.open_session(&config)?;
        Ok(Self {
            config,
            driver_name: driver.name(),
            session: Mutex::new(Session {
                client,
                connected: false,
                in_transaction: false,
            }),
        })
    }

    /// Create and connect in one step.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ConnectionFailure`] if the server cannot be reached.
    pub fn open(config: ConnectionConfig, driver: &dyn Driver) -> Result<Self, PooledSqlError> {
        let conn = Self::with_driver(config, driver)?;
        conn.connect()?;
        Ok(conn)
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the session; a connected connection is reconnected.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ConnectionFailure`] if the server cannot be reached.
    pub fn connect(&self) -> Result<(), PooledSqlError> {
        let mut session = self.lock();
        session.in_transaction = false;
        session.connected = false;
        session.client.connect(&self.config)?;
        session.connected = true;
        debug!(driver = self.driver_name, database = %self.config.database, "connection opened");
        Ok(())
    }

    pub fn disconnect(&self) {
        let mut session = self.lock();
        if session.connected {
            session.client.close();
            session.connected = false;
            session.in_transaction = false;
            debug!(driver = self.driver_name, "connection closed");
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Check the session is alive.
    ///
    /// With `auto_reconnect` a dead session is reopened once in place; any open
    /// transaction is lost in that case.
    pub fn ping(&self) -> bool {
        let mut session = self.lock();
        if !session.connected {
            return false;
        }
        if session.client.ping() {
            return true;
        }
        session.connected = false;
        session.in_transaction = false;
        if !self.config.auto_reconnect {
            return false;
        }
        warn!(driver = self.driver_name, "ping failed, reconnecting");
        match session.client.connect(&self.config) {
            Ok(()) if session.client.ping() => {
                session.connected = true;
                true
            }
            Ok(()) => false,
            Err(err) => {
                warn!(error = %err, "reconnect failed");
                false
            }
        }
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.lock().in_transaction
    }

    /// Escape `text` for use inside a quoted literal, in this backend's dialect.
    #[must_use]
    pub fn escape(&self, text: &str) -> String {
        self.lock().client.escape(text)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<ClientErrorInfo> {
        self.lock().client.last_error()
    }

    /// Message of the last client error, empty if the last call succeeded.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.last_error().map(|e| e.message).unwrap_or_default()
    }

    /// Code of the last client error, `0` if the last call succeeded.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        self.last_error().map_or(0, |e| e.code)
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let session = self.session.get_mut().unwrap_or_else(PoisonError::into_inner);
        if session.connected {
            session.client.close();
            session.connected = false;
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.lock();
        f.debug_struct("Connection")
            .field("driver", &self.driver_name)
            .field("database", &self.config.database)
            .field("connected", &session.connected)
            .field("in_transaction", &session.in_transaction)
            .finish()
    }
}
