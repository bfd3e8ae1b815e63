use thiserror::Error;

#[derive(Debug, Error)]
pub enum PooledSqlError {
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    #[error("Connection pool is stopped")]
    PoolStopped,

    #[error("Statement error ({code}): {message}")]
    StatementError { code: i32, message: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Async dispatcher is stopped")]
    DispatcherStopped,

    #[error("Async task failed: {0}")]
    TaskFailed(String),
}

impl PooledSqlError {
    /// Build a [`PooledSqlError::StatementError`] from a client-reported code and message.
    pub fn statement(code: i32, message: impl Into<String>) -> Self {
        PooledSqlError::StatementError {
            code,
            message: message.into(),
        }
    }

    /// Server error code carried by a statement error, if any.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            PooledSqlError::StatementError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PooledSqlError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ffi_err, message) => PooledSqlError::StatementError {
                code: ffi_err.extended_code,
                message: message.unwrap_or_else(|| ffi_err.to_string()),
            },
            other => PooledSqlError::StatementError {
                code: 0,
                message: other.to_string(),
            },
        }
    }
}

#[cfg(feature = "mysql")]
impl From<mysql_async::Error> for PooledSqlError {
    fn from(err: mysql_async::Error) -> Self {
        match err {
            mysql_async::Error::Server(server) => PooledSqlError::StatementError {
                code: i32::from(server.code),
                message: server.message,
            },
            mysql_async::Error::Io(io) => PooledSqlError::ConnectionFailure(io.to_string()),
            other => PooledSqlError::StatementError {
                code: 0,
                message: other.to_string(),
            },
        }
    }
}
