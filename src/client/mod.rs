//! Seam to the external database client library.
//!
//! The rest of the crate never talks a wire protocol: it drives a
//! [`ClientSession`] created by a [`Driver`]. Concrete clients:
//! - `sqlite`: `rusqlite` (default feature)
//! - `mysql`: `mysql_async` behind a per-session current-thread runtime

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::error::PooledSqlError;
use crate::marshal::BindSlot;
use crate::types::Backend;

/// Server-declared type of a result column or a bind slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Null,
    Tiny,
    Short,
    Int24,
    Long,
    LongLong,
    Float,
    Double,
    Decimal,
    String,
    VarString,
    Blob,
    /// No declared type; decode from the cell's own storage class.
    Unknown,
    /// Any other server type (dates, json, enums, ...), carried as text.
    Other,
}

impl FieldType {
    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Tiny | FieldType::Short | FieldType::Int24 | FieldType::Long | FieldType::LongLong
        )
    }

    #[must_use]
    pub fn is_floating(self) -> bool {
        matches!(self, FieldType::Float | FieldType::Double | FieldType::Decimal)
    }
}

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub field_type: FieldType,
    /// Column holds binary rather than character data.
    pub binary: bool,
    /// Largest encoded length observed for this column in the current result.
    pub max_length: u64,
}

impl ColumnMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType, binary: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            binary,
            max_length: 0,
        }
    }
}

/// One result cell as handed over by the client, before typed decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl WireValue {
    /// Encoded length, used to track per-column maximums.
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        match self {
            WireValue::Null => 0,
            WireValue::Int(_) | WireValue::UInt(_) | WireValue::Float(_) => 8,
            WireValue::Text(s) => s.len() as u64,
            WireValue::Bytes(b) => b.len() as u64,
        }
    }
}

/// What a statement produced, classified by presence of column metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    Rows {
        columns: Vec<ColumnMeta>,
        rows: Vec<Vec<WireValue>>,
    },
    Affected {
        affected_rows: u64,
        last_insert_id: u64,
    },
}

impl RawOutcome {
    /// Affected-row count; for row-producing statements the number of rows.
    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        match self {
            RawOutcome::Rows { rows, .. } => rows.len() as u64,
            RawOutcome::Affected { affected_rows, .. } => *affected_rows,
        }
    }
}

/// Handle to a statement prepared inside one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementId(pub u64);

/// Result of preparing a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementInfo {
    pub id: StatementId,
    pub param_count: usize,
}

/// Last error reported by a client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientErrorInfo {
    pub code: i32,
    pub message: String,
}

impl From<&PooledSqlError> for ClientErrorInfo {
    fn from(err: &PooledSqlError) -> Self {
        ClientErrorInfo {
            code: err.code().unwrap_or(0),
            message: err.to_string(),
        }
    }
}

/// One live session of the external database client.
///
/// Sessions are driven by exactly one thread at a time (the owning
/// [`crate::Connection`] serializes access), so implementations need `Send` only.
pub trait ClientSession: Send {
    /// Open the session. Called on a fresh session and again on reconnect.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ConnectionFailure`] if the server cannot be reached.
    fn connect(&mut self, config: &ConnectionConfig) -> Result<(), PooledSqlError>;

    /// Close the session; a closed session may be connected again.
    fn close(&mut self);

    /// Lightweight liveness check.
    fn ping(&mut self) -> bool;

    /// Run a statement without parameters.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::StatementError`] when the server rejects the statement.
    fn run_query(&mut self, sql: &str) -> Result<RawOutcome, PooledSqlError>;

    /// Prepare a statement and report its parameter count.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::StatementError`] when the server rejects the statement.
    fn prepare(&mut self, sql: &str) -> Result<StatementInfo, PooledSqlError>;

    /// Bind `params` positionally to a prepared statement and execute it.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::StatementError`] when binding or execution fails.
    fn bind_and_execute(
        &mut self,
        statement: StatementId,
        params: &[BindSlot],
    ) -> Result<RawOutcome, PooledSqlError>;

    /// Clear server-side state of a prepared statement so it can run again.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::StatementError`] for an unknown handle.
    fn reset_statement(&mut self, statement: StatementId) -> Result<(), PooledSqlError>;

    /// Release a prepared statement handle.
    fn close_statement(&mut self, statement: StatementId);

    /// Escape `text` for interpolation inside a quoted SQL literal.
    fn escape(&self, text: &str) -> String;

    fn last_error(&self) -> Option<ClientErrorInfo>;

    /// Statement that opens a transaction in this client's dialect.
    fn begin_statement(&self) -> &'static str {
        "START TRANSACTION"
    }
}

/// Factory for client sessions; one driver serves every connection of a pool.
pub trait Driver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Create a new, not yet connected session.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ConnectionFailure`] if the client cannot be initialized.
    fn open_session(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn ClientSession>, PooledSqlError>;
}

/// Pick the driver for the configured backend.
///
/// # Errors
/// Returns [`PooledSqlError::ConfigError`] if the backend's feature is not compiled in.
pub fn driver_for(config: &ConnectionConfig) -> Result<Arc<dyn Driver>, PooledSqlError> {
    match config.backend {
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => Ok(Arc::new(sqlite::SqliteDriver)),
        #[cfg(feature = "mysql")]
        Backend::Mysql => Ok(Arc::new(mysql::MysqlDriver)),
        #[allow(unreachable_patterns)]
        other => Err(PooledSqlError::ConfigError(format!(
            "backend {other:?} is not enabled in the current build"
        ))),
    }
}
