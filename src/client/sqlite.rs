use std::collections::HashMap;

use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{Statement, params_from_iter};
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::error::PooledSqlError;
use crate::marshal::BindSlot;
use crate::types::Value;

use super::{
    ClientErrorInfo, ClientSession, ColumnMeta, Driver, FieldType, RawOutcome, StatementId,
    StatementInfo, WireValue,
};

/// Driver for `SQLite` database files through `rusqlite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn open_session(
        &self,
        _config: &ConnectionConfig,
    ) -> Result<Box<dyn ClientSession>, PooledSqlError> {
        Ok(Box::new(SqliteSession::default()))
    }
}

/// One `rusqlite` connection.
///
/// Prepared statements live in `rusqlite`'s statement cache keyed by SQL text;
/// the session only remembers which SQL each handle stands for.
#[derive(Default)]
pub struct SqliteSession {
    conn: Option<rusqlite::Connection>,
    statements: HashMap<StatementId, String>,
    next_statement: u64,
    last_error: Option<ClientErrorInfo>,
}

impl SqliteSession {
    fn connection(&self) -> Result<&rusqlite::Connection, PooledSqlError> {
        self.conn
            .as_ref()
            .ok_or_else(|| PooledSqlError::ConnectionFailure("sqlite session is not open".into()))
    }

    fn record<T>(&mut self, outcome: Result<T, PooledSqlError>) -> Result<T, PooledSqlError> {
        match outcome {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(err) => {
                self.last_error = Some(ClientErrorInfo::from(&err));
                Err(err)
            }
        }
    }

    fn statement_sql(&self, statement: StatementId) -> Result<String, PooledSqlError> {
        self.statements.get(&statement).cloned().ok_or_else(|| {
            PooledSqlError::statement(0, format!("unknown statement handle {}", statement.0))
        })
    }
}

impl ClientSession for SqliteSession {
    fn connect(&mut self, config: &ConnectionConfig) -> Result<(), PooledSqlError> {
        self.close();
        let conn = rusqlite::Connection::open(&config.database).map_err(|e| {
            PooledSqlError::ConnectionFailure(format!(
                "cannot open sqlite database '{}': {e}",
                config.database
            ))
        })?;
        conn.busy_timeout(config.connection_timeout)
            .map_err(|e| PooledSqlError::ConnectionFailure(e.to_string()))?;
        if let Err(err) = conn.execute_batch("PRAGMA journal_mode = WAL;") {
            debug!(database = %config.database, error = %err, "WAL journal mode unavailable");
        }
        self.conn = Some(conn);
        self.last_error = None;
        Ok(())
    }

    fn close(&mut self) {
        self.statements.clear();
        if let Some(conn) = self.conn.take() {
            if let Err((_, err)) = conn.close() {
                debug!(error = %err, "sqlite close reported an error");
            }
        }
    }

    fn ping(&mut self) -> bool {
        self.conn.as_ref().is_some_and(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok()
        })
    }

    fn run_query(&mut self, sql: &str) -> Result<RawOutcome, PooledSqlError> {
        let outcome = self.connection().and_then(|conn| {
            let mut stmt = conn.prepare(sql)?;
            run_statement(conn, &mut stmt, Vec::new())
        });
        self.record(outcome)
    }

    fn prepare(&mut self, sql: &str) -> Result<StatementInfo, PooledSqlError> {
        let param_count = self.connection().and_then(|conn| {
            let stmt = conn.prepare_cached(sql)?;
            Ok(stmt.parameter_count())
        });
        let param_count = self.record(param_count)?;
        self.next_statement += 1;
        let id = StatementId(self.next_statement);
        self.statements.insert(id, sql.to_owned());
        Ok(StatementInfo { id, param_count })
    }

    fn bind_and_execute(
        &mut self,
        statement: StatementId,
        params: &[BindSlot],
    ) -> Result<RawOutcome, PooledSqlError> {
        let outcome = self.statement_sql(statement).and_then(|sql| {
            let values = params
                .iter()
                .map(|slot| slot.to_value().map(to_sqlite))
                .collect::<Result<Vec<_>, _>>()?;
            let conn = self.connection()?;
            let mut stmt = conn.prepare_cached(&sql)?;
            run_statement(conn, &mut stmt, values)
        });
        self.record(outcome)
    }

    fn reset_statement(&mut self, statement: StatementId) -> Result<(), PooledSqlError> {
        // cached statements are reset by rusqlite when they go back to the cache
        self.statement_sql(statement).map(|_| ())
    }

    fn close_statement(&mut self, statement: StatementId) {
        self.statements.remove(&statement);
    }

    fn escape(&self, text: &str) -> String {
        text.replace('\'', "''")
    }

    fn last_error(&self) -> Option<ClientErrorInfo> {
        self.last_error.clone()
    }

    fn begin_statement(&self) -> &'static str {
        "BEGIN"
    }
}

fn to_sqlite(value: Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Int(v) => SqliteValue::Integer(i64::from(v)),
        Value::BigInt(v) => SqliteValue::Integer(v),
        Value::Double(v) => SqliteValue::Real(v),
        Value::Text(s) => SqliteValue::Text(s),
        Value::Bytes(b) => SqliteValue::Blob(b),
    }
}

/// Run a statement, classifying it by whether it yields result columns.
fn run_statement(
    conn: &rusqlite::Connection,
    stmt: &mut Statement<'_>,
    params: Vec<SqliteValue>,
) -> Result<RawOutcome, PooledSqlError> {
    if stmt.column_count() == 0 {
        let affected_rows = stmt.execute(params_from_iter(params))? as u64;
        let last_insert_id = u64::try_from(conn.last_insert_rowid()).unwrap_or(0);
        return Ok(RawOutcome::Affected {
            affected_rows,
            last_insert_id,
        });
    }

    let columns: Vec<ColumnMeta> = stmt
        .columns()
        .iter()
        .map(|column| {
            let (field_type, binary) = field_type_for(column.decl_type());
            ColumnMeta::new(column.name(), field_type, binary)
        })
        .collect();

    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.query(params_from_iter(params))?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(width);
        for idx in 0..width {
            cells.push(wire_value(row.get_ref(idx)?));
        }
        rows.push(cells);
    }
    Ok(RawOutcome::Rows { columns, rows })
}

fn wire_value(value: ValueRef<'_>) -> WireValue {
    match value {
        ValueRef::Null => WireValue::Null,
        ValueRef::Integer(v) => WireValue::Int(v),
        ValueRef::Real(v) => WireValue::Float(v),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => WireValue::Text(s.to_owned()),
            Err(_) => WireValue::Bytes(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => WireValue::Bytes(bytes.to_vec()),
    }
}

/// Map a declared column type onto a field type using `SQLite`'s affinity rules.
fn field_type_for(decl_type: Option<&str>) -> (FieldType, bool) {
    let Some(decl) = decl_type else {
        return (FieldType::Unknown, false);
    };
    let decl = decl.to_ascii_uppercase();
    if decl.contains("INT") {
        let field_type = if decl.contains("BIGINT") || decl.contains("INT8") {
            FieldType::LongLong
        } else if decl.contains("TINYINT") {
            FieldType::Tiny
        } else if decl.contains("SMALLINT") {
            FieldType::Short
        } else if decl.contains("MEDIUMINT") {
            FieldType::Int24
        } else {
            FieldType::Long
        };
        (field_type, false)
    } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
        (FieldType::VarString, false)
    } else if decl.contains("BLOB") || decl.contains("BINARY") {
        (FieldType::Blob, true)
    } else if decl.contains("REAL") || decl.contains("DOUB") {
        (FieldType::Double, false)
    } else if decl.contains("FLOA") {
        (FieldType::Float, false)
    } else if decl.contains("DEC") || decl.contains("NUMERIC") {
        (FieldType::Decimal, false)
    } else {
        (FieldType::Other, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_session() -> SqliteSession {
        let mut session = SqliteSession::default();
        session
            .connect(&ConnectionConfig::sqlite(":memory:"))
            .unwrap();
        session
    }

    #[test]
    fn declared_types_follow_affinity() {
        assert_eq!(field_type_for(Some("BIGINT")).0, FieldType::LongLong);
        assert_eq!(field_type_for(Some("integer")).0, FieldType::Long);
        assert_eq!(field_type_for(Some("VARCHAR(20)")).0, FieldType::VarString);
        assert_eq!(field_type_for(Some("BLOB")), (FieldType::Blob, true));
        assert_eq!(field_type_for(Some("DOUBLE PRECISION")).0, FieldType::Double);
        assert_eq!(field_type_for(Some("DECIMAL(10,2)")).0, FieldType::Decimal);
        assert_eq!(field_type_for(Some("DATETIME")).0, FieldType::Other);
        assert_eq!(field_type_for(None).0, FieldType::Unknown);
    }

    #[test]
    fn statements_without_columns_report_affected_rows() {
        let mut session = memory_session();
        session
            .run_query("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        let outcome = session
            .run_query("INSERT INTO t (name) VALUES ('a'), ('b')")
            .unwrap();
        assert_eq!(
            outcome,
            RawOutcome::Affected {
                affected_rows: 2,
                last_insert_id: 2
            }
        );
    }

    #[test]
    fn failed_statement_sets_last_error() {
        let mut session = memory_session();
        assert!(session.run_query("SELEC nonsense").is_err());
        let info = session.last_error().unwrap();
        assert_ne!(info.code, 0);
        assert!(session.run_query("SELECT 1").is_ok());
        assert!(session.last_error().is_none());
    }

    #[test]
    fn closed_session_fails_ping_and_queries() {
        let mut session = memory_session();
        assert!(session.ping());
        session.close();
        assert!(!session.ping());
        assert!(matches!(
            session.run_query("SELECT 1"),
            Err(PooledSqlError::ConnectionFailure(_))
        ));
    }

    #[test]
    fn escape_doubles_quotes() {
        assert_eq!(SqliteSession::default().escape("O'Brien"), "O''Brien");
    }
}
