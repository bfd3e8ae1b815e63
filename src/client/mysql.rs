use std::collections::HashMap;

use mysql_async::consts::ColumnType;
use mysql_async::prelude::Queryable;
use mysql_async::{Column, Conn, OptsBuilder, Params};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::error::PooledSqlError;
use crate::marshal::BindSlot;
use crate::types::Value;

use super::{
    ClientErrorInfo, ClientSession, ColumnMeta, Driver, FieldType, RawOutcome, StatementId,
    StatementInfo, WireValue,
};

/// Character set number the server reports for binary columns.
const BINARY_CHARSET: u16 = 63;

/// Driver for `MySQL` servers through `mysql_async`.
///
/// Each session owns a current-thread runtime and blocks on it, so sessions must
/// not be driven from inside another tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDriver;

impl Driver for MysqlDriver {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn open_session(
        &self,
        _config: &ConnectionConfig,
    ) -> Result<Box<dyn ClientSession>, PooledSqlError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                PooledSqlError::ConnectionFailure(format!("failed to build client runtime: {e}"))
            })?;
        Ok(Box::new(MysqlSession {
            runtime,
            conn: None,
            statements: HashMap::new(),
            next_statement: 0,
            last_error: None,
        }))
    }
}

pub struct MysqlSession {
    runtime: Runtime,
    conn: Option<Conn>,
    statements: HashMap<StatementId, mysql_async::Statement>,
    next_statement: u64,
    last_error: Option<ClientErrorInfo>,
}

fn not_open() -> PooledSqlError {
    PooledSqlError::ConnectionFailure("mysql session is not open".into())
}

impl MysqlSession {
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
}

impl ClientSession for MysqlSession {
    fn connect(&mut self, config: &ConnectionConfig) -> Result<(), PooledSqlError> {
        self.close();
        config.validate()?;
        let opts = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .user(Some(config.user.clone()).filter(|u| !u.is_empty()))
            .pass(Some(config.password.clone()).filter(|p| !p.is_empty()))
            .db_name(Some(config.database.clone()).filter(|d| !d.is_empty()));
        let timeout = config.connection_timeout;
        let charset = config.charset.clone();

        let conn = self.runtime.block_on(async move {
            let mut conn = tokio::time::timeout(timeout, Conn::new(opts))
                .await
                .map_err(|_| {
                    PooledSqlError::ConnectionFailure(format!(
                        "connect timed out after {timeout:?}"
                    ))
                })?
                .map_err(|e| PooledSqlError::ConnectionFailure(e.to_string()))?;
            conn.query_drop(format!("SET NAMES {charset}")).await?;
            Ok::<_, PooledSqlError>(conn)
        });
        let conn = self.record(conn)?;
        debug!(host = %config.host, port = config.port, "mysql session connected");
        self.conn = Some(conn);
        Ok(())
    }

    fn close(&mut self) {
        self.statements.clear();
        if let Some(conn) = self.conn.take() {
            if let Err(err) = self.runtime.block_on(conn.disconnect()) {
                warn!(error = %err, "mysql disconnect failed");
            }
        }
    }

    fn ping(&mut self) -> bool {
        match self.conn.as_mut() {
            Some(conn) => self.runtime.block_on(conn.ping()).is_ok(),
            None => false,
        }
    }

    fn run_query(&mut self, sql: &str) -> Result<RawOutcome, PooledSqlError> {
        let outcome = match self.conn.as_mut() {
            Some(conn) => self.runtime.block_on(text_query(conn, sql)),
            None => Err(not_open()),
        };
        self.record(outcome)
    }

    fn prepare(&mut self, sql: &str) -> Result<StatementInfo, PooledSqlError> {
        let prepared = match self.conn.as_mut() {
            Some(conn) => self
                .runtime
                .block_on(conn.prep(sql))
                .map_err(PooledSqlError::from),
            None => Err(not_open()),
        };
        let prepared = self.record(prepared)?;
        self.next_statement += 1;
        let id = StatementId(self.next_statement);
        let param_count = usize::from(prepared.num_params());
        self.statements.insert(id, prepared);
        Ok(StatementInfo { id, param_count })
    }

    fn bind_and_execute(
        &mut self,
        statement: StatementId,
        params: &[BindSlot],
    ) -> Result<RawOutcome, PooledSqlError> {
        let outcome = (|| -> Result<RawOutcome, PooledSqlError> {
            let prepared = self.statements.get(&statement).ok_or_else(|| {
                PooledSqlError::statement(0, format!("unknown statement handle {}", statement.0))
            })?;
            let values = params
                .iter()
                .map(|slot| slot.to_value().map(to_mysql))
                .collect::<Result<Vec<_>, _>>()?;
            let params = if values.is_empty() {
                Params::Empty
            } else {
                Params::Positional(values)
            };
            let conn = self.conn.as_mut().ok_or_else(not_open)?;
            self.runtime.block_on(binary_query(conn, prepared, params))
        })();
        self.record(outcome)
    }

    fn reset_statement(&mut self, statement: StatementId) -> Result<(), PooledSqlError> {
        // the binary protocol rebinds every parameter on each execution
        if self.statements.contains_key(&statement) {
            Ok(())
        } else {
            Err(PooledSqlError::statement(
                0,
                format!("unknown statement handle {}", statement.0),
            ))
        }
    }

    fn close_statement(&mut self, statement: StatementId) {
        let Some(prepared) = self.statements.remove(&statement) else {
            return;
        };
        if let Some(conn) = self.conn.as_mut() {
            if let Err(err) = self.runtime.block_on(conn.close(prepared)) {
                debug!(error = %err, "failed to close mysql statement");
            }
        }
    }

    fn escape(&self, text: &str) -> String {
        escape_mysql(text)
    }

    fn last_error(&self) -> Option<ClientErrorInfo> {
        self.last_error.clone()
    }
}

impl Drop for MysqlSession {
    fn drop(&mut self) {
        self.close();
    }
}

async fn text_query(conn: &mut Conn, sql: &str) -> Result<RawOutcome, PooledSqlError> {
    let mut result = conn.query_iter(sql).await?;
    let columns: Vec<ColumnMeta> = result.columns_ref().iter().map(column_meta).collect();
    let rows: Vec<mysql_async::Row> = result.collect().await?;
    result.drop_result().await?;
    Ok(finish(conn, columns, rows))
}

async fn binary_query(
    conn: &mut Conn,
    prepared: &mysql_async::Statement,
    params: Params,
) -> Result<RawOutcome, PooledSqlError> {
    let mut result = conn.exec_iter(prepared, params).await?;
    let columns: Vec<ColumnMeta> = result.columns_ref().iter().map(column_meta).collect();
    let rows: Vec<mysql_async::Row> = result.collect().await?;
    result.drop_result().await?;
    Ok(finish(conn, columns, rows))
}

fn finish(conn: &Conn, columns: Vec<ColumnMeta>, rows: Vec<mysql_async::Row>) -> RawOutcome {
    if columns.is_empty() {
        return RawOutcome::Affected {
            affected_rows: conn.affected_rows(),
            last_insert_id: conn.last_insert_id().unwrap_or(0),
        };
    }
    let width = columns.len();
    let rows = rows
        .into_iter()
        .map(|mut row| {
            (0..width)
                .map(|idx| {
                    row.take::<mysql_async::Value, usize>(idx)
                        .map_or(WireValue::Null, wire_value)
                })
                .collect()
        })
        .collect();
    RawOutcome::Rows { columns, rows }
}

fn column_meta(column: &Column) -> ColumnMeta {
    let field_type = match column.column_type() {
        ColumnType::MYSQL_TYPE_TINY => FieldType::Tiny,
        ColumnType::MYSQL_TYPE_SHORT => FieldType::Short,
        ColumnType::MYSQL_TYPE_INT24 => FieldType::Int24,
        ColumnType::MYSQL_TYPE_LONG => FieldType::Long,
        ColumnType::MYSQL_TYPE_LONGLONG => FieldType::LongLong,
        ColumnType::MYSQL_TYPE_FLOAT => FieldType::Float,
        ColumnType::MYSQL_TYPE_DOUBLE => FieldType::Double,
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => FieldType::Decimal,
        ColumnType::MYSQL_TYPE_STRING => FieldType::String,
        ColumnType::MYSQL_TYPE_VAR_STRING | ColumnType::MYSQL_TYPE_VARCHAR => {
            FieldType::VarString
        }
        ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB
        | ColumnType::MYSQL_TYPE_BLOB => FieldType::Blob,
        ColumnType::MYSQL_TYPE_NULL => FieldType::Null,
        _ => FieldType::Other,
    };
    ColumnMeta::new(
        column.name_str(),
        field_type,
        column.character_set() == BINARY_CHARSET,
    )
}

fn wire_value(value: mysql_async::Value) -> WireValue {
    use mysql_async::Value as My;
    match value {
        My::NULL => WireValue::Null,
        My::Int(v) => WireValue::Int(v),
        My::UInt(v) => WireValue::UInt(v),
        My::Float(v) => WireValue::Float(f64::from(v)),
        My::Double(v) => WireValue::Float(v),
        My::Bytes(b) => WireValue::Bytes(b),
        My::Date(year, month, day, hour, minute, second, micros) => WireValue::Text(format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
        )),
        My::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let hours = days * 24 + u32::from(hours);
            WireValue::Text(format!(
                "{sign}{hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
            ))
        }
    }
}

fn to_mysql(value: Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Int(v) => mysql_async::Value::Int(i64::from(v)),
        Value::BigInt(v) => mysql_async::Value::Int(v),
        Value::Double(v) => mysql_async::Value::Double(v),
        Value::Text(s) => mysql_async::Value::Bytes(s.into_bytes()),
        Value::Bytes(b) => mysql_async::Value::Bytes(b),
    }
}

/// Escape the characters `MySQL` treats specially inside a quoted literal.
fn escape_mysql(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\x1a' => escaped.push_str("\\Z"),
            other => escaped.push(other),
        }
    }
    escaped
}
