//! `use pooled_sql::prelude::*;` brings in the database handle, pool, config,
//! statement and result types, [`Value`] and the `sql_params!` macro.

pub use crate::config::{ConnectionConfig, ConnectionConfigBuilder};
pub use crate::connection::Connection;
pub use crate::database::{Database, Transaction, TransactionState};
pub use crate::dispatcher::Deferred;
pub use crate::error::PooledSqlError;
pub use crate::pool::{ConnectionPool, PoolStatus, PooledConnection};
pub use crate::results::{QueryResult, ResultSet, Row};
pub use crate::sql_params;
pub use crate::statement::PreparedStatement;
pub use crate::types::{Backend, FromValue, Value};
