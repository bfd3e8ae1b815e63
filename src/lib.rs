//! Blocking connection pool, typed prepared statements and a worker-thread
//! dispatcher over `SQLite` (`rusqlite`) and `MySQL` (`mysql_async`) clients.
//!
//! - [`Database`] bundles a [`ConnectionPool`] with a [`Dispatcher`] and is the
//!   usual entry point.
//! - [`Value`] is the parameter and result model; [`sql_params!`] builds
//!   parameter lists from plain Rust values.
//! - [`PreparedStatement`] binds positionally and decodes results by declared
//!   column type.
//! - [`Transaction`] rolls back when dropped uncommitted.
//!
//! ```rust,no_run
//! use pooled_sql::prelude::*;
//!
//! # fn main() -> Result<(), PooledSqlError> {
//! let db = Database::new(ConnectionConfig::sqlite("inventory.db"))?;
//! db.execute("CREATE TABLE IF NOT EXISTS items (id BIGINT, name TEXT)")?;
//!
//! let tx = db.begin_transaction()?;
//! tx.execute_with("INSERT INTO items VALUES (?, ?)", &sql_params![1_i64, "bolt"])?;
//! tx.commit()?;
//!
//! let rows = db.query_with("SELECT name FROM items WHERE id = ?", &sql_params![1_i64])?;
//! assert_eq!(rows[0].get_as::<String>("name")?, "bolt");
//! # Ok(())
//! # }
//! ```

mod macros;

pub mod client;
pub mod config;
pub mod connection;
pub mod database;
pub mod dispatcher;
pub mod error;
pub mod marshal;
pub mod pool;
pub mod prelude;
pub mod results;
pub mod statement;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use client::{ClientSession, ColumnMeta, Driver, FieldType};
pub use config::{ConnectionConfig, ConnectionConfigBuilder};
pub use connection::Connection;
pub use database::{Database, Transaction, TransactionState};
pub use dispatcher::{Deferred, Dispatcher};
pub use error::PooledSqlError;
pub use pool::{ConnectionPool, PoolStatus, PooledConnection};
pub use results::{QueryResult, ResultSet, Row};
pub use statement::PreparedStatement;
pub use types::{Backend, FromValue, Value};
