#![allow(dead_code)]

use std::sync::Arc;

use pooled_sql::prelude::*;
use pooled_sql::test_utils::{Faults, FaultyDriver};
use tempfile::TempDir;

/// `SQLite` config pointing at a fresh file inside `dir`.
pub fn sqlite_config(dir: &TempDir, pool_size: usize, max_pool_size: usize) -> ConnectionConfig {
    ConnectionConfig::builder()
        .backend(Backend::Sqlite)
        .database(dir.path().join("test.db").to_string_lossy())
        .pool_size(pool_size)
        .max_pool_size(max_pool_size)
        .worker_threads(2)
        .finish()
}

pub fn sqlite_db(dir: &TempDir, pool_size: usize, max_pool_size: usize) -> Database {
    Database::new(sqlite_config(dir, pool_size, max_pool_size)).expect("sqlite database")
}

/// Database whose sessions go through a [`FaultyDriver`].
pub fn faulty_db(config: ConnectionConfig) -> (Database, Arc<Faults>) {
    let driver = FaultyDriver::sqlite();
    let faults = driver.faults();
    let db = Database::with_driver(config, Arc::new(driver)).expect("faulty database");
    (db, faults)
}

pub fn faulty_pool(config: ConnectionConfig) -> (ConnectionPool, Arc<Faults>) {
    let driver = FaultyDriver::sqlite();
    let faults = driver.faults();
    let pool = ConnectionPool::with_driver(config, Arc::new(driver)).expect("faulty pool");
    (pool, faults)
}

pub fn count_rows(db: &Database, table: &str) -> i64 {
    let result = db
        .query(&format!("SELECT COUNT(*) AS n FROM {table}"))
        .expect("count query");
    result[0]
        .get("n")
        .and_then(Value::as_i64)
        .expect("integer count")
}
