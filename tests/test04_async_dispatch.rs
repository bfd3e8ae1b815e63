#![cfg(feature = "sqlite")]

mod common;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use pooled_sql::prelude::*;

use common::{count_rows, sqlite_db};

#[test]
fn failing_async_query_reports_statement_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = sqlite_db(&dir, 1, 2);
    let pending = db.query_async("SELECT * FROM table_that_does_not_exist");
    match pending.wait() {
        Err(PooledSqlError::StatementError { code, message }) => {
            assert_ne!(code, 0);
            assert!(message.contains("table_that_does_not_exist"));
        }
        other => panic!("expected statement error, got {other:?}"),
    }
    assert_eq!(db.pool().status().checked_out, 0);
}

#[test]
fn async_writes_all_land() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let db = sqlite_db(&dir, 2, 4);
    db.execute("CREATE TABLE hits (n INTEGER)")?;

    let pending: Vec<Deferred<u64>> = (0..20)
        .map(|n| db.execute_async(format!("INSERT INTO hits VALUES ({n})")))
        .collect();
    for deferred in pending {
        assert_eq!(deferred.wait()?, 1);
    }
    assert_eq!(count_rows(&db, "hits"), 20);

    let filtered = db
        .query_async_with("SELECT n FROM hits WHERE n < ? ORDER BY n", sql_params![3])
        .wait()?;
    assert_eq!(filtered.len(), 3);
    assert_eq!(filtered[2].get("n"), Some(&Value::Int(2)));
    Ok(())
}

#[test]
fn try_take_eventually_yields() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let db = sqlite_db(&dir, 1, 1);
    let mut pending = db.query_async("SELECT 42 AS answer");
    let result = loop {
        match pending.try_take() {
            Ok(outcome) => break outcome?,
            Err(still_running) => {
                pending = still_running;
                std::thread::yield_now();
            }
        }
    };
    assert_eq!(result[0].get("answer"), Some(&Value::Int(42)));
    Ok(())
}

#[tokio::test]
async fn deferred_results_can_be_awaited() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let db = sqlite_db(&dir, 1, 2);
    let created = db.execute_async("CREATE TABLE t (v TEXT)").await?;
    assert_eq!(created, 0);
    db.execute_async("INSERT INTO t VALUES ('awaited')").await?;
    let rows = db.query_async("SELECT v FROM t").await?;
    assert_eq!(rows[0].get_as::<String>("v")?, "awaited");
    Ok(())
}

#[test]
fn shutdown_rejects_new_work() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let db = sqlite_db(&dir, 1, 1);
    let queued = db.query_async("SELECT 1");
    db.shutdown();
    assert!(matches!(
        queued.wait(),
        Ok(_) | Err(PooledSqlError::PoolStopped)
    ));
    assert!(matches!(
        db.query_async("SELECT 1").wait(),
        Err(PooledSqlError::DispatcherStopped)
    ));
    assert!(matches!(db.query("SELECT 1"), Err(PooledSqlError::PoolStopped)));
    db.shutdown();
    Ok(())
}

#[test]
fn drop_with_held_connection_and_queued_task_returns() {
    let dir = tempfile::tempdir().unwrap();
    let (done_tx, done_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let db = sqlite_db(&dir, 1, 1);
        let tx = db.begin_transaction().unwrap();
        let queued = db.query_async("SELECT 1");
        // give a worker time to block on the exhausted pool
        thread::sleep(Duration::from_millis(50));
        drop(db);
        let outcome = queued.wait();
        drop(tx);
        done_tx.send(outcome.map(|_| ())).unwrap();
    });

    let outcome = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("database drop must not wait on a held connection");
    assert!(matches!(outcome, Err(PooledSqlError::PoolStopped)));
    handle.join().unwrap();
}
