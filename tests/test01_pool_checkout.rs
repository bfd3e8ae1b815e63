#![cfg(feature = "sqlite")]

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use pooled_sql::prelude::*;

use common::sqlite_config;

#[test]
fn checkout_never_exceeds_capacity() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::new(sqlite_config(&dir, 1, 3))?;
    let in_use = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let pool = pool.clone();
            let in_use = Arc::clone(&in_use);
            let peak = Arc::clone(&peak);
            thread::spawn(move || -> Result<(), PooledSqlError> {
                for _ in 0..5 {
                    let conn = pool.acquire()?;
                    let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    conn.query("SELECT 1")?;
                    thread::sleep(Duration::from_millis(2));
                    in_use.fetch_sub(1, Ordering::SeqCst);
                }
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread panicked")?;
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    let status = pool.status();
    assert_eq!(status.checked_out, 0);
    assert!(status.total <= 3);
    assert!(status.idle <= 3);
    Ok(())
}

#[test]
fn third_caller_waits_for_a_release() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::new(sqlite_config(&dir, 2, 2))?;
    let first = pool.acquire()?;
    let second = pool.acquire()?;

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || {
            let conn = pool.acquire();
            tx.send(conn.is_ok()).unwrap();
            drop(conn);
        })
    };

    assert!(
        rx.recv_timeout(Duration::from_millis(200)).is_err(),
        "third caller must block while both connections are held"
    );
    drop(first);
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    waiter.join().unwrap();
    drop(second);

    assert_eq!(pool.status().checked_out, 0);
    assert_eq!(pool.size(), 2);
    Ok(())
}

#[test]
fn shutdown_wakes_blocked_callers() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::new(sqlite_config(&dir, 1, 1))?;
    let held = pool.acquire()?;

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || {
            tx.send(pool.acquire().map(|_| ())).unwrap();
        })
    };
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    pool.shutdown();
    let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(matches!(outcome, Err(PooledSqlError::PoolStopped)));
    waiter.join().unwrap();

    // the holder keeps working; its connection is closed on release
    assert!(held.query("SELECT 1").is_ok());
    drop(held);
    assert_eq!(pool.status().total, 0);
    assert!(matches!(pool.acquire(), Err(PooledSqlError::PoolStopped)));
    Ok(())
}

#[test]
fn release_rolls_back_open_transaction() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::new(sqlite_config(&dir, 1, 1))?;
    {
        let conn = pool.acquire()?;
        conn.execute("CREATE TABLE notes (body TEXT)")?;
        conn.begin_transaction()?;
        conn.execute("INSERT INTO notes VALUES ('draft')")?;
        assert!(conn.in_transaction());
    }

    let conn = pool.acquire()?;
    assert!(!conn.in_transaction());
    let rows = conn.query("SELECT COUNT(*) AS n FROM notes")?;
    assert_eq!(rows[0].get("n"), Some(&Value::Int(0)));
    conn.begin_transaction()?;
    conn.rollback()?;
    Ok(())
}

#[test]
fn explicit_release_matches_drop() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::new(sqlite_config(&dir, 1, 1))?;
    let conn = pool.acquire()?;
    assert_eq!(pool.available(), 0);
    pool.release(conn);
    assert_eq!(pool.available(), 1);
    Ok(())
}
