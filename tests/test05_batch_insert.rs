#![cfg(feature = "sqlite")]

mod common;

use pooled_sql::prelude::*;

use common::{count_rows, faulty_db, sqlite_config};

#[test]
fn batch_insert_runs_one_statement() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let (db, faults) = faulty_db(sqlite_config(&dir, 1, 1));
    db.execute("CREATE TABLE people (id INTEGER, name TEXT, score DOUBLE)")?;

    faults.reset_counters();
    let affected = db.batch_insert(
        "people",
        &["id", "name", "score"],
        &[sql_params![1, "ann", 9.5], sql_params![2, "bo", None::<f64>]],
    )?;
    assert_eq!(affected, 2);
    assert_eq!(faults.executions(), 1);
    assert_eq!(faults.prepares(), 1);

    let rows = db.query("SELECT id, name, score FROM people ORDER BY id")?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("score"), Some(&Value::Double(9.5)));
    assert_eq!(rows[1].get("name"), Some(&Value::Text("bo".into())));
    assert_eq!(rows[1].get("score"), Some(&Value::Null));
    Ok(())
}

#[test]
fn empty_batch_touches_nothing() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let (db, faults) = faulty_db(sqlite_config(&dir, 1, 1));
    faults.reset_counters();
    assert_eq!(db.batch_insert("missing_table", &["a"], &[])?, 0);
    assert_eq!(faults.executions(), 0);
    assert_eq!(faults.prepares(), 0);
    Ok(())
}

#[test]
fn malformed_batches_are_rejected() -> Result<(), PooledSqlError> {
    let dir = tempfile::tempdir().unwrap();
    let (db, faults) = faulty_db(sqlite_config(&dir, 1, 1));
    db.execute("CREATE TABLE pairs (a INTEGER, b INTEGER)")?;
    faults.reset_counters();

    assert!(matches!(
        db.batch_insert("pairs", &[], &[sql_params![1]]),
        Err(PooledSqlError::ParameterError(_))
    ));
    assert!(matches!(
        db.batch_insert("pairs", &["a", "b"], &[sql_params![1, 2], sql_params![3]]),
        Err(PooledSqlError::ParameterError(msg)) if msg.contains("row 1")
    ));
    assert_eq!(faults.executions(), 0);
    assert_eq!(count_rows(&db, "pairs"), 0);
    Ok(())
}
