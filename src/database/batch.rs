use tracing::debug;

use crate::error::PooledSqlError;
use crate::types::Value;

use super::Database;

impl Database {
    /// Insert many rows with one multi-row `INSERT`, prepared and executed once.
    ///
    /// Values are bound row-major. Returns the affected-row count; an empty
    /// `rows` returns `0` without touching the database.
    ///
    /// # Errors
    /// Returns [`PooledSqlError::ParameterError`] when `columns` is empty or a row's
    /// width differs from `columns`, plus any checkout or client error.
    pub fn batch_insert(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Value>],
    ) -> Result<u64, PooledSqlError> {
        if rows.is_empty() {
            return Ok(0);
        }
        if columns.is_empty() {
            return Err(PooledSqlError::ParameterError(
                "batch insert needs at least one column".into(),
            ));
        }
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(PooledSqlError::ParameterError(format!(
                "row {index} has {} values, expected {}",
                row.len(),
                columns.len()
            )));
        }

        let sql = insert_sql(table, columns, rows.len());
        debug!(table, rows = rows.len(), "batch insert");
        let conn = self.pool().acquire()?;
        let mut stmt = conn.prepare(&sql)?;
        for row in rows {
            stmt.bind_all(row);
        }
        stmt.execute_update()
    }
}

fn insert_sql(table: &str, columns: &[&str], row_count: usize) -> String {
    let group = format!("({})", vec!["?"; columns.len()].join(", "));
    let groups = vec![group.as_str(); row_count].join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES {groups}",
        columns.join(", ")
    )
}
