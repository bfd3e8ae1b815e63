use std::ops::Index;

use super::result_set::ResultSet;
use super::row::Row;

/// Outcome of one statement execution.
///
/// Row-producing statements fill [`QueryResult::rows`]; for everything else the
/// rows are empty and `affected_rows` / `last_insert_id` carry the outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    rows: ResultSet,
    affected_rows: u64,
    last_insert_id: u64,
}

impl QueryResult {
    #[must_use]
    pub fn new(rows: ResultSet, affected_rows: u64, last_insert_id: u64) -> Self {
        Self {
            rows,
            affected_rows,
            last_insert_id,
        }
    }

    #[must_use]
    pub fn from_rows(rows: ResultSet) -> Self {
        Self::new(rows, 0, 0)
    }

    #[must_use]
    pub fn from_affected(affected_rows: u64, last_insert_id: u64) -> Self {
        Self::new(ResultSet::default(), affected_rows, last_insert_id)
    }

    #[must_use]
    pub fn rows(&self) -> &ResultSet {
        &self.rows
    }

    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    #[must_use]
    pub fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> ResultSet {
        self.rows
    }
}

impl Index<usize> for QueryResult {
    type Output = Row;

    fn index(&self, index: usize) -> &Row {
        &self.rows[index]
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
