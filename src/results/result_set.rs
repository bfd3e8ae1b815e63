use std::collections::HashMap;
use std::ops::Index;
use std::sync::Arc;

use crate::client::ColumnMeta;
use crate::types::Value;

use super::row::{Row, build_column_index};

/// A result set from a database query
///
/// Rows are immutable once the set is built; column metadata is kept alongside
/// for callers that need declared types or observed lengths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    rows: Vec<Row>,
    columns: Vec<ColumnMeta>,
}

impl ResultSet {
    #[must_use]
    pub fn new(rows: Vec<Row>, columns: Vec<ColumnMeta>) -> Self {
        Self { rows, columns }
    }

    /// Build a result set from decoded row values sharing one column lookup table.
    #[must_use]
    pub fn from_values(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> Self {
        let names: Arc<Vec<String>> =
            Arc::new(columns.iter().map(|c| c.name.clone()).collect());
        let index: Arc<HashMap<String, usize>> = Arc::new(build_column_index(&names));
        let rows = rows
            .into_iter()
            .map(|values| Row::with_index(Arc::clone(&names), Arc::clone(&index), values))
            .collect();
        Self { rows, columns }
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    #[must_use]
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl Index<usize> for ResultSet {
    type Output = Row;

    fn index(&self, index: usize) -> &Row {
        &self.rows[index]
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
