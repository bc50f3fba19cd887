use std::collections::VecDeque;
use std::sync::Arc;

use super::row::Row;
use crate::types::DbValue;

/// Rows buffered from a driver that cannot stream them one at a time.
///
/// Drained front to back by a cursor's `fetch_one`.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    rows: VecDeque<Row>,
    /// The number of rows affected (for DML statements), -1 when not applicable
    pub rows_affected: i64,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<Arc<Vec<String>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            rows: VecDeque::with_capacity(capacity),
            rows_affected: -1,
            column_names: None,
        }
    }

    /// A result set for a statement that returns no rows.
    #[must_use]
    pub fn affected(rows_affected: i64) -> ResultSet {
        ResultSet {
            rows: VecDeque::new(),
            rows_affected,
            column_names: None,
        }
    }

    /// Build a result set from column names and row values in one go.
    pub fn from_rows<I, R>(column_names: &[&str], rows: I) -> ResultSet
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = DbValue>,
    {
        let mut result_set = ResultSet::with_capacity(0);
        result_set.set_column_names(Arc::new(
            column_names.iter().map(|c| (*c).to_string()).collect(),
        ));
        for row in rows {
            result_set.add_row_values(row.into_iter().collect());
        }
        result_set
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the result set. Ignored until column names are set.
    pub fn add_row_values(&mut self, row_values: Vec<DbValue>) {
        if let Some(column_names) = &self.column_names {
            self.rows.push_back(Row::new(Arc::clone(column_names), row_values));
        }
    }

    /// Remove and return the next buffered row.
    pub fn pop_front(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
