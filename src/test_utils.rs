//! Scripted in-memory connection for exercising queries without a database.

use std::collections::VecDeque;
use std::sync::Arc;

use thiserror::Error;

use crate::driver::{Connection, Cursor};
use crate::error::{BoxedDriverError, DriverError};
use crate::results::{ResultSet, Row};
use crate::translation::PlaceholderStyle;
use crate::types::{BindParams, DbValue};

/// What the next executed statement produces.
#[derive(Debug)]
pub enum MockResponse {
    Rows(ResultSet),
    /// Rows are fetched normally until `after` of them were returned, then the error is raised.
    FailFetch { rows: ResultSet, after: usize, error: MockDriverError },
    Fail(MockDriverError),
}

/// A driver error whose class names are chosen by the test.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct MockDriverError {
    pub classes: Vec<&'static str>,
    pub message: String,
}

impl MockDriverError {
    #[must_use]
    pub fn new(class: &'static str, message: &str) -> Self {
        MockDriverError {
            classes: vec![class, "DatabaseError", "Error"],
            message: message.to_string(),
        }
    }
}

impl DriverError for MockDriverError {
    fn class_names(&self) -> Vec<&str> {
        self.classes.clone()
    }
}

/// Connection replaying scripted responses, one per executed statement.
///
/// Statements executed past the end of the script return no rows and a rowcount of -1.
#[derive(Debug, Default)]
pub struct MockConnection {
    pub paramstyle: Option<PlaceholderStyle>,
    responses: VecDeque<MockResponse>,
    /// Every `(sql, params)` pair executed, in order.
    pub executed: Vec<(String, BindParams)>,
}

impl MockConnection {
    #[must_use]
    pub fn new(style: PlaceholderStyle) -> Self {
        MockConnection {
            paramstyle: Some(style),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_rows<I, R>(mut self, columns: &[&str], rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = DbValue>,
    {
        self.responses
            .push_back(MockResponse::Rows(ResultSet::from_rows(columns, rows)));
        self
    }

    #[must_use]
    pub fn with_affected(mut self, count: i64) -> Self {
        self.responses
            .push_back(MockResponse::Rows(ResultSet::affected(count)));
        self
    }

    #[must_use]
    pub fn with_response(mut self, response: MockResponse) -> Self {
        self.responses.push_back(response);
        self
    }

    /// SQL of every executed statement.
    #[must_use]
    pub fn executed_sql(&self) -> Vec<&str> {
        self.executed.iter().map(|(sql, _)| sql.as_str()).collect()
    }
}

pub struct MockCursor<'c> {
    conn: &'c mut MockConnection,
    current: ResultSet,
    fetched: usize,
    fail_after: Option<(usize, MockDriverError)>,
}

impl Cursor for MockCursor<'_> {
    fn execute(&mut self, sql: &str, params: &BindParams) -> Result<(), BoxedDriverError> {
        self.conn.executed.push((sql.to_string(), params.clone()));
        self.fetched = 0;
        self.fail_after = None;
        self.current = match self.conn.responses.pop_front() {
            None => ResultSet::affected(-1),
            Some(MockResponse::Rows(rows)) => rows,
            Some(MockResponse::FailFetch { rows, after, error }) => {
                self.fail_after = Some((after, error));
                rows
            }
            Some(MockResponse::Fail(error)) => return Err(Box::new(error)),
        };
        Ok(())
    }

    fn fetch_one(&mut self) -> Result<Option<Row>, BoxedDriverError> {
        if let Some((after, error)) = &self.fail_after
            && self.fetched >= *after
        {
            return Err(Box::new(error.clone()));
        }
        self.fetched += 1;
        Ok(self.current.pop_front())
    }

    fn rowcount(&self) -> i64 {
        self.current.rows_affected
    }

    fn description(&self) -> Option<Arc<Vec<String>>> {
        self.current.get_column_names().cloned()
    }
}

impl Connection for MockConnection {
    type Cursor<'c>
        = MockCursor<'c>
    where
        Self: 'c;

    fn cursor(&mut self) -> Result<MockCursor<'_>, BoxedDriverError> {
        Ok(MockCursor {
            conn: self,
            current: ResultSet::affected(-1),
            fetched: 0,
            fail_after: None,
        })
    }

    fn paramstyle(&self) -> Option<PlaceholderStyle> {
        self.paramstyle
    }
}
