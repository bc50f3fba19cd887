use std::sync::Arc;

use tracing::debug;

use crate::driver::{Connection, Cursor};
use crate::error::BoxedDriverError;
use crate::results::{ResultSet, Row};
use crate::translation::PlaceholderStyle;
use crate::types::BindParams;

use super::error::SqliteError;
use super::params::bind_params;
use super::query::build_result_set;

/// Cursor over a `rusqlite` connection. Each statement's rows are buffered when it executes.
pub struct SqliteCursor<'c> {
    conn: &'c rusqlite::Connection,
    result: ResultSet,
    rowcount: i64,
}

impl<'c> SqliteCursor<'c> {
    #[must_use]
    pub fn new(conn: &'c rusqlite::Connection) -> Self {
        Self {
            conn,
            result: ResultSet::with_capacity(0),
            rowcount: -1,
        }
    }

    /// Rows not yet fetched from the last statement.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.result.len()
    }
}

impl Cursor for SqliteCursor<'_> {
    fn execute(&mut self, sql: &str, params: &BindParams) -> Result<(), BoxedDriverError> {
        let mut stmt = self.conn.prepare(sql).map_err(SqliteError::boxed)?;
        bind_params(&mut stmt, params).map_err(SqliteError::boxed)?;
        let readonly = stmt.readonly();
        self.result = build_result_set(&mut stmt).map_err(SqliteError::boxed)?;
        self.rowcount = if readonly {
            -1
        } else {
            i64::try_from(self.conn.changes()).unwrap_or(i64::MAX)
        };
        debug!(rows = self.result.len(), rowcount = self.rowcount, "sqlite statement done");
        Ok(())
    }

    fn fetch_one(&mut self) -> Result<Option<Row>, BoxedDriverError> {
        Ok(self.result.pop_front())
    }

    fn rowcount(&self) -> i64 {
        self.rowcount
    }

    fn description(&self) -> Option<Arc<Vec<String>>> {
        self.result.get_column_names().cloned()
    }
}

impl Connection for rusqlite::Connection {
    type Cursor<'c>
        = SqliteCursor<'c>
    where
        Self: 'c;

    fn cursor(&mut self) -> Result<SqliteCursor<'_>, BoxedDriverError> {
        Ok(SqliteCursor::new(self))
    }

    fn paramstyle(&self) -> Option<PlaceholderStyle> {
        Some(PlaceholderStyle::Qmark)
    }
}
