use std::time::Duration;

use crate::error::{EmbraceError, rehome};

use super::error::SqliteError;

/// Options for opening a `SQLite` connection.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    pub wal: bool,
    pub busy_timeout: Option<Duration>,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            wal: true,
            busy_timeout: None,
        }
    }

    #[must_use]
    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    /// Open the database. `:memory:` opens a private in-memory database.
    ///
    /// # Errors
    /// Returns the re-homed `rusqlite` error (usually an `OperationalError`).
    pub fn open(&self) -> Result<rusqlite::Connection, EmbraceError> {
        let conn = if self.db_path == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&self.db_path)
        }
        .map_err(sqlite_error)?;

        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout).map_err(sqlite_error)?;
        }
        if self.wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")
                .map_err(sqlite_error)?;
        }
        Ok(conn)
    }
}

fn sqlite_error(err: rusqlite::Error) -> EmbraceError {
    rehome(SqliteError::boxed(err))
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// # Errors
    /// As for [`SqliteOptions::open`].
    pub fn open(self) -> Result<rusqlite::Connection, EmbraceError> {
        self.finish().open()
    }
}
