//! `SQLite` backend built on `rusqlite`.
//!
//! `rusqlite::Connection` implements [`Connection`](crate::driver::Connection) with the
//! `qmark` placeholder style:
//! - config: opening connections
//! - params: `DbValue` to `SQLite` value conversion and binding
//! - query: result extraction
//! - cursor: the buffered cursor handed to the dispatcher
//! - error: `rusqlite` failures classified for re-homing

pub mod config;
pub mod cursor;
pub mod error;
pub mod params;
pub mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use cursor::SqliteCursor;
pub use error::SqliteError;
