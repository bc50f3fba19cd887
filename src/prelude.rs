//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::bind_args;
pub use crate::driver::{Connection, Cursor, get_param_style, register_paramstyle};
pub use crate::error::{DatabaseError, DriverError, EmbraceError, ErrorClass};
pub use crate::mapping::{
    Args, Attachment, Entity, Field, FromColumns, Hydrated, MapObject, MappedRows, Record,
    Returning, one_to_many, one_to_one,
};
pub use crate::query::{BoundQuery, ExecOptions, Outcome, Query, ResultShape};
pub use crate::results::{Fetched, ResultSet, Row};
pub use crate::template::{Queries, load_queries};
pub use crate::translation::{CompiledStatement, PlaceholderStyle, compile_bind_parameters};
pub use crate::types::{BindArgs, BindParams, BindValue, DbValue};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteOptionsBuilder};
