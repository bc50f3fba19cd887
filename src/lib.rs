//! Annotated SQL templates with driver-independent bind parameters and join-aware
//! row hydration.
//!
//! Queries are written once with symbolic placeholders (`:id`, `:t:ids`, `:i:table`) and
//! compiled for whichever placeholder style the connection's driver expects. A query
//! declares how its result is consumed (`:one`, `:many`, `:scalar`, ...) and can map rows
//! into object graphs through [`mapping::Returning`].
//!
//! ```rust,no_run
//! use sql_embrace::prelude::*;
//!
//! # fn demo() -> Result<(), EmbraceError> {
//! let mut conn = SqliteOptions::new(":memory:".into()).with_wal(false).open()?;
//! let queries = Queries::from_text(
//!     "-- :name user_names :column\nSELECT name FROM users WHERE id IN :t:ids",
//! )?;
//! let args = bind_args! { "ids" => BindValue::list([1, 2, 3]) };
//! if let Some(query) = queries.get("user_names") {
//!     for name in query.bind(&mut conn).args(&args).column()? {
//!         println!("{:?}", name?.into_value());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod error;
pub mod mapping;
pub mod prelude;
pub mod query;
pub mod results;
pub mod template;
pub mod translation;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use rusqlite;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::{EmbraceError, ErrorClass};
pub use query::{Query, ResultShape};
pub use translation::{PlaceholderStyle, compile_bind_parameters};
pub use types::{BindArgs, BindValue, DbValue};
