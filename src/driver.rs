//! The driver surface queries execute against.
//!
//! A driver adapter provides a [`Connection`] that hands out [`Cursor`]s. The connection
//! declares its placeholder style either directly through [`Connection::paramstyle`] or by
//! having its module (or a parent module) registered with [`register_paramstyle`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use crate::error::{BoxedDriverError, EmbraceError};
use crate::results::Row;
use crate::translation::PlaceholderStyle;
use crate::types::BindParams;

/// A cursor owned by one query execution.
pub trait Cursor {
    /// Execute one statement with its compiled parameters.
    ///
    /// # Errors
    /// Returns the driver's own error; the dispatcher re-homes it.
    fn execute(&mut self, sql: &str, params: &BindParams) -> Result<(), BoxedDriverError>;

    /// Fetch the next row of the last executed statement, `None` once exhausted.
    ///
    /// # Errors
    /// Returns the driver's own error.
    fn fetch_one(&mut self) -> Result<Option<Row>, BoxedDriverError>;

    /// Rows affected by the last statement, or -1 when the driver can't tell.
    fn rowcount(&self) -> i64;

    /// Column names of the last executed statement, `None` when it returned no rows.
    fn description(&self) -> Option<Arc<Vec<String>>>;
}

/// A live database connection.
pub trait Connection {
    type Cursor<'c>: Cursor + 'c
    where
        Self: 'c;

    /// Open a cursor borrowing this connection.
    ///
    /// # Errors
    /// Returns the driver's own error.
    fn cursor(&mut self) -> Result<Self::Cursor<'_>, BoxedDriverError>;

    /// The placeholder style this connection expects, if it declares one itself.
    fn paramstyle(&self) -> Option<PlaceholderStyle> {
        None
    }
}

type StyleMap = HashMap<String, PlaceholderStyle>;

static REGISTERED_STYLES: LazyLock<Mutex<StyleMap>> = LazyLock::new(|| Mutex::new(HashMap::new()));
static KNOWN_STYLES: LazyLock<Mutex<HashMap<&'static str, PlaceholderStyle>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        // Clear the poison and continue with the recovered data
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Declare the placeholder style for every connection type defined in `module_path`
/// or any module nested below it.
///
/// ```rust
/// use sql_embrace::prelude::*;
///
/// register_paramstyle(module_path!(), PlaceholderStyle::Numeric);
/// ```
pub fn register_paramstyle(module_path: &str, style: PlaceholderStyle) {
    lock(&REGISTERED_STYLES).insert(module_path.to_string(), style);
    // Cached resolutions may now be stale.
    lock(&KNOWN_STYLES).clear();
}

/// Resolve the placeholder style for `conn`.
///
/// The connection's own declaration wins. Otherwise the connection type's module path is
/// walked from the defining module up through its parents, and the first registered style
/// is cached for the type.
///
/// # Errors
/// Returns `EmbraceError::UnknownParamStyle` if no style can be found.
pub fn get_param_style<C: Connection + ?Sized>(conn: &C) -> Result<PlaceholderStyle, EmbraceError> {
    if let Some(style) = conn.paramstyle() {
        return Ok(style);
    }

    let type_name = std::any::type_name::<C>();
    if let Some(style) = lock(&KNOWN_STYLES).get(type_name) {
        return Ok(*style);
    }

    let base = type_name.split('<').next().unwrap_or(type_name);
    let mut module = base.rsplit_once("::").map(|(module, _)| module);
    let registered = lock(&REGISTERED_STYLES);
    while let Some(path) = module {
        if let Some(style) = registered.get(path) {
            lock(&KNOWN_STYLES).insert(type_name, *style);
            return Ok(*style);
        }
        module = path.rsplit_once("::").map(|(parent, _)| parent);
    }

    Err(EmbraceError::UnknownParamStyle(type_name.to_string()))
}
