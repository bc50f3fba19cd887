use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that can be bound as query parameters or read back from a row.
///
/// The same enum is used by every driver adapter, so mapping code never has to branch on
/// driver-specific types:
/// ```rust
/// use sql_embrace::prelude::*;
///
/// let values = vec![
///     DbValue::Int(1),
///     DbValue::Text("ada".into()),
///     DbValue::Bool(true),
/// ];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DbValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl DbValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let DbValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let DbValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let DbValue::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let DbValue::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let DbValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let DbValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Hashable projection of this value, or `None` when the value has no stable hash
    /// (JSON documents).
    pub(crate) fn hash_key(&self) -> Option<HashableValue> {
        Some(match self {
            DbValue::Int(i) => HashableValue::Int(*i),
            // -0.0 and 0.0 compare equal, so they must share a key
            DbValue::Float(f) => HashableValue::Float(if *f == 0.0 { 0 } else { f.to_bits() }),
            DbValue::Text(s) => HashableValue::Text(s.clone()),
            DbValue::Bool(b) => HashableValue::Bool(*b),
            DbValue::Timestamp(ts) => HashableValue::Timestamp(*ts),
            DbValue::Null => HashableValue::Null,
            DbValue::Blob(b) => HashableValue::Blob(b.clone()),
            DbValue::JSON(_) => return None,
        })
    }
}

/// Textual representation used when a value is spliced into SQL verbatim.
impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbValue::Int(i) => write!(f, "{i}"),
            DbValue::Float(x) => write!(f, "{x}"),
            DbValue::Text(s) => f.write_str(s),
            DbValue::Bool(b) => write!(f, "{b}"),
            DbValue::Timestamp(ts) => write!(f, "{}", ts.format("%F %T%.f")),
            DbValue::Null => f.write_str("NULL"),
            DbValue::JSON(json) => write!(f, "{json}"),
            DbValue::Blob(bytes) => {
                f.write_str("X'")?;
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                f.write_str("'")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum HashableValue {
    Int(i64),
    Float(u64),
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Null,
    Blob(Vec<u8>),
}

macro_rules! impl_from_for_db_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for DbValue {
                fn from(value: $ty) -> Self {
                    DbValue::$variant(value.into())
                }
            }

            impl From<$ty> for BindValue {
                fn from(value: $ty) -> Self {
                    BindValue::Value(value.into())
                }
            }
        )*
    };
}

impl_from_for_db_value!(
    i64 => Int,
    i32 => Int,
    i16 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    String => Text,
    &str => Text,
    bool => Bool,
    NaiveDateTime => Timestamp,
    JsonValue => JSON,
    Vec<u8> => Blob,
);

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DbValue::Null, Into::into)
    }
}

/// A value supplied for one symbolic placeholder.
///
/// Scalars bind as a single parameter; lists feed the sequence placeholders (`:t:`, `:t*:`)
/// or expand into a comma-separated placeholder list when used with a plain `:name`.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Value(DbValue),
    List(Vec<BindValue>),
}

impl BindValue {
    /// Build a list of scalars.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<DbValue>,
    {
        BindValue::List(items.into_iter().map(|v| BindValue::Value(v.into())).collect())
    }

    /// Build a list of rows, e.g. for a multi-row `VALUES :t*:rows`.
    pub fn rows<I, R, T>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
        T: Into<DbValue>,
    {
        BindValue::List(rows.into_iter().map(BindValue::list).collect())
    }
}

impl From<DbValue> for BindValue {
    fn from(value: DbValue) -> Self {
        BindValue::Value(value)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for BindValue {
    fn from(value: Option<T>) -> Self {
        BindValue::Value(value.into())
    }
}

/// Caller-supplied bind values, keyed by placeholder name.
pub type BindArgs = HashMap<String, BindValue>;

/// Build a [`BindArgs`] map from `name => value` pairs.
///
/// ```rust
/// use sql_embrace::prelude::*;
///
/// let args = bind_args! { "id" => 7, "tags" => BindValue::list(["a", "b"]) };
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! bind_args {
    () => {
        $crate::types::BindArgs::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut args = $crate::types::BindArgs::new();
        $(
            args.insert(::std::string::String::from($name), $crate::types::BindValue::from($value));
        )+
        args
    }};
}

/// Driver-ready parameter container produced by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub enum BindParams {
    /// Values in placeholder order (`qmark`, `numeric`, `format`).
    Positional(Vec<DbValue>),
    /// Values keyed by placeholder name (`named`, `pyformat`), in first-use order.
    Named(Vec<(String, DbValue)>),
}

impl BindParams {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            BindParams::Positional(values) => values.len(),
            BindParams::Named(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a named parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DbValue> {
        match self {
            BindParams::Positional(_) => None,
            BindParams::Named(values) => values.iter().find(|(n, _)| n == name).map(|(_, v)| v),
        }
    }
}
