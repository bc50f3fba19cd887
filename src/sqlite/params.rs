use rusqlite::Statement;
use rusqlite::types::Value;

use crate::types::{BindParams, DbValue};

/// Convert a single `DbValue` to a rusqlite `Value`.
#[must_use]
pub fn db_value_to_sqlite_value(value: &DbValue) -> Value {
    match value {
        DbValue::Int(i) => Value::Integer(*i),
        DbValue::Float(f) => Value::Real(*f),
        DbValue::Text(s) => Value::Text(s.clone()),
        DbValue::Bool(b) => Value::Integer(i64::from(*b)),
        DbValue::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        DbValue::Null => Value::Null,
        DbValue::JSON(jval) => Value::Text(jval.to_string()),
        DbValue::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Bind compiled parameters to a prepared statement.
///
/// Positional values bind to `?` in order; named values bind to `:name`.
///
/// # Errors
/// Returns `InvalidParameterCount` for a positional count mismatch and
/// `InvalidParameterName` for a name the statement doesn't use.
pub fn bind_params(stmt: &mut Statement<'_>, params: &BindParams) -> rusqlite::Result<()> {
    match params {
        BindParams::Positional(values) => {
            let expected = stmt.parameter_count();
            if values.len() != expected {
                return Err(rusqlite::Error::InvalidParameterCount(values.len(), expected));
            }
            for (idx, value) in values.iter().enumerate() {
                stmt.raw_bind_parameter(idx + 1, db_value_to_sqlite_value(value))?;
            }
        }
        BindParams::Named(values) => {
            for (name, value) in values {
                let key = format!(":{name}");
                let idx = stmt
                    .parameter_index(&key)?
                    .ok_or(rusqlite::Error::InvalidParameterName(key))?;
                stmt.raw_bind_parameter(idx, db_value_to_sqlite_value(value))?;
            }
        }
    }
    Ok(())
}
