use std::sync::Arc;

use rusqlite::Statement;
use rusqlite::types::Value;

use crate::results::ResultSet;
use crate::types::DbValue;

/// Extract a `DbValue` from a `SQLite` row.
///
/// # Errors
///
/// Returns the `rusqlite` error if the column can't be read.
pub fn sqlite_extract_value(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DbValue> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => DbValue::Null,
        Value::Integer(i) => DbValue::Int(i),
        Value::Real(f) => DbValue::Float(f),
        Value::Text(s) => DbValue::Text(s),
        Value::Blob(b) => DbValue::Blob(b),
    })
}

/// Run a statement whose parameters are already bound and buffer its rows.
///
/// Statements without result columns are still stepped, so DML runs; the result set then
/// carries no column names.
///
/// # Errors
/// Returns the `rusqlite` error if execution or row extraction fails.
pub fn build_result_set(stmt: &mut Statement<'_>) -> rusqlite::Result<ResultSet> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    if column_count > 0 {
        result_set.set_column_names(Arc::new(column_names));
    }

    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let row_values = (0..column_count)
            .map(|i| sqlite_extract_value(row, i))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
