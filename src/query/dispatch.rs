use std::iter;
use std::sync::Arc;

use crate::driver::Cursor;
use crate::error::{EmbraceError, Result, rehome};
use crate::mapping::{MappedRows, RowMapper, RowSpec};
use crate::results::{Fetched, Row};

use super::options::ResultShape;

/// The consumed result of an executed query.
pub enum Outcome<'c, K> {
    /// `first`, `one`, `exactly_one`, `one_or_none` and `scalar`.
    Fetched(Option<Fetched>),
    /// `many` and `column`.
    Rows(MappedRows<'c>),
    /// `affected`.
    Affected(i64),
    /// `cursor`.
    Cursor(K),
}

impl<'c, K> Outcome<'c, K> {
    fn kind(&self) -> &'static str {
        match self {
            Outcome::Fetched(_) => "a single item",
            Outcome::Rows(_) => "rows",
            Outcome::Affected(_) => "an affected count",
            Outcome::Cursor(_) => "a cursor",
        }
    }

    fn mismatch(&self, expected: &str) -> EmbraceError {
        EmbraceError::UnsupportedResultShape(format!("expected {expected}, got {}", self.kind()))
    }

    /// # Errors
    /// Returns `UnsupportedResultShape` if the outcome holds something else.
    pub fn into_fetched(self) -> Result<Option<Fetched>> {
        match self {
            Outcome::Fetched(fetched) => Ok(fetched),
            other => Err(other.mismatch("a single item")),
        }
    }

    /// # Errors
    /// Returns `UnsupportedResultShape` if the outcome holds something else.
    pub fn into_rows(self) -> Result<MappedRows<'c>> {
        match self {
            Outcome::Rows(rows) => Ok(rows),
            other => Err(other.mismatch("rows")),
        }
    }

    /// # Errors
    /// Returns `UnsupportedResultShape` if the outcome holds something else.
    pub fn into_affected(self) -> Result<i64> {
        match self {
            Outcome::Affected(count) => Ok(count),
            other => Err(other.mismatch("an affected count")),
        }
    }

    /// # Errors
    /// Returns `UnsupportedResultShape` if the outcome holds something else.
    pub fn into_cursor(self) -> Result<K> {
        match self {
            Outcome::Cursor(cursor) => Ok(cursor),
            other => Err(other.mismatch("a cursor")),
        }
    }
}

/// Rows pulled from a cursor one `fetch_one` at a time.
struct CursorRows<K> {
    cursor: K,
    done: bool,
}

impl<K: Cursor> Iterator for CursorRows<K> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.fetch_one() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(rehome(err)))
            }
        }
    }
}

fn fetch<K: Cursor>(cursor: &mut K) -> Result<Option<Row>> {
    cursor.fetch_one().map_err(rehome)
}

fn map_one(mapping: Option<&Arc<RowSpec>>, row: Row) -> Result<Fetched> {
    let Some(spec) = mapping else {
        return Ok(Fetched::Row(row));
    };
    let names = Arc::clone(&row.column_names);
    RowMapper::new(Arc::clone(spec), &names)?
        .map(iter::once(Ok(row)))
        .next()
        .transpose()?
        .ok_or_else(|| EmbraceError::Mapping("row mapping produced no object".into()))
}

/// Single-column row holding the first column of `row`.
fn first_column(row: Row, names: &Arc<Vec<String>>) -> Result<Row> {
    let value = row
        .into_first()
        .ok_or_else(|| EmbraceError::Mapping("row has no columns".into()))?;
    Ok(Row::new(Arc::clone(names), vec![value]))
}

fn first_column_names(row: &Row) -> Arc<Vec<String>> {
    Arc::new(row.column_names.iter().take(1).cloned().collect())
}

/// Consume an executed cursor according to `shape`.
pub(crate) fn consume<'c, K: Cursor + 'c>(
    shape: ResultShape,
    mut cursor: K,
    mapping: Option<&Arc<RowSpec>>,
) -> Result<Outcome<'c, K>> {
    match shape {
        ResultShape::One | ResultShape::ExactlyOne => {
            let row = fetch(&mut cursor)?.ok_or(EmbraceError::NoResultFound)?;
            if fetch(&mut cursor)?.is_some() {
                return Err(EmbraceError::MultipleResultsFound);
            }
            map_one(mapping, row).map(|fetched| Outcome::Fetched(Some(fetched)))
        }
        ResultShape::First => fetch(&mut cursor)?
            .map(|row| map_one(mapping, row))
            .transpose()
            .map(Outcome::Fetched),
        ResultShape::OneOrNone => {
            let row = fetch(&mut cursor)?;
            if fetch(&mut cursor)?.is_some() {
                return Err(EmbraceError::MultipleResultsFound);
            }
            row.map(|row| map_one(mapping, row))
                .transpose()
                .map(Outcome::Fetched)
        }
        ResultShape::Many => {
            let description = cursor.description();
            let rows = CursorRows { cursor, done: false };
            let mapped: MappedRows<'c> = match (mapping, description) {
                (Some(spec), Some(names)) => RowMapper::new(Arc::clone(spec), &names)?.map(rows),
                (Some(_), None) => {
                    return Err(EmbraceError::Mapping(
                        "row mapping needs column names but the cursor has no description".into(),
                    ));
                }
                (None, _) => Box::new(rows.map(|row| row.map(Fetched::Row))),
            };
            Ok(Outcome::Rows(mapped))
        }
        ResultShape::Scalar => {
            let row = fetch(&mut cursor)?.ok_or(EmbraceError::NoResultFound)?;
            if mapping.is_some() {
                let names = first_column_names(&row);
                map_one(mapping, first_column(row, &names)?).map(|fetched| Outcome::Fetched(Some(fetched)))
            } else {
                let value = row
                    .into_first()
                    .ok_or_else(|| EmbraceError::Mapping("row has no columns".into()))?;
                Ok(Outcome::Fetched(Some(Fetched::Value(value))))
            }
        }
        ResultShape::Column => {
            let Some(first) = fetch(&mut cursor)? else {
                return Ok(Outcome::Rows(Box::new(iter::empty())));
            };
            let names = first_column_names(&first);
            let rest = CursorRows { cursor, done: false };
            let projected_names = Arc::clone(&names);
            let rows = iter::once(Ok(first))
                .chain(rest)
                .map(move |row| row.and_then(|row| first_column(row, &projected_names)));
            let mapped: MappedRows<'c> = match mapping {
                Some(spec) => RowMapper::new(Arc::clone(spec), &names)?.map(rows),
                None => Box::new(rows.map(|row| {
                    row.and_then(|row| {
                        row.into_first()
                            .map(Fetched::Value)
                            .ok_or_else(|| EmbraceError::Mapping("row has no columns".into()))
                    })
                })),
            };
            Ok(Outcome::Rows(mapped))
        }
        ResultShape::Affected => Ok(Outcome::Affected(cursor.rowcount())),
        ResultShape::Cursor => Ok(Outcome::Cursor(cursor)),
    }
}
