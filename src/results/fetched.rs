use crate::mapping::Hydrated;
use crate::types::DbValue;

use super::Row;

/// One item produced by a query.
#[derive(Debug, Clone)]
pub enum Fetched {
    /// An unmapped row.
    Row(Row),
    /// An unmapped single column (`scalar` and `column` results).
    Value(DbValue),
    /// One mapped object.
    Object(Hydrated),
    /// Mapped objects of several column groups, in group order.
    Objects(Vec<Hydrated>),
}

impl Fetched {
    #[must_use]
    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Fetched::Row(row) => Some(row),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_row(self) -> Option<Row> {
        match self {
            Fetched::Row(row) => Some(row),
            _ => None,
        }
    }

    /// The plain value, including one produced by a passthrough mapping.
    #[must_use]
    pub fn into_value(self) -> Option<DbValue> {
        match self {
            Fetched::Value(value) => Some(value),
            Fetched::Object(object) => object.as_value().cloned(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Hydrated> {
        match self {
            Fetched::Object(object) => Some(object),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_object(self) -> Option<Hydrated> {
        match self {
            Fetched::Object(object) => Some(object),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_objects(self) -> Option<Vec<Hydrated>> {
        match self {
            Fetched::Objects(objects) => Some(objects),
            _ => None,
        }
    }
}
