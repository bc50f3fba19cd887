use std::ops::Range;
use std::sync::Arc;

use crate::error::Result;
use crate::results::{Fetched, Row};

use super::join::JoinHydrator;
use super::maker::{Group, ObjectMaker};
use super::rowspec::RowSpec;

/// Lazily mapped rows.
pub type MappedRows<'a> = Box<dyn Iterator<Item = Result<Fetched>> + 'a>;

/// A row mapping bound to the columns of one executed statement.
pub(crate) struct RowMapper {
    spec: Arc<RowSpec>,
    groups: Arc<[Group]>,
    ranges: Vec<Range<usize>>,
}

impl RowMapper {
    /// # Errors
    /// Returns `SplitColumnNotFound` or `KeyColumnNotFound` when `column_names` don't fit
    /// the declared groups.
    pub(crate) fn new(spec: Arc<RowSpec>, column_names: &[String]) -> Result<Self> {
        let ranges = spec.split_points(column_names)?;
        let groups: Vec<Group> = spec
            .groups
            .iter()
            .zip(&ranges)
            .enumerate()
            .map(|(idx, (object, range))| {
                let columns = column_names
                    .get(range.clone())
                    .map(<[String]>::to_vec)
                    .unwrap_or_default();
                Group::bind(idx, object.clone(), columns)
            })
            .collect::<Result<_>>()?;
        Ok(RowMapper {
            spec,
            groups: groups.into(),
            ranges,
        })
    }

    /// Map `rows` one by one, or through the join engine when joins are declared.
    pub(crate) fn map<'a, I>(self, rows: I) -> MappedRows<'a>
    where
        I: Iterator<Item = Result<Row>> + 'a,
    {
        if !self.spec.joins.is_empty() {
            return Box::new(JoinHydrator::new(rows, &self.spec, self.groups, self.ranges));
        }

        let multi = self.spec.is_multi();
        let ranges = self.ranges;
        let mut maker = ObjectMaker::new(self.groups);
        Box::new(rows.map(move |row| {
            let row = row?;
            if multi {
                ranges
                    .iter()
                    .map(|range| maker.next(row.values.get(range.clone()).unwrap_or(&[])))
                    .collect::<Result<Vec<_>>>()
                    .map(Fetched::Objects)
            } else {
                maker.next(&row.values).map(Fetched::Object)
            }
        }))
    }
}
