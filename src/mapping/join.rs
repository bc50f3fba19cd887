use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use tracing::trace;

use crate::error::{EmbraceError, Result};
use crate::results::{Fetched, Row};
use crate::types::DbValue;

use super::maker::{CacheKey, Group, ObjectMaker};
use super::object::{Attachment, Hydrated};
use super::rowspec::{Arity, IndexedJoin, RowSpec};

/// Streams rows into attached object graphs.
///
/// Rows of one parent must be contiguous. A parent is complete once every present target of
/// a one-to-many join changes its raw values; it is then emitted and never revisited, so a
/// parent that reappears later is emitted again as a separate, partial object unless
/// contiguity validation is enabled.
pub(crate) struct JoinHydrator<I> {
    rows: I,
    maker: ObjectMaker,
    groups: Arc<[Group]>,
    ranges: Vec<Range<usize>>,
    joins: Vec<IndexedJoin>,
    is_source: Vec<bool>,
    returned: Vec<usize>,
    many_targets: Vec<usize>,
    current: Vec<Option<Hydrated>>,
    last: Option<Vec<DbValue>>,
    seen: HashSet<(usize, usize)>,
    validated: Vec<usize>,
    open: HashSet<(usize, CacheKey)>,
    closed: Option<HashSet<(usize, CacheKey)>>,
    row_index: usize,
    pending_error: Option<EmbraceError>,
    done: bool,
}

impl<I> JoinHydrator<I>
where
    I: Iterator<Item = Result<Row>>,
{
    pub(crate) fn new(rows: I, spec: &RowSpec, groups: Arc<[Group]>, ranges: Vec<Range<usize>>) -> Self {
        let count = groups.len();
        let mut is_source = vec![false; count];
        for join in &spec.joins {
            is_source[join.source] = true;
        }
        let returned: Vec<usize> = (0..count).filter(|&g| !is_source[g]).collect();
        let mut many_targets: Vec<usize> = spec
            .joins
            .iter()
            .filter(|join| join.arity == Arity::Many)
            .map(|join| join.target)
            .collect();
        many_targets.sort_unstable();
        many_targets.dedup();
        let validated = many_targets
            .iter()
            .copied()
            .filter(|&g| !is_source[g])
            .collect();

        JoinHydrator {
            rows,
            maker: ObjectMaker::new(Arc::clone(&groups)),
            groups,
            ranges,
            joins: spec.joins.clone(),
            is_source,
            returned,
            many_targets,
            current: vec![None; count],
            last: None,
            seen: HashSet::new(),
            validated,
            open: HashSet::new(),
            closed: spec.validate_contiguity.then(HashSet::new),
            row_index: 0,
            pending_error: None,
            done: false,
        }
    }

    /// Every many-arity target present in both rows changed since the previous row.
    ///
    /// A target that is itself an absent outer-joined source in either row carries no
    /// parent identity; when no target is left, the return groups are compared instead.
    fn is_boundary(&self, row: &Row) -> bool {
        let Some(last) = &self.last else {
            return false;
        };
        if self.many_targets.is_empty() {
            return true;
        }
        let changed = |g: usize| values_in(&row.values, &self.ranges[g]) != values_in(last, &self.ranges[g]);
        let present: Vec<usize> = self
            .many_targets
            .iter()
            .copied()
            .filter(|&g| !(self.is_absent(g, &row.values) || self.is_absent(g, last)))
            .collect();
        if present.is_empty() {
            self.returned.iter().all(|&g| changed(g))
        } else {
            present.into_iter().all(changed)
        }
    }

    fn is_absent(&self, group: usize, values: &[DbValue]) -> bool {
        self.is_source[group] && values_in(values, &self.ranges[group]).iter().all(DbValue::is_null)
    }

    fn emit(&mut self) -> Result<Fetched> {
        trace!(row = self.row_index, "join boundary, emitting completed objects");
        self.seen.clear();
        if let Some(closed) = &mut self.closed {
            closed.extend(self.open.drain());
        }
        let mut objects = self
            .returned
            .iter()
            .map(|&g| {
                self.current[g]
                    .clone()
                    .ok_or_else(|| EmbraceError::Mapping(format!("group {g} produced no object")))
            })
            .collect::<Result<Vec<_>>>()?;
        if objects.len() == 1 {
            Ok(Fetched::Object(objects.remove(0)))
        } else {
            Ok(Fetched::Objects(objects))
        }
    }

    fn absorb(&mut self, row: &Row) -> Result<()> {
        for g in 0..self.ranges.len() {
            let data = values_in(&row.values, &self.ranges[g]);
            self.current[g] = if self.is_source[g] && data.iter().all(DbValue::is_null) {
                self.maker.skip_null();
                None
            } else {
                Some(self.maker.next(data)?)
            };
        }

        if let Some(closed) = &self.closed {
            for &g in &self.validated {
                let data = values_in(&row.values, &self.ranges[g]);
                let key = (g, CacheKey::identify(&self.groups[g], data)?);
                if closed.contains(&key) {
                    return Err(EmbraceError::ContiguityViolation {
                        group: g,
                        row: self.row_index,
                    });
                }
                self.open.insert(key);
            }
        }

        for join in &self.joins {
            let source = self.current[join.source].clone();
            let seen_key = (join.source, source.as_ref().map_or(0, Hydrated::identity));
            if self.seen.contains(&seen_key) {
                continue;
            }
            let Some(target) = &self.current[join.target] else {
                continue;
            };
            let attachment = match join.arity {
                Arity::One => Attachment::One(source),
                Arity::Many => Attachment::Many(source),
            };
            target.attach(&join.attr, attachment)?;
            self.seen.insert(seen_key);
        }
        Ok(())
    }
}

fn values_in<'r>(values: &'r [DbValue], range: &Range<usize>) -> &'r [DbValue] {
    values.get(range.clone()).unwrap_or(&[])
}

impl<I> Iterator for JoinHydrator<I>
where
    I: Iterator<Item = Result<Row>>,
{
    type Item = Result<Fetched>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            self.done = true;
            return Some(Err(err));
        }
        while !self.done {
            match self.rows.next() {
                None => {
                    self.done = true;
                    // Final flush, unless the stream was empty.
                    return self.last.is_some().then(|| self.emit());
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                Some(Ok(row)) => {
                    let emitted = self.is_boundary(&row).then(|| self.emit());
                    let absorbed = self.absorb(&row);
                    self.last = Some(row.values);
                    self.row_index += 1;
                    match (emitted, absorbed) {
                        (Some(out), Ok(())) => return Some(out),
                        (Some(out), Err(err)) => {
                            self.pending_error = Some(err);
                            return Some(out);
                        }
                        (None, Err(err)) => {
                            self.done = true;
                            return Some(Err(err));
                        }
                        (None, Ok(())) => {}
                    }
                }
            }
        }
        None
    }
}
