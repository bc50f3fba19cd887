use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::{EmbraceError, Result};
use crate::types::{DbValue, HashableValue};

use super::object::Hydrated;
use super::rowspec::MapObject;

/// One column group bound to the columns of an executed statement.
#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub(crate) object: MapObject,
    pub(crate) columns: Vec<String>,
    pub(crate) key_positions: Vec<usize>,
}

impl Group {
    /// # Errors
    /// Returns `EmbraceError::KeyColumnNotFound` when a declared key column is not one of
    /// `columns`.
    pub(crate) fn bind(index: usize, object: MapObject, columns: Vec<String>) -> Result<Self> {
        let key_positions = object
            .key_columns
            .iter()
            .map(|key| {
                columns
                    .iter()
                    .position(|c| c == key)
                    .ok_or_else(|| EmbraceError::KeyColumnNotFound {
                        group: index,
                        column: key.clone(),
                        columns: columns.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Group {
            object,
            columns,
            key_positions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CacheKey {
    Values(Vec<HashableValue>),
    Encoded(Vec<u8>),
}

impl CacheKey {
    /// Hashable key for `values`, or `None` if one of them has no hash.
    fn hashed<'v>(values: impl IntoIterator<Item = &'v DbValue>) -> Option<Self> {
        values
            .into_iter()
            .map(DbValue::hash_key)
            .collect::<Option<Vec<_>>>()
            .map(CacheKey::Values)
    }

    fn encoded<'v>(values: impl IntoIterator<Item = &'v DbValue>) -> Result<Self> {
        let values: Vec<&DbValue> = values.into_iter().collect();
        serde_json::to_vec(&values)
            .map(CacheKey::Encoded)
            .map_err(|e| EmbraceError::Mapping(format!("cannot build cache key: {e}")))
    }

    /// Key for the declared key columns of `group`.
    pub(crate) fn for_key(group: &Group, data: &[DbValue]) -> Result<Self> {
        let values = || group.key_positions.iter().filter_map(|&pos| data.get(pos));
        match Self::hashed(values()) {
            Some(key) => Ok(key),
            None => Self::encoded(values()),
        }
    }

    /// Declared key of `group` when it has one, otherwise all of `data`.
    pub(crate) fn identify(group: &Group, data: &[DbValue]) -> Result<Self> {
        if !group.key_positions.is_empty() {
            return Self::for_key(group, data);
        }
        match Self::hashed(data) {
            Some(key) => Ok(key),
            None => Self::encoded(data),
        }
    }
}

/// Builds one object per column group per row, preserving identity within one execution.
///
/// Groups with key columns are cached for the whole execution. Without key columns, a
/// multi-group row uses a short window keyed on the raw values, cleared after two
/// consecutive rows without a hit; single-group results are not cached.
#[derive(Debug)]
pub(crate) struct ObjectMaker {
    groups: Arc<[Group]>,
    current: usize,
    rows_started: usize,
    permanent: HashMap<(usize, CacheKey), Hydrated>,
    window: HashMap<(usize, CacheKey), Hydrated>,
    use_window: bool,
    encode_keys: Vec<bool>,
    hit_this_row: bool,
    idle_rows: usize,
}

impl ObjectMaker {
    pub(crate) fn new(groups: Arc<[Group]>) -> Self {
        let count = groups.len();
        ObjectMaker {
            use_window: count > 1,
            encode_keys: vec![false; count],
            groups,
            current: 0,
            rows_started: 0,
            permanent: HashMap::new(),
            window: HashMap::new(),
            hit_this_row: false,
            idle_rows: 0,
        }
    }

    /// Object for the next group of the current row.
    pub(crate) fn next(&mut self, data: &[DbValue]) -> Result<Hydrated> {
        let index = self.advance();
        let group = &self.groups[index];

        if !group.key_positions.is_empty() {
            let key = (index, CacheKey::for_key(group, data)?);
            if let Some(hit) = self.permanent.get(&key) {
                self.hit_this_row = true;
                return Ok(hit.clone());
            }
            let object = group.object.build(&group.columns, data)?;
            self.permanent.insert(key, object.clone());
            return Ok(object);
        }

        if self.use_window {
            let key = if self.encode_keys[index] {
                CacheKey::encoded(data)?
            } else if let Some(key) = CacheKey::hashed(data) {
                key
            } else {
                // Unhashable values: this group uses encoded keys from now on.
                self.encode_keys[index] = true;
                CacheKey::encoded(data)?
            };
            let key = (index, key);
            if let Some(hit) = self.window.get(&key) {
                self.hit_this_row = true;
                return Ok(hit.clone());
            }
            let object = group.object.build(&group.columns, data)?;
            self.window.insert(key, object.clone());
            return Ok(object);
        }

        group.object.build(&group.columns, data)
    }

    /// Skip the next group of the current row; it was outer-joined and is absent.
    pub(crate) fn skip_null(&mut self) {
        self.advance();
    }

    fn advance(&mut self) -> usize {
        let index = self.current;
        self.current = (self.current + 1) % self.groups.len().max(1);
        if index == 0 {
            if self.rows_started > 0 {
                self.finish_row();
            }
            self.rows_started += 1;
        }
        index
    }

    fn finish_row(&mut self) {
        if self.hit_this_row {
            self.idle_rows = 0;
        } else if !self.window.is_empty() {
            self.idle_rows += 1;
            if self.idle_rows >= 2 {
                trace!(entries = self.window.len(), "clearing identity window");
                self.window.clear();
                self.idle_rows = 0;
            }
        }
        self.hit_this_row = false;
    }

    #[cfg(test)]
    fn window_len(&self) -> usize {
        self.window.len()
    }
}
