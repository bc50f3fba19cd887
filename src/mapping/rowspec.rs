use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::error::{EmbraceError, Result, short_type_name};
use crate::types::DbValue;

use super::object::{Args, Entity, FromColumns, Hydrated, Record};

/// Builds one object from a column group.
pub type Factory = Arc<dyn Fn(Args<'_>) -> Result<Hydrated> + Send + Sync>;

/// How one target type is read out of a (possibly multi-entity) row.
#[derive(Clone)]
pub struct MapObject {
    pub(crate) factory: Factory,
    pub(crate) label: Option<String>,
    pub(crate) split: String,
    pub(crate) positional: bool,
    pub(crate) column_count: Option<usize>,
    pub(crate) key_columns: Vec<String>,
}

impl fmt::Debug for MapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapObject")
            .field("label", &self.label)
            .field("split", &self.split)
            .field("positional", &self.positional)
            .field("column_count", &self.column_count)
            .field("key_columns", &self.key_columns)
            .finish_non_exhaustive()
    }
}

impl MapObject {
    /// Map a group through an arbitrary constructor.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(Args<'_>) -> Result<Hydrated> + Send + Sync + 'static,
    {
        Self::from_factory(Arc::new(factory))
    }

    pub(crate) fn from_factory(factory: Factory) -> Self {
        MapObject {
            factory,
            label: None,
            split: "id".to_string(),
            positional: false,
            column_count: None,
            key_columns: Vec::new(),
        }
    }

    /// Map a group into `T`; the group is labelled with `T`'s type name.
    #[must_use]
    pub fn of<T: FromColumns + Entity>() -> Self {
        Self::new(|args| Ok(Hydrated::object(T::from_columns(args)?)))
            .label(short_type_name(std::any::type_name::<T>()))
    }

    /// Map a group into a [`Record`]; joins attach into it by key.
    #[must_use]
    pub fn dict() -> Self {
        Self::new(|args| Ok(Hydrated::map(Record::from_args(args))))
    }

    /// Return a single column's value unchanged.
    #[must_use]
    pub fn passthrough() -> Self {
        Self::new(|args| match args.values() {
            [value] => Ok(Hydrated::value(value.clone())),
            values => Err(EmbraceError::Mapping(format!(
                "passthrough expects exactly one column, got {}",
                values.len()
            ))),
        })
        .positional(true)
        .column_count(1)
    }

    /// Columns identifying the object; rows with equal values share one instance.
    #[must_use]
    pub fn key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Name of the column that starts this group (default `id`).
    #[must_use]
    pub fn split(mut self, column: impl Into<String>) -> Self {
        self.split = column.into();
        self
    }

    #[must_use]
    pub fn positional(mut self, positional: bool) -> Self {
        self.positional = positional;
        self
    }

    /// Fixed width of this group, overriding split-column detection.
    #[must_use]
    pub fn column_count(mut self, count: usize) -> Self {
        self.column_count = Some(count);
        self
    }

    /// Name joins can use to refer to this group.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub(crate) fn build(&self, columns: &[String], values: &[DbValue]) -> Result<Hydrated> {
        let args = if self.positional {
            Args::Positional(values)
        } else {
            Args::Named(columns, values)
        };
        (self.factory)(args)
    }
}

/// A column group named by position or by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    Index(usize),
    Label(String),
}

impl From<usize> for GroupRef {
    fn from(index: usize) -> Self {
        GroupRef::Index(index)
    }
}

impl From<&str> for GroupRef {
    fn from(label: &str) -> Self {
        GroupRef::Label(label.to_string())
    }
}

impl From<String> for GroupRef {
    fn from(label: String) -> Self {
        GroupRef::Label(label)
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::Index(index) => write!(f, "{index}"),
            GroupRef::Label(label) => write!(f, "{label:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    One,
    Many,
}

/// Attach each `source` object to the `target` object of the same row under `attr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub target: GroupRef,
    pub attr: String,
    pub source: GroupRef,
    pub arity: Arity,
}

/// `target.attr = source`
pub fn one_to_one(target: impl Into<GroupRef>, attr: &str, source: impl Into<GroupRef>) -> JoinSpec {
    JoinSpec {
        target: target.into(),
        attr: attr.to_string(),
        source: source.into(),
        arity: Arity::One,
    }
}

/// `target.attr.push(source)`
pub fn one_to_many(target: impl Into<GroupRef>, attr: &str, source: impl Into<GroupRef>) -> JoinSpec {
    JoinSpec {
        target: target.into(),
        attr: attr.to_string(),
        source: source.into(),
        arity: Arity::Many,
    }
}

#[derive(Clone)]
enum RowItem {
    Mapped(MapObject),
    Bare(Factory),
}

/// Row mapping declared on a query.
///
/// ```rust
/// use sql_embrace::prelude::*;
///
/// let returning = Returning::new()
///     .map(MapObject::dict().label("author").key(["id"]))
///     .map(MapObject::dict().label("book"))
///     .join(one_to_many("author", "books", "book"));
/// # let _ = returning;
/// ```
#[derive(Clone, Default)]
pub struct Returning {
    items: Vec<RowItem>,
    joins: Vec<JoinSpec>,
    positional: bool,
    key_columns: Vec<Vec<String>>,
    split_on: Vec<String>,
    validate_contiguity: bool,
}

impl fmt::Debug for Returning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Returning")
            .field("groups", &self.items.len())
            .field("joins", &self.joins)
            .field("split_on", &self.split_on)
            .finish_non_exhaustive()
    }
}

impl Returning {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single `MapObject::of::<T>()` group.
    #[must_use]
    pub fn of<T: FromColumns + Entity>() -> Self {
        Self::new().map(MapObject::of::<T>())
    }

    /// Append a column group.
    #[must_use]
    pub fn map(mut self, object: MapObject) -> Self {
        self.items.push(RowItem::Mapped(object));
        self
    }

    /// Append a column group built by a bare constructor; the legacy `positional`,
    /// `split_on` and `key_columns` settings apply to these groups only.
    #[must_use]
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(Args<'_>) -> Result<Hydrated> + Send + Sync + 'static,
    {
        self.items.push(RowItem::Bare(Arc::new(factory)));
        self
    }

    #[must_use]
    pub fn join(mut self, join: JoinSpec) -> Self {
        self.joins.push(join);
        self
    }

    #[must_use]
    pub fn joins(mut self, joins: impl IntoIterator<Item = JoinSpec>) -> Self {
        self.joins.extend(joins);
        self
    }

    #[must_use]
    pub fn positional(mut self, positional: bool) -> Self {
        self.positional = positional;
        self
    }

    /// Key columns per group, by position.
    #[must_use]
    pub fn key_columns<I, K, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_columns = keys
            .into_iter()
            .map(|key| key.into_iter().map(Into::into).collect())
            .collect();
        self
    }

    /// Split column names; entry `i` starts group `i + 1`.
    #[must_use]
    pub fn split_on<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.split_on = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Fail with `ContiguityViolation` when a completed parent reappears later in the rows,
    /// instead of silently emitting it again.
    #[must_use]
    pub fn validate_contiguity(mut self, validate: bool) -> Self {
        self.validate_contiguity = validate;
        self
    }

    /// Resolve the declaration into the plan used at execution time.
    pub(crate) fn normalize(&self) -> Result<RowSpec> {
        if self.items.is_empty() {
            return Err(EmbraceError::Config("returning() needs at least one column group".into()));
        }
        if !self.split_on.is_empty() && self.items.iter().any(|item| matches!(item, RowItem::Mapped(_))) {
            return Err(EmbraceError::Config("Cannot combine MapObject with split_on".into()));
        }

        let groups: Vec<MapObject> = self
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| match item {
                RowItem::Mapped(object) => object.clone(),
                RowItem::Bare(factory) => {
                    let mut object = MapObject::from_factory(Arc::clone(factory)).positional(self.positional);
                    if idx > 0
                        && let Some(split) = self.split_on.get(idx - 1)
                    {
                        object.split.clone_from(split);
                    }
                    if let Some(key) = self.key_columns.get(idx) {
                        object.key_columns.clone_from(key);
                    }
                    object
                }
            })
            .collect();

        if !self.joins.is_empty() && groups.len() < 2 {
            return Err(EmbraceError::Config(
                "joins may only be set when there are multiple return types".into(),
            ));
        }

        let joins = self
            .joins
            .iter()
            .map(|join| {
                Ok(IndexedJoin {
                    target: resolve_group(&groups, &join.target, "Target", join)?,
                    attr: join.attr.clone(),
                    source: resolve_group(&groups, &join.source, "Source", join)?,
                    arity: join.arity,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RowSpec {
            groups,
            joins,
            validate_contiguity: self.validate_contiguity,
        })
    }
}

fn resolve_group(groups: &[MapObject], group: &GroupRef, role: &str, join: &JoinSpec) -> Result<usize> {
    let index = match group {
        GroupRef::Index(index) => *index,
        GroupRef::Label(label) => groups
            .iter()
            .position(|object| object.label.as_deref() == Some(label.as_str()))
            .ok_or_else(|| EmbraceError::Config(format!("{role} {group} in join {join:?} matches no labelled group")))?,
    };
    if index >= groups.len() {
        return Err(EmbraceError::Config(format!(
            "{role} index {index} in join {join:?} exceeds number of mapped objects"
        )));
    }
    Ok(index)
}

#[derive(Debug, Clone)]
pub(crate) struct IndexedJoin {
    pub(crate) target: usize,
    pub(crate) attr: String,
    pub(crate) source: usize,
    pub(crate) arity: Arity,
}

/// Normalized row mapping: one `MapObject` per group and joins resolved to group indexes.
#[derive(Debug, Clone)]
pub(crate) struct RowSpec {
    pub(crate) groups: Vec<MapObject>,
    pub(crate) joins: Vec<IndexedJoin>,
    pub(crate) validate_contiguity: bool,
}

impl RowSpec {
    pub(crate) fn is_multi(&self) -> bool {
        self.groups.len() > 1
    }

    /// Column range of each group within a row with `column_names`.
    ///
    /// # Errors
    /// Returns `EmbraceError::SplitColumnNotFound` if a group's split column does not occur
    /// after the previous group's start.
    pub(crate) fn split_points(&self, column_names: &[String]) -> Result<Vec<Range<usize>>> {
        let total = column_names.len();
        if !self.is_multi() {
            return Ok(vec![0..total]);
        }

        let mut pos = 0;
        let mut ranges = Vec::with_capacity(self.groups.len());
        for (idx, group) in self.groups.iter().enumerate() {
            let end = if let Some(count) = group.column_count {
                (pos + count).min(total)
            } else if let Some(next) = self.groups.get(idx + 1) {
                column_names
                    .iter()
                    .enumerate()
                    .skip(pos + 1)
                    .find(|(_, name)| **name == next.split)
                    .map(|(found, _)| found)
                    .ok_or_else(|| EmbraceError::SplitColumnNotFound {
                        group: idx + 1,
                        split: next.split.clone(),
                        columns: column_names.to_vec(),
                    })?
            } else {
                total
            };
            ranges.push(pos..end);
            pos = end;
        }
        Ok(ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| (*c).to_string()).collect()
    }

    fn record(args: Args<'_>) -> Result<Hydrated> {
        Ok(Hydrated::map(Record::from_args(args)))
    }

    #[test]
    fn splits_on_the_default_id_column() {
        let spec = Returning::new()
            .map(MapObject::dict())
            .map(MapObject::dict())
            .normalize()
            .unwrap();
        let ranges = spec.split_points(&names(&["id", "name", "id", "title"])).unwrap();
        assert_eq!(ranges, vec![0..2, 2..4]);
    }

    #[test]
    fn column_count_and_custom_split() {
        let spec = Returning::new()
            .map(MapObject::dict().column_count(1))
            .map(MapObject::dict())
            .map(MapObject::dict().split("tag_id"))
            .normalize()
            .unwrap();
        let ranges = spec
            .split_points(&names(&["n", "id", "title", "tag_id", "label"]))
            .unwrap();
        assert_eq!(ranges, vec![0..1, 1..3, 3..5]);
    }

    #[test]
    fn missing_split_column_names_the_group() {
        let spec = Returning::new()
            .map(MapObject::dict())
            .map(MapObject::dict().split("book_id"))
            .normalize()
            .unwrap();
        let err = spec.split_points(&names(&["id", "name"])).unwrap_err();
        match err {
            EmbraceError::SplitColumnNotFound { group, split, columns } => {
                assert_eq!(group, 1);
                assert_eq!(split, "book_id");
                assert_eq!(columns, names(&["id", "name"]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn legacy_settings_apply_to_bare_factories() {
        let spec = Returning::new()
            .factory(record)
            .factory(record)
            .split_on(["book_id"])
            .key_columns([vec!["id"], vec!["book_id"]])
            .positional(true)
            .normalize()
            .unwrap();
        assert_eq!(spec.groups[1].split, "book_id");
        assert_eq!(spec.groups[0].key_columns, names(&["id"]));
        assert!(spec.groups[1].positional);
    }

    #[test]
    fn split_on_conflicts_with_map_object() {
        let err = Returning::new()
            .map(MapObject::dict())
            .factory(record)
            .split_on(["x"])
            .normalize()
            .unwrap_err();
        assert!(matches!(err, EmbraceError::Config(_)));
    }

    #[test]
    fn joins_resolve_labels_and_check_bounds() {
        let spec = Returning::new()
            .map(MapObject::dict().label("a"))
            .map(MapObject::dict().label("b"))
            .join(one_to_many("a", "bs", "b"))
            .join(one_to_one(1, "a", 0))
            .normalize()
            .unwrap();
        assert_eq!((spec.joins[0].target, spec.joins[0].source), (0, 1));
        assert_eq!(spec.joins[1].arity, Arity::One);

        let unknown = Returning::new()
            .map(MapObject::dict())
            .map(MapObject::dict())
            .join(one_to_many("nope", "bs", 1))
            .normalize();
        assert!(matches!(unknown, Err(EmbraceError::Config(_))));

        let out_of_range = Returning::new()
            .map(MapObject::dict())
            .map(MapObject::dict())
            .join(one_to_many(0, "bs", 2))
            .normalize();
        assert!(matches!(out_of_range, Err(EmbraceError::Config(msg)) if msg.contains("Source index 2")));
    }

    #[test]
    fn joins_need_several_groups() {
        let err = Returning::new()
            .map(MapObject::dict())
            .join(one_to_one(0, "x", 0))
            .normalize()
            .unwrap_err();
        assert!(err.to_string().contains("multiple return types"));
    }

    #[test]
    fn passthrough_rejects_wide_groups() {
        let object = MapObject::passthrough();
        let values = vec![DbValue::Int(1), DbValue::Int(2)];
        assert!(object.build(&names(&["a", "b"]), &values).is_err());
        let single = object.build(&names(&["a"]), &values[..1]).unwrap();
        assert_eq!(single.as_value(), Some(&DbValue::Int(1)));
    }
}
