use std::any::Any;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::{EmbraceError, Result, short_type_name};
use crate::types::DbValue;

/// Column values handed to a constructor, either in column order or paired with names.
#[derive(Debug, Clone, Copy)]
pub enum Args<'a> {
    Positional(&'a [DbValue]),
    Named(&'a [String], &'a [DbValue]),
}

impl<'a> Args<'a> {
    #[must_use]
    pub fn values(&self) -> &'a [DbValue] {
        match self {
            Args::Positional(values) | Args::Named(_, values) => values,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// Value at `index` in column order.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&'a DbValue> {
        self.values().get(index)
    }

    /// Value for column `name`. Always `None` for positional construction.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a DbValue> {
        match self {
            Args::Positional(_) => None,
            Args::Named(names, values) => names
                .iter()
                .position(|n| n == name)
                .and_then(|idx| values.get(idx)),
        }
    }

    /// Like [`Args::get`], failing with a mapping error that names the missing column.
    ///
    /// # Errors
    /// Returns `EmbraceError::Mapping` when the column is absent.
    pub fn require(&self, name: &str) -> Result<&'a DbValue> {
        self.get(name)
            .ok_or_else(|| EmbraceError::Mapping(format!("column {name:?} is not in this group")))
    }
}

/// Build a value from one column group.
///
/// ```rust
/// use sql_embrace::prelude::*;
///
/// #[derive(Debug)]
/// struct Tag {
///     label: String,
/// }
///
/// impl FromColumns for Tag {
///     fn from_columns(args: Args<'_>) -> Result<Self, EmbraceError> {
///         let label = args.require("label")?.as_text().unwrap_or_default().to_string();
///         Ok(Tag { label })
///     }
/// }
/// ```
pub trait FromColumns: Sized {
    /// # Errors
    /// Returns an error when the columns can't be converted.
    fn from_columns(args: Args<'_>) -> Result<Self>;
}

/// What a join hands to its target object.
#[derive(Debug, Clone)]
pub enum Attachment {
    /// Overwrite a single slot. `None` means the outer-joined row was absent.
    One(Option<Hydrated>),
    /// Append to a list, creating it first if needed. `None` only ensures the list exists.
    Many(Option<Hydrated>),
}

/// An attributed object that joins can attach related objects to.
pub trait Entity: Any + fmt::Debug {
    /// Store `related` under `attr`.
    ///
    /// # Errors
    /// The default implementation rejects every attribute.
    fn attach(&mut self, attr: &str, related: Attachment) -> Result<()> {
        let _ = related;
        Err(EmbraceError::Mapping(format!(
            "{} has no attribute {attr:?} to attach to",
            short_type_name(std::any::type_name::<Self>())
        )))
    }
}

/// One field of a [`Record`].
#[derive(Debug, Clone)]
pub enum Field {
    Value(DbValue),
    One(Option<Hydrated>),
    Many(Vec<Hydrated>),
}

/// A map-like object; joins attach into it by key.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Vec<(String, Field)>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Named arguments become fields; positional ones are keyed by their index.
    #[must_use]
    pub fn from_args(args: Args<'_>) -> Self {
        let fields = match args {
            Args::Named(names, values) => names
                .iter()
                .cloned()
                .zip(values.iter().cloned().map(Field::Value))
                .collect(),
            Args::Positional(values) => values
                .iter()
                .enumerate()
                .map(|(idx, value)| (idx.to_string(), Field::Value(value.clone())))
                .collect(),
        };
        Record { fields }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, field)| field)
    }

    /// The plain value stored under `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&DbValue> {
        match self.get(key) {
            Some(Field::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// The related object stored under `key` by a one-to-one join.
    #[must_use]
    pub fn related(&self, key: &str) -> Option<&Hydrated> {
        match self.get(key) {
            Some(Field::One(related)) => related.as_ref(),
            _ => None,
        }
    }

    /// The list stored under `key` by a one-to-many join.
    #[must_use]
    pub fn children(&self, key: &str) -> Option<&[Hydrated]> {
        match self.get(key) {
            Some(Field::Many(children)) => Some(children),
            _ => None,
        }
    }

    /// Insert or overwrite `key`, keeping its original position.
    pub fn set(&mut self, key: impl Into<String>, field: Field) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = field,
            None => self.fields.push((key, field)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn attach(&mut self, key: &str, related: Attachment) -> Result<()> {
        match related {
            Attachment::One(related) => self.set(key, Field::One(related)),
            Attachment::Many(child) => {
                if self.get(key).is_none() {
                    self.set(key, Field::Many(Vec::new()));
                }
                match self.fields.iter_mut().find(|(k, _)| k == key) {
                    Some((_, Field::Many(children))) => children.extend(child),
                    _ => {
                        return Err(EmbraceError::Mapping(format!(
                            "record key {key:?} already holds a value that is not a list"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A constructed object.
///
/// Clones share the underlying instance, so identity survives being handed to several
/// parents; [`Hydrated::ptr_eq`] compares identity rather than value.
#[derive(Debug, Clone)]
pub enum Hydrated {
    Object(Rc<RefCell<dyn Entity>>),
    Map(Rc<RefCell<Record>>),
    Value(Rc<DbValue>),
}

impl Hydrated {
    pub fn object<T: Entity>(value: T) -> Self {
        Hydrated::Object(Rc::new(RefCell::new(value)))
    }

    #[must_use]
    pub fn map(record: Record) -> Self {
        Hydrated::Map(Rc::new(RefCell::new(record)))
    }

    #[must_use]
    pub fn value(value: DbValue) -> Self {
        Hydrated::Value(Rc::new(value))
    }

    /// Address of the shared instance; equal for clones of the same object.
    #[must_use]
    pub fn identity(&self) -> usize {
        match self {
            Hydrated::Object(rc) => Rc::as_ptr(rc).cast::<()>() as usize,
            Hydrated::Map(rc) => Rc::as_ptr(rc).cast::<()>() as usize,
            Hydrated::Value(rc) => Rc::as_ptr(rc).cast::<()>() as usize,
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Hydrated) -> bool {
        self.identity() == other.identity()
    }

    /// Borrow the object as `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Entity>(&self) -> Option<Ref<'_, T>> {
        match self {
            Hydrated::Object(rc) => {
                Ref::filter_map(rc.borrow(), |entity| (entity as &dyn Any).downcast_ref::<T>()).ok()
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<Ref<'_, Record>> {
        match self {
            Hydrated::Map(rc) => Some(rc.borrow()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&DbValue> {
        match self {
            Hydrated::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Hand `related` to this object under `attr`.
    ///
    /// # Errors
    /// Returns `EmbraceError::Mapping` if this is a plain value, the object is already
    /// borrowed, or the object rejects the attribute.
    pub fn attach(&self, attr: &str, related: Attachment) -> Result<()> {
        let busy = || EmbraceError::Mapping(format!("cannot attach {attr:?}: target is in use"));
        match self {
            Hydrated::Object(rc) => rc.try_borrow_mut().map_err(|_| busy())?.attach(attr, related),
            Hydrated::Map(rc) => rc.try_borrow_mut().map_err(|_| busy())?.attach(attr, related),
            Hydrated::Value(value) => Err(EmbraceError::Mapping(format!(
                "cannot attach {attr:?} to plain value {value}"
            ))),
        }
    }
}
