//! Row-to-object hydration.
//!
//! A [`Returning`] declaration splits each row into column groups, builds one object per
//! group through its [`MapObject`], and optionally attaches objects to each other with
//! [`one_to_one`] / [`one_to_many`] joins. Identity is preserved within one execution: rows
//! that share a declared key (or, without a key, identical adjacent values) resolve to the
//! same [`Hydrated`] instance.

mod join;
mod maker;
mod mapper;
mod object;
mod rowspec;

pub use mapper::MappedRows;
pub use object::{Args, Attachment, Entity, Field, FromColumns, Hydrated, Record};
pub use rowspec::{Arity, Factory, GroupRef, JoinSpec, MapObject, Returning, one_to_many, one_to_one};

pub(crate) use mapper::RowMapper;
pub(crate) use rowspec::RowSpec;
