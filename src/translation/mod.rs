//! Bind-parameter compilation.
//!
//! Templates use symbolic placeholders which are rewritten into whatever syntax the target
//! driver expects:
//!
//! | placeholder              | meaning                                                   |
//! |--------------------------|-----------------------------------------------------------|
//! | `:name`, `:v:name`       | bound value (a list expands to `a, b, c`)                 |
//! | `:r:name`, `:raw:name`   | value text spliced in verbatim, **not escaped**           |
//! | `:i:name`, `:identifier:name` | ANSI-quoted identifier                               |
//! | `:t:name`, `:tuple:name` | list expanded to `(a, b, c)`                              |
//! | `:t*:name`, `:tuple*:name` | list of lists expanded to `(a, b), (c, d)`              |
//!
//! Placeholders inside string literals, quoted identifiers, comments and dollar-quoted
//! bodies are left alone, as are colons preceded by `\` or `:` (so `x::int` casts survive).

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::EmbraceError;
use crate::types::{BindArgs, BindParams, BindValue, DbValue};

mod parsers;
mod scanner;

pub(crate) use parsers::{is_block_comment_start, is_line_comment_start};
pub(crate) use scanner::{State, step};

use parsers::parse_placeholder;

/// A driver's placeholder convention (the DB-API `paramstyle`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// `WHERE a = ?`
    Qmark,
    /// `WHERE a = :1`
    Numeric,
    /// `WHERE a = %s`
    Format,
    /// `WHERE a = %(name)s`
    Pyformat,
    /// `WHERE a = :name`
    Named,
}

impl PlaceholderStyle {
    /// Whether parameters are passed to the driver keyed by name.
    #[must_use]
    pub fn is_named(self) -> bool {
        matches!(self, PlaceholderStyle::Named | PlaceholderStyle::Pyformat)
    }

    /// `format`-family drivers interpret `%`, so literal percent signs must be doubled.
    #[must_use]
    pub fn doubles_percent(self) -> bool {
        matches!(self, PlaceholderStyle::Format | PlaceholderStyle::Pyformat)
    }

    #[must_use]
    pub fn empty_params(self) -> BindParams {
        if self.is_named() {
            BindParams::Named(Vec::new())
        } else {
            BindParams::Positional(Vec::new())
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PlaceholderStyle::Qmark => "qmark",
            PlaceholderStyle::Numeric => "numeric",
            PlaceholderStyle::Format => "format",
            PlaceholderStyle::Pyformat => "pyformat",
            PlaceholderStyle::Named => "named",
        }
    }
}

impl fmt::Display for PlaceholderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaceholderStyle {
    type Err = EmbraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qmark" => Ok(PlaceholderStyle::Qmark),
            "numeric" => Ok(PlaceholderStyle::Numeric),
            "format" => Ok(PlaceholderStyle::Format),
            "pyformat" => Ok(PlaceholderStyle::Pyformat),
            "named" => Ok(PlaceholderStyle::Named),
            other => Err(EmbraceError::Config(format!("unknown paramstyle {other:?}"))),
        }
    }
}

/// SQL text and parameters ready to hand to a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: BindParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaceholderKind {
    Value,
    Raw,
    Identifier,
    Tuple,
    TupleList,
}

impl PlaceholderKind {
    fn parse(code: Option<&str>) -> Result<Self, EmbraceError> {
        match code {
            None | Some("v" | "value") => Ok(PlaceholderKind::Value),
            Some("r" | "raw") => Ok(PlaceholderKind::Raw),
            Some("i" | "identifier") => Ok(PlaceholderKind::Identifier),
            Some("t" | "tuple") => Ok(PlaceholderKind::Tuple),
            Some("t*" | "tuple*") => Ok(PlaceholderKind::TupleList),
            Some(other) => Err(EmbraceError::Template(format!(
                "unknown placeholder type {other:?}"
            ))),
        }
    }
}

/// Allocates placeholder tokens in the target style and collects the bound values.
struct ParamWriter {
    style: PlaceholderStyle,
    positional: Vec<DbValue>,
    named: Vec<(String, DbValue)>,
    generated: usize,
}

impl ParamWriter {
    fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            positional: Vec::new(),
            named: Vec::new(),
            generated: 0,
        }
    }

    fn bind(&mut self, name: &str, value: &DbValue) -> String {
        match self.style {
            PlaceholderStyle::Qmark => {
                self.positional.push(value.clone());
                "?".to_string()
            }
            PlaceholderStyle::Numeric => {
                self.positional.push(value.clone());
                format!(":{}", self.positional.len())
            }
            PlaceholderStyle::Format => {
                self.positional.push(value.clone());
                "%s".to_string()
            }
            PlaceholderStyle::Pyformat => {
                self.bind_named(name, value);
                format!("%({name})s")
            }
            PlaceholderStyle::Named => {
                self.bind_named(name, value);
                format!(":{name}")
            }
        }
    }

    fn bind_named(&mut self, name: &str, value: &DbValue) {
        if !self.named.iter().any(|(n, _)| n == name) {
            self.named.push((name.to_string(), value.clone()));
        }
    }

    /// A fresh name for one element of an expanded sequence.
    fn sub_name(&mut self, name: &str) -> String {
        self.generated += 1;
        format!("_{name}_{}", self.generated)
    }

    fn bind_sequence(&mut self, name: &str, items: &[BindValue]) -> Result<String, EmbraceError> {
        let mut placeholders = Vec::with_capacity(items.len());
        for item in items {
            let BindValue::Value(value) = item else {
                return Err(EmbraceError::Template(format!(
                    "nested sequence in :{name}; use :t*:{name} for a list of tuples"
                )));
            };
            let sub = self.sub_name(name);
            placeholders.push(self.bind(&sub, value));
        }
        Ok(placeholders.join(", "))
    }

    fn bind_tuple(&mut self, name: &str, value: &BindValue) -> Result<String, EmbraceError> {
        let BindValue::List(items) = value else {
            return Err(EmbraceError::Template(format!(
                ":t:{name} expects a sequence, got a single value"
            )));
        };
        Ok(format!("({})", self.bind_sequence(name, items)?))
    }

    fn finish(self) -> BindParams {
        if self.style.is_named() {
            BindParams::Named(self.named)
        } else {
            BindParams::Positional(self.positional)
        }
    }
}

/// Quote `name` as an ANSI SQL identifier.
///
/// # Errors
/// Returns `EmbraceError::Template` if the identifier contains a NUL byte.
pub fn quote_identifier(name: &str) -> Result<String, EmbraceError> {
    if name.contains('\0') {
        return Err(EmbraceError::Template(format!(
            "identifier {name:?} contains a NUL byte"
        )));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

fn render_identifier(value: &BindValue) -> Result<String, EmbraceError> {
    match value {
        BindValue::Value(value) => quote_identifier(&value.to_string()),
        BindValue::List(parts) => parts
            .iter()
            .map(render_identifier)
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.join(".")),
    }
}

fn render_raw(value: &BindValue) -> String {
    match value {
        BindValue::Value(value) => value.to_string(),
        BindValue::List(items) => items.iter().map(render_raw).collect::<Vec<_>>().join(", "),
    }
}

/// Rewrite the symbolic placeholders in `sql` for `style`, binding values from `args`.
///
/// A template without placeholders is returned unchanged with an empty parameter container.
///
/// ```rust
/// use sql_embrace::prelude::*;
///
/// let compiled = compile_bind_parameters(
///     PlaceholderStyle::Qmark,
///     "SELECT * FROM t WHERE id IN :t:ids",
///     &bind_args! { "ids" => BindValue::list([1, 2, 3]) },
/// )?;
/// assert_eq!(compiled.sql, "SELECT * FROM t WHERE id IN (?, ?, ?)");
/// # Ok::<(), EmbraceError>(())
/// ```
///
/// # Errors
/// Returns `EmbraceError::Template` for an unknown placeholder kind or a value of the wrong
/// shape, and `EmbraceError::MissingBindParameter` when `args` lacks a referenced name.
pub fn compile_bind_parameters(
    style: PlaceholderStyle,
    sql: &str,
    args: &BindArgs,
) -> Result<CompiledStatement, EmbraceError> {
    let bytes = sql.as_bytes();
    let double_percent = style.doubles_percent();
    let mut out = String::with_capacity(sql.len() + 16);
    let mut writer = ParamWriter::new(style);
    let mut state = State::Normal;
    let mut found = 0usize;
    // Everything before `copied` has already been written to `out`.
    let mut copied = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];

        if b == b'%' && double_percent {
            out.push_str(&sql[copied..=idx]);
            out.push('%');
            copied = idx + 1;
            idx += 1;
            continue;
        }

        if state == State::Normal
            && b == b':'
            && !(idx > 0 && matches!(bytes[idx - 1], b'\\' | b':'))
            && let Some(placeholder) = parse_placeholder(bytes, idx)
        {
            let kind = PlaceholderKind::parse(placeholder.kind)?;
            let name = placeholder.name;
            let value = args
                .get(name)
                .ok_or_else(|| EmbraceError::MissingBindParameter(name.to_string()))?;

            let rendered = match (kind, value) {
                (PlaceholderKind::Value, BindValue::Value(v)) => writer.bind(name, v),
                (PlaceholderKind::Value, BindValue::List(items)) => {
                    writer.bind_sequence(name, items)?
                }
                (PlaceholderKind::Raw, value) => render_raw(value),
                (PlaceholderKind::Identifier, value) => render_identifier(value)?,
                (PlaceholderKind::Tuple, value) => writer.bind_tuple(name, value)?,
                (PlaceholderKind::TupleList, BindValue::List(rows)) => rows
                    .iter()
                    .map(|row| writer.bind_tuple(name, row))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", "),
                (PlaceholderKind::TupleList, BindValue::Value(_)) => {
                    return Err(EmbraceError::Template(format!(
                        ":t*:{name} expects a sequence of sequences"
                    )));
                }
            };

            out.push_str(&sql[copied..idx]);
            out.push_str(&rendered);
            found += 1;
            copied = placeholder.end;
            idx = placeholder.end;
            continue;
        }

        idx = step(&mut state, bytes, idx) + 1;
    }

    if found == 0 {
        return Ok(CompiledStatement {
            sql: sql.to_string(),
            params: style.empty_params(),
        });
    }

    out.push_str(&sql[copied..]);
    Ok(CompiledStatement {
        sql: out,
        params: writer.finish(),
    })
}
