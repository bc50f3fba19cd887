use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::EmbraceError;

/// How the cursor of an executed query is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResultShape {
    /// The first row, or nothing.
    First,
    /// Exactly one row; zero or several rows are errors.
    One,
    /// Same as `One`.
    #[serde(alias = "exactly_one")]
    ExactlyOne,
    /// At most one row.
    #[serde(alias = "one_or_none")]
    OneOrNone,
    /// Every row, fetched lazily.
    #[default]
    Many,
    /// First column of the single row.
    Scalar,
    /// First column of every row, fetched lazily.
    Column,
    /// The driver's affected-row count.
    Affected,
    /// The live cursor.
    Cursor,
}

impl ResultShape {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResultShape::First => "first",
            ResultShape::One => "one",
            ResultShape::ExactlyOne => "exactly-one",
            ResultShape::OneOrNone => "one-or-none",
            ResultShape::Many => "many",
            ResultShape::Scalar => "scalar",
            ResultShape::Column => "column",
            ResultShape::Affected => "affected",
            ResultShape::Cursor => "cursor",
        }
    }
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the names above, their snake_case spellings, and the template aliases `1`, `*`,
/// `n`, `=1`, `?` and `raw`.
impl FromStr for ResultShape {
    type Err = EmbraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(ResultShape::First),
            "one" | "1" => Ok(ResultShape::One),
            "exactly-one" | "exactly_one" | "=1" => Ok(ResultShape::ExactlyOne),
            "one-or-none" | "one_or_none" | "?" => Ok(ResultShape::OneOrNone),
            "many" | "*" => Ok(ResultShape::Many),
            "scalar" => Ok(ResultShape::Scalar),
            "column" => Ok(ResultShape::Column),
            "affected" | "n" => Ok(ResultShape::Affected),
            "cursor" | "raw" => Ok(ResultShape::Cursor),
            other => Err(EmbraceError::UnsupportedResultShape(other.to_string())),
        }
    }
}

/// Per-call options for executing a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Log the rewritten SQL and parameters before each statement.
    pub debug: bool,
    /// Override the query's declared result shape.
    pub result: Option<ResultShape>,
}

impl ExecOptions {
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_result(mut self, result: ResultShape) -> Self {
        self.result = Some(result);
        self
    }
}
