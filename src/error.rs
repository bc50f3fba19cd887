use std::fmt;

use thiserror::Error;

/// Boxed error raised by a driver adapter.
pub type BoxedDriverError = Box<dyn DriverError>;

pub type Result<T, E = EmbraceError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum EmbraceError {
    #[error("No result found")]
    NoResultFound,

    #[error("Multiple results found")]
    MultipleResultsFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Driver(BoxedDriverError),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Missing bind parameter: {0}")]
    MissingBindParameter(String),

    #[error("split_on column for group {group} not found: {split} (columns are {columns:?})")]
    SplitColumnNotFound {
        group: usize,
        split: String,
        columns: Vec<String>,
    },

    #[error(
        "{column:?} specified in key_columns does not exist in the returned columns for group {group} (mapped columns are {columns:?})"
    )]
    KeyColumnNotFound {
        group: usize,
        column: String,
        columns: Vec<String>,
    },

    #[error("Unsupported result type: {0}")]
    UnsupportedResultShape(String),

    #[error("Can't find paramstyle for connection {0}")]
    UnknownParamStyle(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Rows for group {group} are not contiguous: a completed object reappeared at row {row}")]
    ContiguityViolation { group: usize, row: usize },
}

impl EmbraceError {
    /// The mirrored DB-API class, when this error was re-homed from a driver.
    #[must_use]
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            EmbraceError::Database(err) => Some(err.class),
            _ => None,
        }
    }
}

/// The DB-API exception names that driver errors are re-homed onto.
///
/// Drivers define structurally parallel hierarchies using these conventional names; this
/// enum is the one stable copy callers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Error,
    InterfaceError,
    DatabaseError,
    DataError,
    OperationalError,
    IntegrityError,
    InternalError,
    ProgrammingError,
    NotSupportedError,
}

impl ErrorClass {
    const ALL: [ErrorClass; 9] = [
        ErrorClass::Error,
        ErrorClass::InterfaceError,
        ErrorClass::DatabaseError,
        ErrorClass::DataError,
        ErrorClass::OperationalError,
        ErrorClass::IntegrityError,
        ErrorClass::InternalError,
        ErrorClass::ProgrammingError,
        ErrorClass::NotSupportedError,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ErrorClass::Error => "Error",
            ErrorClass::InterfaceError => "InterfaceError",
            ErrorClass::DatabaseError => "DatabaseError",
            ErrorClass::DataError => "DataError",
            ErrorClass::OperationalError => "OperationalError",
            ErrorClass::IntegrityError => "IntegrityError",
            ErrorClass::InternalError => "InternalError",
            ErrorClass::ProgrammingError => "ProgrammingError",
            ErrorClass::NotSupportedError => "NotSupportedError",
        }
    }

    /// Match a driver class name against the mirror hierarchy.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.name() == name)
    }

    #[must_use]
    pub fn parent(self) -> Option<Self> {
        match self {
            ErrorClass::Error => None,
            ErrorClass::InterfaceError | ErrorClass::DatabaseError => Some(ErrorClass::Error),
            ErrorClass::DataError
            | ErrorClass::OperationalError
            | ErrorClass::IntegrityError
            | ErrorClass::InternalError
            | ErrorClass::ProgrammingError
            | ErrorClass::NotSupportedError => Some(ErrorClass::DatabaseError),
        }
    }

    /// True when `self` is `ancestor` or one of its subclasses.
    #[must_use]
    pub fn is_a(self, ancestor: ErrorClass) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class == ancestor {
                return true;
            }
            current = class.parent();
        }
        false
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Implemented by every error a driver adapter can return from `execute`/`fetch_one`.
pub trait DriverError: std::error::Error + Send + Sync + 'static {
    /// The driver's own class hierarchy, most specific first.
    ///
    /// Defaults to the last path segment of the implementing type's name, so an error
    /// type called `IntegrityError` is re-homed without further configuration.
    fn class_names(&self) -> Vec<&str> {
        vec![short_type_name(std::any::type_name::<Self>())]
    }

    /// Structured classification; takes precedence over name matching when present.
    fn error_class(&self) -> Option<ErrorClass> {
        None
    }

    /// Arguments carried across when the error is re-homed.
    fn args(&self) -> Vec<String> {
        vec![self.to_string()]
    }
}

/// A driver error re-homed under [`ErrorClass`]. The original error is kept as `source()`.
#[derive(Debug)]
pub struct DatabaseError {
    pub class: ErrorClass,
    pub args: Vec<String>,
    source: BoxedDriverError,
}

impl DatabaseError {
    #[must_use]
    pub fn original(&self) -> &dyn DriverError {
        self.source.as_ref()
    }

    #[must_use]
    pub fn into_original(self) -> BoxedDriverError {
        self.source
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.args.join(", "))
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Re-home a driver error onto the mirror hierarchy.
///
/// The structured marker wins; otherwise the driver's class names are matched by name, most
/// specific first. Name matching cannot tell an unrelated class that happens to share a
/// DB-API name from a real one. Errors that match nothing are passed through unchanged.
#[must_use]
pub fn rehome(err: BoxedDriverError) -> EmbraceError {
    let class = err.error_class().or_else(|| {
        err.class_names()
            .into_iter()
            .find_map(ErrorClass::from_name)
    });
    match class {
        Some(class) => EmbraceError::Database(DatabaseError {
            class,
            args: err.args(),
            source: err,
        }),
        None => EmbraceError::Driver(err),
    }
}

pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
