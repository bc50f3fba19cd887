use rusqlite::ErrorCode;
use thiserror::Error;

use crate::error::{BoxedDriverError, DriverError, ErrorClass};

/// A `rusqlite` failure, classified onto the DB-API hierarchy by its result code.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct SqliteError(#[from] pub rusqlite::Error);

impl SqliteError {
    pub(crate) fn boxed(err: rusqlite::Error) -> BoxedDriverError {
        Box::new(SqliteError(err))
    }
}

impl DriverError for SqliteError {
    fn error_class(&self) -> Option<ErrorClass> {
        let class = match &self.0 {
            rusqlite::Error::SqliteFailure(err, _) => match err.code {
                ErrorCode::ConstraintViolation => ErrorClass::IntegrityError,
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::ReadOnly
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
                | ErrorCode::OperationInterrupted
                | ErrorCode::PermissionDenied => ErrorClass::OperationalError,
                ErrorCode::ApiMisuse | ErrorCode::ParameterOutOfRange => ErrorClass::ProgrammingError,
                ErrorCode::TypeMismatch | ErrorCode::TooBig => ErrorClass::DataError,
                ErrorCode::InternalMalfunction => ErrorClass::InternalError,
                _ => ErrorClass::DatabaseError,
            },
            rusqlite::Error::InvalidParameterName(_)
            | rusqlite::Error::InvalidParameterCount(..)
            | rusqlite::Error::MultipleStatement
            | rusqlite::Error::InvalidQuery => ErrorClass::ProgrammingError,
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::ToSqlConversionFailure(_) => ErrorClass::DataError,
            _ => ErrorClass::DatabaseError,
        };
        Some(class)
    }
}
