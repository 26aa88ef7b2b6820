//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define storage contracts for records and the revision ledger.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Record::validate()` before SQL
//!   mutations.
//! - Read paths must reject invalid persisted state instead of masking
//!   it.
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   DB transport errors.

use crate::db::DbError;
use crate::model::record::{RecordId, RecordValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod record_repo;
pub mod revision_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for record and revision persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(RecordValidationError),
    Db(DbError),
    NotFound(RecordId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
