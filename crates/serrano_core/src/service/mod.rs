//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate access checks, repository calls and collaborator side
//!   effects into use-case level APIs.
//! - Keep transport layers decoupled from storage and authorization
//!   details.
//!
//! # Invariants
//! - Authorization failures surface as `Unauthorized`, never masked as
//!   `NotFound`; masking for information hiding is a boundary policy.
//! - A revision is appended only after the mutation it snapshots has
//!   succeeded.

use crate::collab::FieldError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod record_service;
pub mod revision_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error taxonomy exposed to the transport boundary.
#[derive(Debug)]
pub enum ServiceError {
    /// The identity lacks the required right. Distinct from `NotFound`
    /// to preserve the audit trail.
    Unauthorized,
    /// Record or revision does not exist, or does not belong to the
    /// referenced parent.
    NotFound,
    /// Content failed validation; carries field-level detail.
    Validation(Vec<FieldError>),
    /// Caller contract violation. Non-recoverable at this layer.
    InvalidRequest(&'static str),
    /// Storage transport failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "identity lacks the required right"),
            Self::NotFound => write!(f, "record or revision not found"),
            Self::Validation(errors) => {
                write!(f, "content validation failed:")?;
                for error in errors {
                    write!(f, " {}: {};", error.field, error.message)?;
                }
                Ok(())
            }
            Self::InvalidRequest(message) => write!(f, "invalid request: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(_) => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}
