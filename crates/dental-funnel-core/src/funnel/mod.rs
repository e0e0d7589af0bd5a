//! Funnel workflow: status transitions, callback ledger, journey mirroring
//! and recall scheduling.
//!
//! Every function here mutates one in-memory [`Patient`](crate::models::Patient)
//! and mirrors the change into the active journey through [`propagate`].
//! Persistence and transactions live in [`crate::service`].

mod journey;
mod ledger;
mod outcome;
mod recall;
mod transition;

pub use journey::*;
pub use ledger::*;
pub use outcome::*;
pub use recall::*;
pub use transition::*;

use thiserror::Error;

use crate::db::DbError;
use crate::models::UnknownVariant;

/// Workflow errors.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Patient not found: {0}")]
    NotFound(String),

    #[error("Callback not found: {0}")]
    CallbackNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(DbError),
}

impl From<DbError> for WorkflowError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => WorkflowError::NotFound(what),
            other => WorkflowError::Database(other),
        }
    }
}

impl From<UnknownVariant> for WorkflowError {
    fn from(e: UnknownVariant) -> Self {
        WorkflowError::InvalidInput(e.to_string())
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Reject strings that are not ISO-8601 dates or datetimes.
pub(crate) fn require_date(field: &str, value: &str) -> WorkflowResult<()> {
    normalize_date(field, value).map(|_| ())
}

/// Reduce an ISO-8601 date or datetime to `YYYY-MM-DD`.
pub(crate) fn normalize_date(field: &str, value: &str) -> WorkflowResult<String> {
    match crate::dates::parse_date(value) {
        Some(date) => Ok(crate::dates::format_date(date)),
        None => Err(WorkflowError::InvalidInput(format!(
            "{} is not a valid date: {}",
            field, value
        ))),
    }
}
