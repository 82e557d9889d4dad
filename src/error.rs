//! Error taxonomy for clinic operations.
//!
//! Every operation of the ledger and the record chain reports failures through
//! [`ClinicError`]. The HTTP layer maps each variant onto a status code; nothing
//! in this crate retries on its own.

use thiserror::Error;

/// Result alias used by all clinic operations.
pub type Result<T, E = ClinicError> = std::result::Result<T, E>;

/// Failures surfaced by the scheduling and clinical record operations.
#[derive(Debug, Error)]
pub enum ClinicError {
    /// Malformed or out-of-range input, e.g. a booking in the past.
    #[error("{0}")]
    Validation(String),
    /// The request collides with existing state, e.g. an occupied slot.
    #[error("{0}")]
    Conflict(String),
    /// A referenced record does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The caller is known but may not perform the action on this record.
    #[error("{0}")]
    Forbidden(String),
    /// The underlying SQLite store failed.
    #[error("storage failure: {0}")]
    Storage(#[source] rusqlite::Error),
    /// A JSON column could not be encoded.
    #[error("encoding failure: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ClinicError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

impl From<rusqlite::Error> for ClinicError {
    fn from(err: rusqlite::Error) -> Self {
        if is_unique_violation(&err) {
            Self::Conflict("The record conflicts with an existing entry".to_string())
        } else {
            Self::Storage(err)
        }
    }
}

/// Returns `true` when SQLite rejected a write because of a UNIQUE constraint
/// or unique index, including the partial index guarding booked slots.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}
