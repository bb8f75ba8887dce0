//! Error types for the Toto engine.
//!
//! The merge itself never fails. These errors come from the edges: parsing
//! persisted state, validating local edits, and the storage collaborator.

use crate::{RecordId, Week};
use thiserror::Error;

/// All possible errors from the Toto engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("match not found: {0}")]
    MatchNotFound(RecordId),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("no guess for '{name}' in week {week}")]
    GuessNotFound { name: String, week: Week },

    // Validation errors
    #[error("user already exists: {0}")]
    DuplicateUser(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid week: {0}")]
    InvalidWeek(i64),

    #[error("wrong number of picks: expected {expected}, got {actual}")]
    PickCount { expected: usize, actual: usize },

    #[error("submissions are locked")]
    SubmissionsLocked,

    #[error("week {0} is pending deletion")]
    WeekPendingDeletion(Week),

    // State errors
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::UserNotFound("dana".into());
        assert_eq!(err.to_string(), "user not found: dana");

        let err = Error::PickCount {
            expected: 16,
            actual: 3,
        };
        assert_eq!(err.to_string(), "wrong number of picks: expected 16, got 3");

        let err = Error::GuessNotFound {
            name: "dana".into(),
            week: 4,
        };
        assert_eq!(err.to_string(), "no guess for 'dana' in week 4");
    }
}
