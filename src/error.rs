//! Error types for the scorecard engine.

use thiserror::Error;

/// Result type alias using [`ScorecardError`].
pub type Result<T> = std::result::Result<T, ScorecardError>;

/// Errors surfaced by the catalog and query engine.
#[derive(Debug, Error)]
pub enum ScorecardError {
    /// The store could not be introspected at startup. The hosting process
    /// must not begin accepting requests when this is returned.
    #[error("catalog startup failed: {reason}")]
    Startup { reason: String },

    /// A request parameter is not in the catalog, a range has min > max, or
    /// the sole requested row does not exist. Validation failures and
    /// missing data are deliberately conflated into one kind.
    #[error("not found")]
    NotFound,

    /// A query failed after validation passed. Never retried.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl ScorecardError {
    pub(crate) fn startup(reason: impl Into<String>) -> Self {
        ScorecardError::Startup {
            reason: reason.into(),
        }
    }
}
