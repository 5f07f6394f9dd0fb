//! Error types for tidyinfer

use thiserror::Error;

/// tidyinfer error type
#[derive(Error, Debug)]
pub enum Error {
    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Role declaration error (unknown column, missing response, bad success level)
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Null hypothesis declaration error
    #[error("Invalid null hypothesis: {0}")]
    InvalidNull(String),

    /// Statistic not defined for the declared roles
    #[error("Incompatible statistic: {0}")]
    IncompatibleStatistic(String),

    /// Validation error (bad arguments, out-of-range values)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Combination that is well-formed but not supported
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Replicate generation was cancelled before completion
    #[error("Cancelled after {completed} of {requested} replicates")]
    Cancelled {
        /// Replicates finished before cancellation was observed.
        completed: usize,
        /// Replicates requested.
        requested: usize,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
