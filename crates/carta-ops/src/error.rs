//! Error types for image operations.

use thiserror::Error;

/// Error type for image operations.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unknown composite mode value.
    #[error("invalid composite mode: {0}")]
    InvalidMode(i64),

    /// Filter list did not parse.
    #[error("could not parse image_filters: {0}")]
    FilterParse(String),

    /// Scratch buffer could not be allocated.
    #[error(transparent)]
    Buffer(#[from] carta_core::Error),
}

/// Result type for image operations.
pub type OpsResult<T> = Result<T, OpsError>;
