//! Error types for I/O operations.

use std::io;
use thiserror::Error;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Unsupported format or format string.
    #[error("unknown file type: {0}")]
    UnsupportedFormat(String),

    /// Decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Pixel buffer could not be created for the decoded image.
    #[error(transparent)]
    Buffer(#[from] carta_core::Error),
}

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;
