//! Host error taxonomy.
//!
//! Every failure that reaches host code is one of five kinds. Argument
//! problems are [`Error::Type`] and are always raised on the calling thread;
//! failures inside delegated work keep the library's message unchanged and
//! surface as [`Error::Internal`].

use thiserror::Error;

/// Error kind, independent of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing argument, wrong host type, or bad option value.
    Type,
    /// A reader could not be created for a file or byte string.
    Load,
    /// `image_filters` did not parse.
    FilterParse,
    /// Failure inside the imaging library.
    Internal,
    /// Operation not available in this build.
    Unsupported,
}

/// Host-visible error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Argument coercion failure.
    #[error("{0}")]
    Type(String),

    /// Loader failure.
    #[error("{0}")]
    Load(String),

    /// Filter list parse failure.
    #[error("{0}")]
    FilterParse(String),

    /// Delegated work failure.
    #[error("{0}")]
    Internal(String),

    /// Unsupported operation.
    #[error("{0}")]
    Unsupported(String),
}

impl Error {
    /// Creates a [`Error::Type`] error.
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    /// Creates a [`Error::Load`] error.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    /// Kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Type(_) => ErrorKind::Type,
            Self::Load(_) => ErrorKind::Load,
            Self::FilterParse(_) => ErrorKind::FilterParse,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    /// Message as delivered to host code.
    pub fn message(&self) -> &str {
        match self {
            Self::Type(m) | Self::Load(m) | Self::FilterParse(m) | Self::Internal(m) | Self::Unsupported(m) => m,
        }
    }
}

impl From<carta_core::Error> for Error {
    fn from(e: carta_core::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<carta_io::IoError> for Error {
    fn from(e: carta_io::IoError) -> Self {
        Self::Internal(e.to_string())
    }
}

#[cfg(feature = "composite")]
impl From<carta_ops::OpsError> for Error {
    fn from(e: carta_ops::OpsError) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegated_messages_are_kept() {
        let core = carta_core::Error::invalid_dimensions(1, 2, "bad");
        let msg = core.to_string();
        let err = Error::from(core);
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), msg);
        assert_eq!(err.to_string(), msg);
    }

    #[test]
    fn kinds() {
        assert_eq!(Error::type_error("x").kind(), ErrorKind::Type);
        assert_eq!(Error::load("x").kind(), ErrorKind::Load);
        assert_eq!(Error::FilterParse("x".into()).kind(), ErrorKind::FilterParse);
        assert_eq!(Error::Unsupported("x".into()).kind(), ErrorKind::Unsupported);
    }
}
