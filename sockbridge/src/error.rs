use crate::native::SocketError;

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a façade call or of the operation it started.
#[derive(Debug, Error)]
pub enum Error {
    /// A required input was missing or malformed. Raised before any native
    /// call is issued.
    #[error("invalid argument `{name}`: {reason}")]
    Argument { name: &'static str, reason: String },

    /// The native layer reported a non-success outcome.
    #[error("socket operation failed: {status}")]
    Socket {
        status: SocketError,
        #[source]
        source: io::Error,
    },

    /// The destination host name could not be resolved.
    #[error("could not resolve host `{host}`")]
    NameResolution {
        host: String,
        #[source]
        source: io::Error,
    },

    /// A completion handler panicked on the completion thread.
    #[error("completion handler panicked: {0}")]
    HandlerPanicked(String),
}

impl Error {
    pub(crate) fn argument(name: &'static str, reason: impl Into<String>) -> Self {
        Error::Argument {
            name,
            reason: reason.into(),
        }
    }

    /// Builds a socket failure from a bare status code.
    pub fn from_status(status: SocketError) -> Self {
        Error::Socket {
            status,
            source: status.to_io(),
        }
    }

    /// Status code of a socket or name-resolution failure.
    pub fn status(&self) -> Option<SocketError> {
        match self {
            Error::Socket { status, .. } => Some(*status),
            Error::NameResolution { .. } => Some(SocketError::HostNotFound),
            Error::Argument { .. } | Error::HandlerPanicked(_) => None,
        }
    }

    pub fn is_argument(&self) -> bool {
        matches!(self, Error::Argument { .. })
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Socket {
            status: SocketError::from_io(&source),
            source,
        }
    }
}
