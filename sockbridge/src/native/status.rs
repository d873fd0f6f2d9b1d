use std::fmt;
use std::io;

/// Status code reported by the native layer for a finished operation.
///
/// The event-completion mechanism hands this code over explicitly; the
/// callback-pair mechanism derives it from the error returned by the end
/// step. Either way it ends up in [`Error::Socket`](crate::Error::Socket).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocketError {
    Success,
    WouldBlock,
    Interrupted,
    ConnectionRefused,
    ConnectionReset,
    ConnectionAborted,
    NotConnected,
    AddressInUse,
    AddressNotAvailable,
    TimedOut,
    HostNotFound,
    HostUnreachable,
    NetworkUnreachable,
    Shutdown,
    InvalidArgument,
    OperationAborted,
    /// Any other OS error, carrying the raw code when one is known.
    Other(Option<i32>),
}

impl SocketError {
    /// Classifies an I/O error into a status code.
    pub fn from_io(err: &io::Error) -> Self {
        if err.raw_os_error() == Some(libc::ECANCELED) {
            return SocketError::OperationAborted;
        }

        match err.kind() {
            io::ErrorKind::WouldBlock => SocketError::WouldBlock,
            io::ErrorKind::Interrupted => SocketError::Interrupted,
            io::ErrorKind::ConnectionRefused => SocketError::ConnectionRefused,
            io::ErrorKind::ConnectionReset => SocketError::ConnectionReset,
            io::ErrorKind::ConnectionAborted => SocketError::ConnectionAborted,
            io::ErrorKind::NotConnected => SocketError::NotConnected,
            io::ErrorKind::AddrInUse => SocketError::AddressInUse,
            io::ErrorKind::AddrNotAvailable => SocketError::AddressNotAvailable,
            io::ErrorKind::TimedOut => SocketError::TimedOut,
            io::ErrorKind::HostUnreachable => SocketError::HostUnreachable,
            io::ErrorKind::NetworkUnreachable => SocketError::NetworkUnreachable,
            io::ErrorKind::BrokenPipe => SocketError::Shutdown,
            io::ErrorKind::InvalidInput => SocketError::InvalidArgument,
            _ => SocketError::Other(err.raw_os_error()),
        }
    }

    pub fn is_success(self) -> bool {
        self == SocketError::Success
    }

    /// Rebuilds an I/O error for a non-success status.
    pub fn to_io(self) -> io::Error {
        let kind = match self {
            SocketError::Other(Some(code)) => return io::Error::from_raw_os_error(code),
            SocketError::OperationAborted => return io::Error::from_raw_os_error(libc::ECANCELED),
            SocketError::Other(None) | SocketError::Success => io::ErrorKind::Other,
            SocketError::WouldBlock => io::ErrorKind::WouldBlock,
            SocketError::Interrupted => io::ErrorKind::Interrupted,
            SocketError::ConnectionRefused => io::ErrorKind::ConnectionRefused,
            SocketError::ConnectionReset => io::ErrorKind::ConnectionReset,
            SocketError::ConnectionAborted => io::ErrorKind::ConnectionAborted,
            SocketError::NotConnected => io::ErrorKind::NotConnected,
            SocketError::AddressInUse => io::ErrorKind::AddrInUse,
            SocketError::AddressNotAvailable => io::ErrorKind::AddrNotAvailable,
            SocketError::TimedOut => io::ErrorKind::TimedOut,
            SocketError::HostNotFound => io::ErrorKind::NotFound,
            SocketError::HostUnreachable => io::ErrorKind::HostUnreachable,
            SocketError::NetworkUnreachable => io::ErrorKind::NetworkUnreachable,
            SocketError::Shutdown => io::ErrorKind::BrokenPipe,
            SocketError::InvalidArgument => io::ErrorKind::InvalidInput,
        };

        io::Error::new(kind, self.to_string())
    }
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SocketError::Success => "success",
            SocketError::WouldBlock => "operation would block",
            SocketError::Interrupted => "operation interrupted",
            SocketError::ConnectionRefused => "connection refused",
            SocketError::ConnectionReset => "connection reset by peer",
            SocketError::ConnectionAborted => "connection aborted",
            SocketError::NotConnected => "socket is not connected",
            SocketError::AddressInUse => "address already in use",
            SocketError::AddressNotAvailable => "address not available",
            SocketError::TimedOut => "operation timed out",
            SocketError::HostNotFound => "host not found",
            SocketError::HostUnreachable => "host unreachable",
            SocketError::NetworkUnreachable => "network unreachable",
            SocketError::Shutdown => "socket has been shut down",
            SocketError::InvalidArgument => "invalid argument",
            SocketError::OperationAborted => "operation aborted",
            SocketError::Other(Some(code)) => return write!(f, "os error {code}"),
            SocketError::Other(None) => "unknown socket error",
        };

        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_survives_io_conversion() {
        for status in [
            SocketError::ConnectionReset,
            SocketError::ConnectionRefused,
            SocketError::NotConnected,
            SocketError::Shutdown,
            SocketError::OperationAborted,
        ] {
            assert_eq!(SocketError::from_io(&status.to_io()), status);
        }
    }

    #[test]
    fn test_raw_os_code_is_kept() {
        let err = io::Error::from_raw_os_error(libc::ENOTSOCK);
        let status = SocketError::from_io(&err);

        assert_eq!(status, SocketError::Other(Some(libc::ENOTSOCK)));
        assert_eq!(status.to_io().raw_os_error(), Some(libc::ENOTSOCK));
    }
}
