use libc::c_int;
use std::ops::BitOr;

/// Flags forwarded to the native send and receive calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SocketFlags(c_int);

impl SocketFlags {
    pub const NONE: SocketFlags = SocketFlags(0);
    pub const PEEK: SocketFlags = SocketFlags(libc::MSG_PEEK);
    pub const OUT_OF_BAND: SocketFlags = SocketFlags(libc::MSG_OOB);
    pub const DONT_ROUTE: SocketFlags = SocketFlags(libc::MSG_DONTROUTE);

    pub fn contains(self, other: SocketFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub(crate) fn bits(self) -> c_int {
        self.0
    }
}

impl BitOr for SocketFlags {
    type Output = SocketFlags;

    fn bitor(self, rhs: SocketFlags) -> SocketFlags {
        SocketFlags(self.0 | rhs.0)
    }
}

/// What the native layer does with the connection once a file transmission
/// finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TransmitFileOptions(u8);

impl TransmitFileOptions {
    pub const USE_DEFAULT: TransmitFileOptions = TransmitFileOptions(0);
    /// Shut the connection down after the last byte is sent.
    pub const DISCONNECT: TransmitFileOptions = TransmitFileOptions(1);
    /// With `DISCONNECT`, leave the socket ready for another connect.
    pub const REUSE_SOCKET: TransmitFileOptions = TransmitFileOptions(2);

    pub fn contains(self, other: TransmitFileOptions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TransmitFileOptions {
    type Output = TransmitFileOptions;

    fn bitor(self, rhs: TransmitFileOptions) -> TransmitFileOptions {
        TransmitFileOptions(self.0 | rhs.0)
    }
}

/// Transport semantics of a [`Socket`](crate::Socket).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SocketKind {
    #[default]
    Stream,
    Datagram,
}

impl SocketKind {
    pub(crate) fn raw(self) -> c_int {
        match self {
            SocketKind::Stream => libc::SOCK_STREAM,
            SocketKind::Datagram => libc::SOCK_DGRAM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_combine() {
        let flags = SocketFlags::PEEK | SocketFlags::DONT_ROUTE;

        assert!(flags.contains(SocketFlags::PEEK));
        assert!(flags.contains(SocketFlags::DONT_ROUTE));
        assert!(!flags.contains(SocketFlags::OUT_OF_BAND));
        assert!(flags.contains(SocketFlags::NONE));
    }

    #[test]
    fn test_transmit_options_combine() {
        let options = TransmitFileOptions::DISCONNECT | TransmitFileOptions::REUSE_SOCKET;

        assert!(options.contains(TransmitFileOptions::DISCONNECT));
        assert!(options.contains(TransmitFileOptions::REUSE_SOCKET));
        assert!(!TransmitFileOptions::USE_DEFAULT.contains(TransmitFileOptions::DISCONNECT));
    }
}
