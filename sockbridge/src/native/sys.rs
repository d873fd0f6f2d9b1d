//! Thin wrappers over the BSD socket calls used by the native layer.
//!
//! Every descriptor handed out here is non-blocking and close-on-exec.
//! Functions return `io::Result` built from `errno`; `WouldBlock` is left
//! for the caller to interpret.

use libc::{
    AF_INET, AF_INET6, F_GETFD, F_GETFL, F_SETFD, F_SETFL, FD_CLOEXEC, IPPROTO_IPV6, IPV6_V6ONLY,
    O_NONBLOCK, SHUT_RD, SHUT_RDWR, SHUT_WR, SO_ERROR, SO_REUSEADDR, SOL_SOCKET, c_int, c_void,
    iovec, msghdr, sockaddr, sockaddr_in, sockaddr_in6, sockaddr_storage, socklen_t,
};
use std::net::{Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::fd::RawFd;
use std::{io, mem};

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: c_int = 0;

fn check(rc: c_int) -> io::Result<c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

fn check_len(rc: isize) -> io::Result<usize> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc as usize)
    }
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe { libc::close(fd) };
}

/// Puts a descriptor in non-blocking, close-on-exec mode.
pub(crate) fn sys_prepare(fd: RawFd) -> io::Result<()> {
    let flags = check(unsafe { libc::fcntl(fd, F_GETFL) })?;
    check(unsafe { libc::fcntl(fd, F_SETFL, flags | O_NONBLOCK) })?;

    let flags = check(unsafe { libc::fcntl(fd, F_GETFD) })?;
    check(unsafe { libc::fcntl(fd, F_SETFD, flags | FD_CLOEXEC) })?;

    Ok(())
}

/// Creates a non-blocking socket for `family` with the given type.
pub(crate) fn sys_socket(family: c_int, ty: c_int) -> io::Result<RawFd> {
    let fd = check(unsafe { libc::socket(family, ty, 0) })?;

    if let Err(e) = sys_prepare(fd) {
        sys_close(fd);
        return Err(e);
    }

    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    if let Err(e) = sys_setsockopt(fd, SOL_SOCKET, libc::SO_NOSIGPIPE, 1) {
        sys_close(fd);
        return Err(e);
    }

    if family == AF_INET6 {
        // Dual-stack: accept IPv4-mapped peers on IPv6 sockets.
        let _ = sys_setsockopt(fd, IPPROTO_IPV6, IPV6_V6ONLY, 0);
    }

    Ok(fd)
}

/// Creates a non-blocking pipe, returning `(read, write)` ends.
pub(crate) fn sys_pipe() -> io::Result<(RawFd, RawFd)> {
    let mut fds = [0 as c_int; 2];
    check(unsafe { libc::pipe(fds.as_mut_ptr()) })?;

    for fd in fds {
        if let Err(e) = sys_prepare(fd) {
            sys_close(fds[0]);
            sys_close(fds[1]);
            return Err(e);
        }
    }

    Ok((fds[0], fds[1]))
}

fn sys_setsockopt(fd: RawFd, level: c_int, name: c_int, value: c_int) -> io::Result<()> {
    check(unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            &value as *const c_int as *const c_void,
            mem::size_of::<c_int>() as socklen_t,
        )
    })
    .map(drop)
}

/// Enables `SO_REUSEADDR` on a socket.
pub(crate) fn sys_set_reuseaddr(fd: RawFd) -> io::Result<()> {
    sys_setsockopt(fd, SOL_SOCKET, SO_REUSEADDR, 1)
}

/// Binds a socket to an address.
pub(crate) fn sys_bind(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = socketaddr_to_storage(addr);
    check(unsafe { libc::bind(fd, &storage as *const _ as *const sockaddr, len) }).map(drop)
}

/// Marks a socket as a listening socket.
pub(crate) fn sys_listen(fd: RawFd, backlog: c_int) -> io::Result<()> {
    check(unsafe { libc::listen(fd, backlog) }).map(drop)
}

/// Accepts a pending connection.
///
/// The returned socket is already non-blocking.
pub(crate) fn sys_accept(fd: RawFd) -> io::Result<RawFd> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let client = check(unsafe { libc::accept(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) })?;

    if let Err(e) = sys_prepare(client) {
        sys_close(client);
        return Err(e);
    }

    Ok(client)
}

/// Starts a connection attempt.
///
/// On a non-blocking socket this usually fails with `EINPROGRESS`.
pub(crate) fn sys_connect(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = socketaddr_to_storage(addr);
    check(unsafe { libc::connect(fd, &storage as *const _ as *const sockaddr, len) }).map(drop)
}

/// Returns (and clears) the pending error of a socket.
pub(crate) fn sys_take_error(fd: RawFd) -> io::Result<Option<io::Error>> {
    let mut value: c_int = 0;
    let mut len = mem::size_of::<c_int>() as socklen_t;

    check(unsafe {
        libc::getsockopt(
            fd,
            SOL_SOCKET,
            SO_ERROR,
            &mut value as *mut c_int as *mut c_void,
            &mut len,
        )
    })?;

    if value == 0 {
        Ok(None)
    } else {
        Ok(Some(io::Error::from_raw_os_error(value)))
    }
}

/// Shuts down a socket.
pub(crate) fn sys_shutdown(fd: RawFd, how: Shutdown) -> io::Result<()> {
    let how = match how {
        Shutdown::Read => SHUT_RD,
        Shutdown::Write => SHUT_WR,
        Shutdown::Both => SHUT_RDWR,
    };

    check(unsafe { libc::shutdown(fd, how) }).map(drop)
}

/// Returns the local address of a socket.
pub(crate) fn sys_sockname(fd: RawFd) -> io::Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    check(unsafe { libc::getsockname(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) })?;
    sockaddr_storage_to_socketaddr(&storage)
}

/// Returns the peer address of a connected socket.
pub(crate) fn sys_peername(fd: RawFd) -> io::Result<SocketAddr> {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    check(unsafe { libc::getpeername(fd, &mut storage as *mut _ as *mut sockaddr, &mut len) })?;
    sockaddr_storage_to_socketaddr(&storage)
}

/// Receives into one buffer.
pub(crate) fn sys_recv(fd: RawFd, buffer: &mut [u8], flags: c_int) -> io::Result<usize> {
    check_len(unsafe { libc::recv(fd, buffer.as_mut_ptr() as *mut c_void, buffer.len(), flags) })
}

/// Receives into several buffers at once.
pub(crate) fn sys_recv_vectored(fd: RawFd, buffers: &mut [&mut [u8]], flags: c_int) -> io::Result<usize> {
    let mut iov: Vec<iovec> = buffers
        .iter_mut()
        .map(|b| iovec {
            iov_base: b.as_mut_ptr() as *mut c_void,
            iov_len: b.len(),
        })
        .collect();

    let mut msg: msghdr = unsafe { mem::zeroed() };
    msg.msg_iov = iov.as_mut_ptr();
    msg.msg_iovlen = iov.len() as _;

    check_len(unsafe { libc::recvmsg(fd, &mut msg, flags) })
}

/// Sends one buffer. A zero-length buffer still reaches the kernel.
pub(crate) fn sys_send(fd: RawFd, buffer: &[u8], flags: c_int) -> io::Result<usize> {
    check_len(unsafe {
        libc::send(
            fd,
            buffer.as_ptr() as *const c_void,
            buffer.len(),
            flags | SEND_FLAGS,
        )
    })
}

/// Sends several buffers at once.
pub(crate) fn sys_send_vectored(fd: RawFd, buffers: &[&[u8]], flags: c_int) -> io::Result<usize> {
    let mut iov: Vec<iovec> = buffers
        .iter()
        .map(|b| iovec {
            iov_base: b.as_ptr() as *mut c_void,
            iov_len: b.len(),
        })
        .collect();

    let mut msg: msghdr = unsafe { mem::zeroed() };
    msg.msg_iov = iov.as_mut_ptr();
    msg.msg_iovlen = iov.len() as _;

    check_len(unsafe { libc::sendmsg(fd, &msg, flags | SEND_FLAGS) })
}

/// Sends one datagram to `addr`.
pub(crate) fn sys_send_to(
    fd: RawFd,
    buffer: &[u8],
    flags: c_int,
    addr: &SocketAddr,
) -> io::Result<usize> {
    let (storage, len) = socketaddr_to_storage(addr);

    check_len(unsafe {
        libc::sendto(
            fd,
            buffer.as_ptr() as *const c_void,
            buffer.len(),
            flags | SEND_FLAGS,
            &storage as *const _ as *const sockaddr,
            len,
        )
    })
}

/// Reads from a raw descriptor; used to drain the reactor wake pipe.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> io::Result<usize> {
    check_len(unsafe { libc::read(fd, buffer.as_mut_ptr() as *mut c_void, buffer.len()) })
}

/// Writes to a raw descriptor; used to signal the reactor wake pipe.
pub(crate) fn sys_write(fd: RawFd, buffer: &[u8]) -> io::Result<usize> {
    check_len(unsafe { libc::write(fd, buffer.as_ptr() as *const c_void, buffer.len()) })
}

/// Waits on a set of descriptors. `-1` blocks indefinitely.
pub(crate) fn sys_poll(fds: &mut [libc::pollfd], timeout_ms: c_int) -> io::Result<usize> {
    let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
    check(rc).map(|n| n as usize)
}

/// Address family matching a socket address.
pub(crate) fn family_of(addr: &SocketAddr) -> c_int {
    match addr {
        SocketAddr::V4(_) => AF_INET,
        SocketAddr::V6(_) => AF_INET6,
    }
}

/// Converts a `sockaddr_storage` to a Rust `SocketAddr`.
pub(crate) fn sockaddr_storage_to_socketaddr(storage: &sockaddr_storage) -> io::Result<SocketAddr> {
    match storage.ss_family as c_int {
        AF_INET => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in) };
            let ip = Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr));
            let port = u16::from_be(addr.sin_port);

            Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }

        AF_INET6 => {
            let addr = unsafe { &*(storage as *const _ as *const sockaddr_in6) };
            let ip = Ipv6Addr::from(addr.sin6_addr.s6_addr);
            let port = u16::from_be(addr.sin6_port);

            Ok(SocketAddr::V6(SocketAddrV6::new(
                ip,
                port,
                addr.sin6_flowinfo,
                addr.sin6_scope_id,
            )))
        }

        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unsupported address family",
        )),
    }
}

/// Converts a `SocketAddr` to a `sockaddr_storage`.
pub(crate) fn socketaddr_to_storage(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };

    match addr {
        SocketAddr::V4(v4) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in) };
            sa.sin_family = AF_INET as _;
            sa.sin_port = v4.port().to_be();
            sa.sin_addr.s_addr = u32::from(*v4.ip()).to_be();

            (storage, mem::size_of::<sockaddr_in>() as socklen_t)
        }

        SocketAddr::V6(v6) => {
            let sa = unsafe { &mut *(&mut storage as *mut _ as *mut sockaddr_in6) };
            sa.sin6_family = AF_INET6 as _;
            sa.sin6_port = v6.port().to_be();
            sa.sin6_addr.s6_addr = v6.ip().octets();
            sa.sin6_flowinfo = v6.flowinfo();
            sa.sin6_scope_id = v6.scope_id();

            (storage, mem::size_of::<sockaddr_in6>() as socklen_t)
        }
    }
}

/// Whether a failed call simply has to wait for readiness.
pub(crate) fn is_pending(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || matches!(err.raw_os_error(), Some(libc::EINPROGRESS) | Some(libc::EALREADY))
}
