use super::flags::SocketKind;
use super::job::{Job, Progress};
use super::reactor::{self, Notify};
use super::resolver;
use super::sys::*;
use super::{
    AsyncCallback, AsyncResult, CallbackPair, CompletionArgs, EventCompletion, Mechanism,
    NativeSocket, Refused, Request, SocketError, Submission,
};

use libc::c_int;
use std::fmt;
use std::io;
use std::net::{Shutdown, SocketAddr};
use std::os::fd::RawFd;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum Descriptor {
    /// No OS socket yet; one is created by the first bind, connect or
    /// send_to, for the family of the address involved.
    Unopened,
    Open { fd: RawFd, family: c_int },
    Closed,
}

pub(crate) struct SocketInner {
    kind: SocketKind,
    mechanism: Mechanism,
    reuse_address: bool,
    descriptor: Mutex<Descriptor>,
}

/// A non-blocking OS socket exposing both completion mechanisms.
///
/// Cloning is cheap and yields another handle to the same socket. The
/// descriptor is closed by [`Socket::close`], by a disconnect that does not
/// reuse the socket, or when the last handle is dropped.
#[derive(Clone)]
pub struct Socket {
    inner: Arc<SocketInner>,
}

/// Configures a [`Socket`] before it is created.
#[derive(Clone, Copy, Debug, Default)]
pub struct SocketBuilder {
    kind: SocketKind,
    mechanism: Mechanism,
    reuse_address: bool,
}

impl SocketBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: SocketKind) -> Self {
        self.kind = kind;
        self
    }

    /// Overrides the mechanism picked by the `event-completion` feature.
    pub fn mechanism(mut self, mechanism: Mechanism) -> Self {
        self.mechanism = mechanism;
        self
    }

    /// Sets `SO_REUSEADDR` on every descriptor this socket opens.
    pub fn reuse_address(mut self, enabled: bool) -> Self {
        self.reuse_address = enabled;
        self
    }

    pub fn build(self) -> Socket {
        Socket::with_descriptor(self, Descriptor::Unopened)
    }
}

impl Socket {
    /// A stream socket using the default mechanism.
    pub fn new() -> Self {
        SocketBuilder::new().build()
    }

    pub fn builder() -> SocketBuilder {
        SocketBuilder::new()
    }

    fn with_descriptor(builder: SocketBuilder, descriptor: Descriptor) -> Self {
        Self {
            inner: Arc::new(SocketInner {
                kind: builder.kind,
                mechanism: builder.mechanism,
                reuse_address: builder.reuse_address,
                descriptor: Mutex::new(descriptor),
            }),
        }
    }

    /// Wraps a descriptor returned by accept.
    pub(crate) fn accepted(&self, fd: RawFd, family: c_int) -> Socket {
        let builder = SocketBuilder {
            kind: self.inner.kind,
            mechanism: self.inner.mechanism,
            reuse_address: false,
        };

        Socket::with_descriptor(builder, Descriptor::Open { fd, family })
    }

    pub fn kind(&self) -> SocketKind {
        self.inner.kind
    }

    fn descriptor(&self) -> MutexGuard<'_, Descriptor> {
        self.inner
            .descriptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The current descriptor.
    pub(crate) fn fd(&self) -> io::Result<RawFd> {
        match *self.descriptor() {
            Descriptor::Open { fd, .. } => Ok(fd),
            Descriptor::Unopened => Err(io::Error::from(io::ErrorKind::NotConnected)),
            Descriptor::Closed => Err(io::Error::from_raw_os_error(libc::EBADF)),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.descriptor(), Descriptor::Closed)
    }

    fn create(&self, family: c_int) -> io::Result<RawFd> {
        let fd = sys_socket(family, self.inner.kind.raw())?;

        if self.inner.reuse_address {
            if let Err(e) = sys_set_reuseaddr(fd) {
                sys_close(fd);
                return Err(e);
            }
        }

        Ok(fd)
    }

    /// Returns a descriptor of `family`, creating one if needed.
    pub(crate) fn ensure_open(&self, family: c_int) -> io::Result<RawFd> {
        let mut descriptor = self.descriptor();

        match *descriptor {
            Descriptor::Open { fd, family: current } if current == family => Ok(fd),
            Descriptor::Closed => Err(io::Error::from_raw_os_error(libc::EBADF)),
            Descriptor::Open { fd, .. } => {
                let new = self.create(family)?;
                sys_close(fd);
                *descriptor = Descriptor::Open { fd: new, family };
                Ok(new)
            }
            Descriptor::Unopened => {
                let fd = self.create(family)?;
                *descriptor = Descriptor::Open { fd, family };
                Ok(fd)
            }
        }
    }

    /// Replaces the descriptor with a fresh one; a failed connect leaves
    /// the old one unusable.
    pub(crate) fn reopen(&self, family: c_int) -> io::Result<RawFd> {
        let mut descriptor = self.descriptor();

        if let Descriptor::Closed = *descriptor {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }

        let fd = self.create(family)?;

        if let Descriptor::Open { fd: old, .. } = *descriptor {
            sys_close(old);
        }

        *descriptor = Descriptor::Open { fd, family };
        Ok(fd)
    }

    /// Drops the descriptor but keeps the socket usable for a new connect.
    pub(crate) fn reset(&self) {
        let mut descriptor = self.descriptor();

        let Descriptor::Open { fd, .. } = *descriptor else {
            return;
        };

        sys_close(fd);
        *descriptor = Descriptor::Unopened;
        drop(descriptor);

        reactor::wake_if_started();
    }

    /// Closes the socket for good.
    ///
    /// Operations still waiting on the socket fail with
    /// [`SocketError::OperationAborted`]; operations started afterwards are
    /// refused.
    pub fn close(&self) {
        let mut descriptor = self.descriptor();

        if let Descriptor::Open { fd, .. } = *descriptor {
            sys_close(fd);
        }

        *descriptor = Descriptor::Closed;
        drop(descriptor);

        reactor::wake_if_started();
    }

    pub fn bind(&self, addr: SocketAddr) -> io::Result<()> {
        let fd = self.ensure_open(family_of(&addr))?;
        sys_bind(fd, &addr)
    }

    pub fn listen(&self, backlog: i32) -> io::Result<()> {
        sys_listen(self.fd()?, backlog)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        sys_sockname(self.fd()?)
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        sys_peername(self.fd()?)
    }

    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        sys_shutdown(self.fd()?, how)
    }

    fn refuse_if_closed(&self, request: Request) -> Result<Request, Refused> {
        if self.is_closed() {
            return Err(Refused {
                error: io::Error::from_raw_os_error(libc::EBADF),
                request,
            });
        }

        Ok(request)
    }
}

impl Default for Socket {
    fn default() -> Self {
        Socket::new()
    }
}

impl Drop for SocketInner {
    fn drop(&mut self) {
        let descriptor = self
            .descriptor
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);

        if let Descriptor::Open { fd, .. } = *descriptor {
            sys_close(fd);
        }
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Socket");
        s.field("kind", &self.inner.kind)
            .field("mechanism", &self.inner.mechanism);

        match *self.descriptor() {
            Descriptor::Open { fd, .. } => s.field("fd", &fd),
            Descriptor::Unopened => s.field("fd", &"unopened"),
            Descriptor::Closed => s.field("fd", &"closed"),
        };

        s.finish()
    }
}

impl CallbackPair for Socket {
    fn begin(&self, request: Request, callback: AsyncCallback) -> Result<(), Refused> {
        let request = self.refuse_if_closed(request)?;
        let mut job = Job::new(self.clone(), request);

        if job.needs_lookup() {
            resolver::submit(job, Notify::Callback(callback));
            return Ok(());
        }

        match job.attempt() {
            Progress::Done(outcome) => {
                let resolution_failed = job.resolution_failed();
                let mut result = AsyncResult::new(job.into_request(), outcome, true);

                if resolution_failed {
                    result = result.with_resolution_failure();
                }

                callback(result);
                Ok(())
            }

            Progress::Wait(interest) => match reactor::handle() {
                Ok(handle) => {
                    handle.submit(job, interest, Notify::Callback(callback));
                    Ok(())
                }
                Err(error) => Err(Refused {
                    error,
                    request: job.into_request(),
                }),
            },
        }
    }
}

impl EventCompletion for Socket {
    fn submit(&self, mut args: CompletionArgs) -> Submission {
        let Some(request) = args.take_request() else {
            args.socket_error = SocketError::InvalidArgument;
            return Submission::Completed(args);
        };

        let request = match self.refuse_if_closed(request) {
            Ok(request) => request,
            Err(refused) => {
                args.set_request(refused.request);
                args.set_outcome(Err(refused.error));
                return Submission::Completed(args);
            }
        };

        let mut job = Job::new(self.clone(), request);

        if job.needs_lookup() {
            resolver::submit(job, Notify::Event(args));
            return Submission::Pending;
        }

        match job.attempt() {
            Progress::Done(outcome) => {
                job.finish_args(&mut args, outcome);
                Submission::Completed(args)
            }

            Progress::Wait(interest) => match reactor::handle() {
                Ok(handle) => {
                    handle.submit(job, interest, Notify::Event(args));
                    Submission::Pending
                }
                Err(error) => {
                    args.set_request(job.into_request());
                    args.set_outcome(Err(error));
                    Submission::Completed(args)
                }
            },
        }
    }
}

impl NativeSocket for Socket {
    fn mechanism(&self) -> Mechanism {
        self.inner.mechanism
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Destination;

    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_unopened_socket_reports_not_connected() {
        let socket = Socket::new();
        let err = socket.peer_addr().unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(!socket.is_closed());
    }

    #[test]
    fn test_bind_opens_descriptor() {
        let socket = Socket::new();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();

        let addr = socket.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn test_closed_socket_refuses_begin() {
        let socket = Socket::new();
        socket.close();

        let refused = socket
            .begin(Request::Accept, Box::new(|_| panic!("callback must not fire")))
            .unwrap_err();

        assert_eq!(refused.error.raw_os_error(), Some(libc::EBADF));
        assert!(matches!(refused.request, Request::Accept));
    }

    #[test]
    fn test_reset_allows_reopening() {
        let socket = Socket::new();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        socket.reset();

        assert_eq!(socket.fd().unwrap_err().kind(), io::ErrorKind::NotConnected);
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    }

    #[test]
    fn test_connect_by_name_does_not_block_begin() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let (sender, receiver) = mpsc::channel();
        let socket = Socket::new();

        socket
            .begin(
                Request::Connect(Destination::Host {
                    host: "localhost".into(),
                    port,
                }),
                Box::new(move |mut result: AsyncResult| {
                    let _ = sender.send((thread::current().id(), result.end().is_ok()));
                }),
            )
            .unwrap();

        let (completed_on, connected) = receiver.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_ne!(completed_on, thread::current().id());
        assert!(connected);
    }
}
