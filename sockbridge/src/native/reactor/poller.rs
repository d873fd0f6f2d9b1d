//! `poll(2)`-based readiness poller.
//!
//! The poller keeps no registry: the reactor passes the descriptors it
//! waits on for every call. An internal pipe lets other threads interrupt a
//! blocking `poll`.

use crate::native::sys::{sys_close, sys_pipe, sys_poll, sys_read, sys_write};

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, pollfd};
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;

/// Readiness an operation waits for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

impl Interest {
    pub(crate) const READ: Interest = Interest {
        read: true,
        write: false,
    };

    pub(crate) const WRITE: Interest = Interest {
        read: false,
        write: true,
    };
}

/// Readiness reported for the entry at `token`.
pub(crate) struct Event {
    pub(crate) token: usize,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
}

/// Write end of the wake pipe.
pub(crate) struct Waker(RawFd);

impl Waker {
    /// Interrupts a blocking [`Poller::poll`].
    pub(crate) fn wake(&self) {
        // A full pipe already guarantees a wakeup.
        let _ = sys_write(self.0, &[1]);
    }
}

impl Drop for Waker {
    fn drop(&mut self) {
        sys_close(self.0);
    }
}

pub(crate) struct Poller {
    wake_read: RawFd,
    waker: Arc<Waker>,
    fds: Vec<pollfd>,
}

impl Poller {
    pub(crate) fn new() -> io::Result<Self> {
        let (wake_read, wake_write) = sys_pipe()?;

        Ok(Self {
            wake_read,
            waker: Arc::new(Waker(wake_write)),
            fds: Vec::with_capacity(64),
        })
    }

    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    /// Blocks until one of `sources` is ready or the poller is woken.
    ///
    /// `sources` yields `(token, fd, interest)`; ready ones are pushed to
    /// `events`. Invalid descriptors are reported as ready in both
    /// directions so their operation gets a chance to fail.
    pub(crate) fn poll<I>(&mut self, sources: I, events: &mut Vec<Event>) -> io::Result<()>
    where
        I: IntoIterator<Item = (usize, RawFd, Interest)>,
    {
        events.clear();
        self.fds.clear();

        self.fds.push(pollfd {
            fd: self.wake_read,
            events: POLLIN,
            revents: 0,
        });

        let mut tokens = Vec::new();

        for (token, fd, interest) in sources {
            let mut ev = 0;

            if interest.read {
                ev |= POLLIN;
            }

            if interest.write {
                ev |= POLLOUT;
            }

            self.fds.push(pollfd {
                fd,
                events: ev,
                revents: 0,
            });
            tokens.push(token);
        }

        match sys_poll(&mut self.fds, -1) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e),
        }

        if self.fds[0].revents != 0 {
            let mut buf = [0u8; 64];
            while matches!(sys_read(self.wake_read, &mut buf), Ok(n) if n > 0) {}
        }

        for (pfd, token) in self.fds.iter().skip(1).zip(tokens) {
            let re = pfd.revents;
            if re == 0 {
                continue;
            }

            let failed = re & (POLLERR | POLLHUP | POLLNVAL) != 0;

            events.push(Event {
                token,
                readable: failed || re & POLLIN != 0,
                writable: failed || re & POLLOUT != 0,
            });
        }

        Ok(())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        sys_close(self.wake_read);
    }
}
