//! Non-blocking attempts for every native operation.
//!
//! A [`Job`] owns one request and its progress. Each call to
//! [`Job::attempt`] pushes the operation as far as the descriptor allows and
//! either finishes it or reports which readiness it waits for.

use super::reactor::Interest;
use super::socket::Socket;
use super::sys::*;
use super::{CompletionArgs, Request, SocketKind, Transferred, TransmitFileOptions};

use std::fs::File;
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr};
use std::os::fd::RawFd;

const FILE_CHUNK: usize = 64 * 1024;

pub(crate) enum Progress {
    Done(io::Result<Transferred>),
    Wait(Interest),
}

enum Connect {
    Unresolved,
    Trying {
        candidates: Vec<SocketAddr>,
        next: usize,
        in_flight: bool,
        last_error: Option<io::Error>,
    },
}

#[derive(Clone, Copy)]
enum Stage {
    Head,
    Body,
    Tail,
    Finished,
}

struct Transmit {
    stage: Stage,
    file: Option<File>,
    chunk: Vec<u8>,
    sent: usize,
    total: usize,
}

enum State {
    Connect(Connect),
    Send { sent: usize },
    Transmit(Transmit),
    Other,
}

pub(crate) struct Job {
    socket: Socket,
    request: Request,
    state: State,
    resolution_failed: bool,
}

impl Job {
    pub(crate) fn new(socket: Socket, request: Request) -> Self {
        let state = match request {
            Request::Connect(_) => State::Connect(Connect::Unresolved),
            Request::Send { .. } => State::Send { sent: 0 },
            Request::SendFile { .. } => State::Transmit(Transmit {
                stage: Stage::Head,
                file: None,
                chunk: Vec::new(),
                sent: 0,
                total: 0,
            }),
            _ => State::Other,
        };

        Self {
            socket,
            request,
            state,
            resolution_failed: false,
        }
    }

    pub(crate) fn fd(&self) -> io::Result<RawFd> {
        self.socket.fd()
    }

    pub(crate) fn name(&self) -> &'static str {
        self.request.name()
    }

    /// True for a connect that still has to look its host name up.
    pub(crate) fn needs_lookup(&self) -> bool {
        match (&self.request, &self.state) {
            (Request::Connect(destination), State::Connect(Connect::Unresolved)) => {
                destination.needs_lookup()
            }
            _ => false,
        }
    }

    pub(crate) fn resolution_failed(&self) -> bool {
        self.resolution_failed
    }

    pub(crate) fn into_request(self) -> Request {
        self.request
    }

    /// Hands the request and outcome over to an event-completion carrier.
    pub(crate) fn finish_args(self, args: &mut CompletionArgs, outcome: io::Result<Transferred>) {
        match outcome {
            Err(error) if self.resolution_failed => args.set_resolution_failure(error),
            outcome => args.set_outcome(outcome),
        }

        args.set_request(self.request);
    }

    pub(crate) fn attempt(&mut self) -> Progress {
        let Job {
            socket,
            request,
            state,
            resolution_failed,
        } = self;

        match (request, state) {
            (Request::Connect(destination), State::Connect(connect)) => {
                if let Connect::Unresolved = connect {
                    match destination.candidates() {
                        Ok(candidates) => {
                            *connect = Connect::Trying {
                                candidates,
                                next: 0,
                                in_flight: false,
                                last_error: None,
                            }
                        }
                        Err(e) => {
                            *resolution_failed = destination.host().is_some();
                            return Progress::Done(Err(e));
                        }
                    }
                }

                attempt_connect(socket, connect)
            }

            (Request::Disconnect { reuse_socket }, _) => {
                Progress::Done(disconnect(socket, *reuse_socket).map(|()| Transferred::default()))
            }

            (Request::Accept, _) => attempt_accept(socket),

            (Request::Receive { buffers, flags }, _) => {
                let fd = match socket.fd() {
                    Ok(fd) => fd,
                    Err(e) => return Progress::Done(Err(e)),
                };

                retry(Interest::READ, || {
                    if let [view] = buffers.as_mut_slice() {
                        sys_recv(fd, view.as_mut_slice(), flags.bits())
                    } else {
                        let mut slices: Vec<&mut [u8]> =
                            buffers.iter_mut().map(|view| view.as_mut_slice()).collect();
                        sys_recv_vectored(fd, &mut slices, flags.bits())
                    }
                })
            }

            (Request::Send { buffers, flags }, State::Send { sent }) => {
                let fd = match socket.fd() {
                    Ok(fd) => fd,
                    Err(e) => return Progress::Done(Err(e)),
                };

                let total: usize = buffers.iter().map(|view| view.len()).sum();
                let datagram = socket.kind() == SocketKind::Datagram;

                loop {
                    let remaining = remaining_slices(buffers.iter().map(|v| v.as_slice()), *sent);

                    match sys_send_vectored(fd, &remaining, flags.bits()) {
                        Ok(n) => {
                            *sent += n;

                            if *sent >= total || datagram {
                                return Progress::Done(Ok(Transferred::bytes(*sent)));
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                        Err(e) if is_pending(&e) => return Progress::Wait(Interest::WRITE),
                        Err(e) => return Progress::Done(Err(e)),
                    }
                }
            }

            (
                Request::SendTo {
                    buffer,
                    flags,
                    endpoint,
                },
                _,
            ) => {
                let fd = match socket.ensure_open(family_of(endpoint)) {
                    Ok(fd) => fd,
                    Err(e) => return Progress::Done(Err(e)),
                };

                retry(Interest::WRITE, || {
                    sys_send_to(fd, buffer.as_slice(), flags.bits(), endpoint)
                })
            }

            (
                Request::SendFile {
                    path,
                    pre,
                    post,
                    options,
                },
                State::Transmit(transmit),
            ) => {
                let fd = match socket.fd() {
                    Ok(fd) => fd,
                    Err(e) => return Progress::Done(Err(e)),
                };

                if transmit.file.is_none() && matches!(transmit.stage, Stage::Head) {
                    match File::open(&*path) {
                        Ok(file) => transmit.file = Some(file),
                        Err(e) => return Progress::Done(Err(e)),
                    }
                }

                match attempt_transmit(fd, transmit, pre.as_deref(), post.as_deref()) {
                    Progress::Done(Ok(transferred)) => {
                        if options.contains(TransmitFileOptions::DISCONNECT) {
                            let reuse = options.contains(TransmitFileOptions::REUSE_SOCKET);

                            if let Err(e) = disconnect(socket, reuse) {
                                return Progress::Done(Err(e));
                            }
                        }

                        Progress::Done(Ok(transferred))
                    }
                    progress => progress,
                }
            }

            _ => Progress::Done(Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "request does not match its job state",
            ))),
        }
    }
}

/// Runs `op` until it stops being interrupted.
fn retry<F>(interest: Interest, mut op: F) -> Progress
where
    F: FnMut() -> io::Result<usize>,
{
    loop {
        match op() {
            Ok(n) => return Progress::Done(Ok(Transferred::bytes(n))),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_pending(&e) => return Progress::Wait(interest),
            Err(e) => return Progress::Done(Err(e)),
        }
    }
}

/// The unsent tail of `buffers`, skipping the first `sent` bytes.
///
/// Always yields at least one slice so an empty send still reaches the
/// kernel.
fn remaining_slices<'a>(buffers: impl Iterator<Item = &'a [u8]>, mut sent: usize) -> Vec<&'a [u8]> {
    let mut remaining = Vec::new();

    for slice in buffers {
        if sent >= slice.len() {
            sent -= slice.len();
            continue;
        }

        remaining.push(&slice[sent..]);
        sent = 0;
    }

    if remaining.is_empty() {
        remaining.push(&[][..]);
    }

    remaining
}

fn attempt_connect(socket: &Socket, connect: &mut Connect) -> Progress {
    let Connect::Trying {
        candidates,
        next,
        in_flight,
        last_error,
    } = connect
    else {
        return Progress::Done(Err(io::Error::from(io::ErrorKind::NotFound)));
    };

    loop {
        if *in_flight {
            let outcome = socket.fd().and_then(|fd| match sys_take_error(fd)? {
                Some(e) => Err(e),
                None => sys_peername(fd).map(|_| ()),
            });

            match outcome {
                Ok(()) => return Progress::Done(Ok(Transferred::default())),
                // Spurious wakeup: not connected yet, nothing failed either.
                Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                    return Progress::Wait(Interest::WRITE);
                }
                Err(e) => {
                    tracing::trace!(candidate = ?candidates.get(*next), error = %e, "connect attempt failed");
                    *last_error = Some(e);
                    *in_flight = false;
                    *next += 1;
                    continue;
                }
            }
        }

        let Some(addr) = candidates.get(*next) else {
            return Progress::Done(Err(last_error.take().unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "no address to connect to")
            })));
        };

        let fd = if *next == 0 {
            socket.ensure_open(family_of(addr))
        } else {
            socket.reopen(family_of(addr))
        };

        let result = fd.and_then(|fd| sys_connect(fd, addr));

        match result {
            Ok(()) => return Progress::Done(Ok(Transferred::default())),
            Err(e) if is_pending(&e) || e.kind() == io::ErrorKind::Interrupted => {
                *in_flight = true;
                return Progress::Wait(Interest::WRITE);
            }
            Err(e) if e.raw_os_error() == Some(libc::EBADF) => return Progress::Done(Err(e)),
            Err(e) => {
                tracing::trace!(candidate = %addr, error = %e, "connect attempt failed");
                *last_error = Some(e);
                *next += 1;
            }
        }
    }
}

fn attempt_accept(socket: &Socket) -> Progress {
    let fd = match socket.fd() {
        Ok(fd) => fd,
        Err(e) => return Progress::Done(Err(e)),
    };

    loop {
        match sys_accept(fd) {
            Ok(client) => {
                let family = sys_sockname(fd)
                    .map(|addr| family_of(&addr))
                    .unwrap_or(libc::AF_INET);

                return Progress::Done(Ok(Transferred {
                    bytes: 0,
                    accepted: Some(socket.accepted(client, family)),
                }));
            }
            Err(e)
                if e.kind() == io::ErrorKind::Interrupted
                    || e.kind() == io::ErrorKind::ConnectionAborted => {}
            Err(e) if is_pending(&e) => return Progress::Wait(Interest::READ),
            Err(e) => return Progress::Done(Err(e)),
        }
    }
}

fn disconnect(socket: &Socket, reuse_socket: bool) -> io::Result<()> {
    let shutdown = socket.fd().and_then(|fd| sys_shutdown(fd, Shutdown::Both));

    match shutdown {
        // The peer may have gone first.
        Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
        Err(e) => return Err(e),
        Ok(()) => {}
    }

    if reuse_socket {
        socket.reset();
    } else {
        socket.close();
    }

    Ok(())
}

fn attempt_transmit(
    fd: RawFd,
    transmit: &mut Transmit,
    pre: Option<&[u8]>,
    post: Option<&[u8]>,
) -> Progress {
    loop {
        while transmit.sent < transmit.chunk.len() {
            match sys_send(fd, &transmit.chunk[transmit.sent..], 0) {
                Ok(n) => {
                    transmit.sent += n;
                    transmit.total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if is_pending(&e) => return Progress::Wait(Interest::WRITE),
                Err(e) => return Progress::Done(Err(e)),
            }
        }

        transmit.chunk.clear();
        transmit.sent = 0;

        match transmit.stage {
            Stage::Head => {
                transmit.chunk.extend_from_slice(pre.unwrap_or_default());
                transmit.stage = Stage::Body;
            }
            Stage::Body => {
                let Some(file) = transmit.file.as_mut() else {
                    transmit.stage = Stage::Tail;
                    continue;
                };

                transmit.chunk.resize(FILE_CHUNK, 0);

                match file.read(&mut transmit.chunk) {
                    Ok(0) => {
                        transmit.chunk.clear();
                        transmit.file = None;
                        transmit.stage = Stage::Tail;
                    }
                    Ok(n) => transmit.chunk.truncate(n),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => transmit.chunk.clear(),
                    Err(e) => return Progress::Done(Err(e)),
                }
            }
            Stage::Tail => {
                transmit.chunk.extend_from_slice(post.unwrap_or_default());
                transmit.stage = Stage::Finished;
            }
            Stage::Finished => return Progress::Done(Ok(Transferred::bytes(transmit.total))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Destination;

    #[test]
    fn test_remaining_skips_sent_bytes() {
        let buffers: [&[u8]; 3] = [b"abc", b"de", b"fgh"];
        let remaining = remaining_slices(buffers.into_iter(), 4);

        assert_eq!(remaining, vec![&b"e"[..], &b"fgh"[..]]);
    }

    #[test]
    fn test_remaining_never_empty() {
        let remaining = remaining_slices(std::iter::empty(), 0);

        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].is_empty());
    }

    #[test]
    fn test_unresolvable_host_is_flagged() {
        let socket = Socket::new();
        let mut job = Job::new(
            socket,
            Request::Connect(Destination::Host {
                host: "name.invalid".into(),
                port: 80,
            }),
        );

        match job.attempt() {
            Progress::Done(Err(_)) => assert!(job.resolution_failed()),
            _ => panic!("lookup of a reserved name should fail"),
        }
    }

    #[test]
    fn test_lookup_needed_only_for_host_names() {
        let named = Job::new(
            Socket::new(),
            Request::Connect(Destination::Host {
                host: "name.invalid".into(),
                port: 80,
            }),
        );
        assert!(named.needs_lookup());

        let literal = Job::new(
            Socket::new(),
            Request::Connect(Destination::Host {
                host: "127.0.0.1".into(),
                port: 80,
            }),
        );
        assert!(!literal.needs_lookup());

        let accept = Job::new(Socket::new(), Request::Accept);
        assert!(!accept.needs_lookup());
    }
}
