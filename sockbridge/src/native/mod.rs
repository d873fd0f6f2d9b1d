//! Native socket layer.
//!
//! A native socket exposes every asynchronous operation through two
//! completion mechanisms:
//!
//! - the **callback pair**: [`CallbackPair::begin`] starts the operation and
//!   later hands an [`AsyncResult`] to a callback, from which the outcome is
//!   extracted exactly once with [`AsyncResult::end`];
//! - the **event completion**: [`EventCompletion::submit`] takes a reusable
//!   [`CompletionArgs`] and either completes it on the spot
//!   ([`Submission::Completed`]) or fires its completed handler later.
//!
//! [`Socket`] is the real implementation. It attempts every operation inline
//! first and parks the ones that would block on a dedicated I/O thread, which
//! delivers their notifications once the descriptor is ready. Connects by
//! host name start on a lookup thread so that `begin` and `submit` never
//! wait on the system resolver.

mod buffer;
mod destination;
mod flags;
mod job;
mod reactor;
mod resolver;
mod socket;
mod status;
mod sys;

pub use buffer::BufferView;
pub use destination::Destination;
pub use flags::{SocketFlags, SocketKind, TransmitFileOptions};
pub use socket::{Socket, SocketBuilder};
pub use status::SocketError;

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

#[cfg(not(unix))]
compile_error!("the native socket layer is only implemented for unix targets");

/// Which completion mechanism a socket exposes to the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mechanism {
    CallbackPair,
    EventCompletion,
}

impl Default for Mechanism {
    /// `EventCompletion` when the `event-completion` feature is enabled,
    /// `CallbackPair` otherwise.
    fn default() -> Self {
        if cfg!(feature = "event-completion") {
            Mechanism::EventCompletion
        } else {
            Mechanism::CallbackPair
        }
    }
}

/// An asynchronous operation handed to the native layer.
///
/// Requests own their buffers, so the native layer may fill or drain them
/// from any thread. They come back with the outcome.
#[derive(Debug)]
pub enum Request {
    Connect(Destination),
    Disconnect {
        reuse_socket: bool,
    },
    Accept,
    Receive {
        buffers: Vec<BufferView>,
        flags: SocketFlags,
    },
    Send {
        buffers: Vec<BufferView>,
        flags: SocketFlags,
    },
    SendTo {
        buffer: BufferView,
        flags: SocketFlags,
        endpoint: SocketAddr,
    },
    SendFile {
        path: PathBuf,
        pre: Option<Vec<u8>>,
        post: Option<Vec<u8>>,
        options: TransmitFileOptions,
    },
}

impl Request {
    /// Short operation name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Connect(_) => "connect",
            Request::Disconnect { .. } => "disconnect",
            Request::Accept => "accept",
            Request::Receive { .. } => "receive",
            Request::Send { .. } => "send",
            Request::SendTo { .. } => "send_to",
            Request::SendFile { .. } => "send_file",
        }
    }

    /// Gives the caller's buffers back, in submission order.
    pub fn into_buffers(self) -> Vec<BufferView> {
        match self {
            Request::Receive { buffers, .. } | Request::Send { buffers, .. } => buffers,
            Request::SendTo { buffer, .. } => vec![buffer],
            _ => Vec::new(),
        }
    }
}

/// What a successful operation produced.
#[derive(Debug, Default)]
pub struct Transferred {
    pub bytes: usize,
    /// The connected socket, for accept.
    pub accepted: Option<Socket>,
}

impl Transferred {
    pub fn bytes(bytes: usize) -> Self {
        Self {
            bytes,
            accepted: None,
        }
    }
}

/// Callback of the callback-pair mechanism.
pub type AsyncCallback = Box<dyn FnOnce(AsyncResult) + Send + 'static>;

/// Token handed to an [`AsyncCallback`] once an operation has finished.
pub struct AsyncResult {
    request: Request,
    outcome: Option<io::Result<Transferred>>,
    completed_synchronously: bool,
    resolution_failed: bool,
}

impl AsyncResult {
    pub fn new(
        request: Request,
        outcome: io::Result<Transferred>,
        completed_synchronously: bool,
    ) -> Self {
        Self {
            request,
            outcome: Some(outcome),
            completed_synchronously,
            resolution_failed: false,
        }
    }

    /// Marks a connect failure as a name-resolution failure.
    pub fn with_resolution_failure(mut self) -> Self {
        self.resolution_failed = true;
        self
    }

    pub fn completed_synchronously(&self) -> bool {
        self.completed_synchronously
    }

    pub fn resolution_failed(&self) -> bool {
        self.resolution_failed
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    /// The end step: extracts the outcome.
    ///
    /// The outcome can be taken only once; later calls fail with
    /// `InvalidInput`.
    pub fn end(&mut self) -> io::Result<Transferred> {
        self.outcome.take().unwrap_or_else(|| {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "end was already called for this operation",
            ))
        })
    }
}

impl fmt::Debug for AsyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult")
            .field("request", &self.request.name())
            .field("ended", &self.outcome.is_none())
            .field("completed_synchronously", &self.completed_synchronously)
            .finish()
    }
}

/// A begin step the native layer refused to start.
///
/// No callback will fire; the request is handed back untouched.
#[derive(Debug)]
pub struct Refused {
    pub error: io::Error,
    pub request: Request,
}

/// The begin/end completion mechanism.
pub trait CallbackPair: Send + Sync {
    /// Starts `request`. `callback` fires exactly once when the operation
    /// finishes, possibly before `begin` returns.
    fn begin(&self, request: Request, callback: AsyncCallback) -> Result<(), Refused>;
}

/// Handler fired when a pending [`CompletionArgs`] completes.
pub type CompletedHandler = Box<dyn FnOnce(CompletionArgs) + Send + 'static>;

/// Argument carrier of the event-completion mechanism.
pub struct CompletionArgs {
    request: Option<Request>,
    pub socket_error: SocketError,
    pub bytes_transferred: usize,
    pub accept_socket: Option<Socket>,
    /// Set when a connect by host name failed to resolve.
    pub connect_by_name_error: Option<io::Error>,
    completed: Option<CompletedHandler>,
}

impl CompletionArgs {
    pub fn new(request: Request) -> Self {
        Self {
            request: Some(request),
            socket_error: SocketError::Success,
            bytes_transferred: 0,
            accept_socket: None,
            connect_by_name_error: None,
            completed: None,
        }
    }

    /// Subscribes the completed handler. Only one may be attached.
    pub fn on_completed<F>(&mut self, handler: F)
    where
        F: FnOnce(CompletionArgs) + Send + 'static,
    {
        self.completed = Some(Box::new(handler));
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn take_request(&mut self) -> Option<Request> {
        self.request.take()
    }

    pub fn set_request(&mut self, request: Request) {
        self.request = Some(request);
    }

    /// Records the outcome of an operation.
    pub fn set_outcome(&mut self, outcome: io::Result<Transferred>) {
        match outcome {
            Ok(transferred) => {
                self.socket_error = SocketError::Success;
                self.bytes_transferred = transferred.bytes;
                self.accept_socket = transferred.accepted;
            }
            Err(err) => {
                self.socket_error = SocketError::from_io(&err);
                self.bytes_transferred = 0;
            }
        }
    }

    /// Records a failed host-name lookup for a connect.
    pub fn set_resolution_failure(&mut self, error: io::Error) {
        self.socket_error = SocketError::HostNotFound;
        self.bytes_transferred = 0;
        self.connect_by_name_error = Some(error);
    }

    /// Fires the completed handler, if one is attached.
    ///
    /// Called by the native layer for operations that went pending.
    pub fn complete(mut self) {
        if let Some(handler) = self.completed.take() {
            handler(self);
        }
    }
}

impl fmt::Debug for CompletionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionArgs")
            .field("request", &self.request.as_ref().map(Request::name))
            .field("socket_error", &self.socket_error)
            .field("bytes_transferred", &self.bytes_transferred)
            .field("connect_by_name_error", &self.connect_by_name_error)
            .finish()
    }
}

/// Result of [`EventCompletion::submit`].
#[derive(Debug)]
pub enum Submission {
    /// Finished inside `submit`; the completed handler will not fire.
    Completed(CompletionArgs),
    /// Still running; the completed handler fires exactly once later.
    Pending,
}

/// The event-completion mechanism.
pub trait EventCompletion: Send + Sync {
    fn submit(&self, args: CompletionArgs) -> Submission;
}

/// A socket the adapter can drive.
pub trait NativeSocket: CallbackPair + EventCompletion {
    /// The mechanism the adapter should use for this socket.
    fn mechanism(&self) -> Mechanism;
}
