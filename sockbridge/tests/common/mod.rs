#![allow(dead_code)]

use sockbridge::native::{
    AsyncCallback, AsyncResult, CallbackPair, CompletionArgs, EventCompletion, Mechanism,
    NativeSocket, Refused, Request, Submission, Transferred,
};
use sockbridge::{Socket, SocketError};

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const MECHANISMS: [Mechanism; 2] = [Mechanism::CallbackPair, Mechanism::EventCompletion];

/// One window of a recorded send: `(offset, len, bytes)`.
pub type SentWindow = (usize, usize, Vec<u8>);

/// Scripted native socket.
///
/// Every request completes with the configured status, either inside the
/// begin/submit call or later from another thread.
pub struct MockSocket {
    mechanism: Mechanism,
    later: Option<Duration>,
    status: SocketError,
    name_error: bool,
    refuse: bool,
    calls: AtomicUsize,
    sent: Arc<Mutex<Vec<SentWindow>>>,
}

impl MockSocket {
    pub fn new(mechanism: Mechanism) -> Self {
        Self {
            mechanism,
            later: None,
            status: SocketError::Success,
            name_error: false,
            refuse: false,
            calls: AtomicUsize::new(0),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Completes from another thread after `delay`.
    pub fn later(mut self, delay: Duration) -> Self {
        self.later = Some(delay);
        self
    }

    pub fn failing(mut self, status: SocketError) -> Self {
        self.status = status;
        self
    }

    pub fn unresolvable(mut self) -> Self {
        self.name_error = true;
        self
    }

    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Number of native calls issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SentWindow> {
        self.sent.lock().unwrap().clone()
    }

    fn outcome(&self, request: &Request) -> io::Result<Transferred> {
        let mut len = 0;

        if let Request::Send { buffers, .. } = request {
            let mut sent = self.sent.lock().unwrap();

            for view in buffers {
                sent.push((view.offset(), view.len(), view.as_slice().to_vec()));
                len += view.len();
            }
        }

        if let Request::Receive { buffers, .. } = request {
            len = buffers.iter().map(|view| view.len()).sum();
        }

        if self.name_error {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such host"));
        }

        if !self.status.is_success() {
            return Err(self.status.to_io());
        }

        Ok(Transferred {
            bytes: len,
            accepted: matches!(request, Request::Accept).then(Socket::new),
        })
    }
}

impl CallbackPair for MockSocket {
    fn begin(&self, request: Request, callback: AsyncCallback) -> Result<(), Refused> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.refuse {
            return Err(Refused {
                error: io::Error::from(io::ErrorKind::NotConnected),
                request,
            });
        }

        let outcome = self.outcome(&request);
        let mut result = AsyncResult::new(request, outcome, self.later.is_none());

        if self.name_error {
            result = result.with_resolution_failure();
        }

        match self.later {
            None => callback(result),
            Some(delay) => {
                thread::spawn(move || {
                    thread::sleep(delay);
                    callback(result);
                });
            }
        }

        Ok(())
    }
}

impl EventCompletion for MockSocket {
    fn submit(&self, mut args: CompletionArgs) -> Submission {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let request = args.take_request().expect("submitted args carry a request");
        let outcome = if self.refuse {
            Err(io::Error::from(io::ErrorKind::NotConnected))
        } else {
            self.outcome(&request)
        };
        args.set_request(request);

        match outcome {
            Err(error) if self.name_error => args.set_resolution_failure(error),
            outcome => args.set_outcome(outcome),
        }

        match self.later {
            None => Submission::Completed(args),
            Some(delay) => {
                thread::spawn(move || {
                    thread::sleep(delay);
                    args.complete();
                });
                Submission::Pending
            }
        }
    }
}

impl NativeSocket for MockSocket {
    fn mechanism(&self) -> Mechanism {
        self.mechanism
    }
}
