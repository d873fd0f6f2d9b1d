//! Completion bridge.
//!
//! Turns one native asynchronous call into an [`Operation`] future. The
//! native socket picks the strategy through its [`Mechanism`]; both
//! strategies share a [`Completer`], which runs the façade's finishing step
//! at most once, contains panics, and resolves the future with the first
//! outcome reported.

mod callback;
mod event;
mod pending;

pub use pending::Operation;

pub(crate) use pending::{Resolver, pending};

use crate::error::{Error, Result};
use crate::native::{Mechanism, NativeSocket, Request, Transferred};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

/// A façade result that can carry a bridge failure.
pub(crate) trait FromError: Send + 'static {
    fn from_error(error: Error) -> Self;
}

impl<T: Send + 'static> FromError for Result<T> {
    fn from_error(error: Error) -> Self {
        Err(error)
    }
}

/// Starts `request` on `socket` and returns the future of its result.
///
/// `finish` maps the native outcome and the returned request (which holds
/// the caller's buffers) to the façade's result.
pub(crate) fn drive<S, T, F>(socket: &S, request: Request, finish: F) -> Operation<T>
where
    S: NativeSocket + ?Sized,
    T: FromError,
    F: FnOnce(Result<Transferred>, Option<Request>) -> T + Send + 'static,
{
    match socket.mechanism() {
        Mechanism::CallbackPair => callback::begin_end(socket, request, finish),
        Mechanism::EventCompletion => event::submit(socket, request, finish),
    }
}

/// Single-use completion shared by every path that may finish an operation.
pub(crate) struct Completer<T, F> {
    resolver: Resolver<T>,
    finish: Mutex<Option<F>>,
}

impl<T, F> Completer<T, F>
where
    T: FromError,
    F: FnOnce(Result<Transferred>, Option<Request>) -> T,
{
    pub(crate) fn new(resolver: Resolver<T>, finish: F) -> Self {
        Self {
            resolver,
            finish: Mutex::new(Some(finish)),
        }
    }

    /// Finishes the operation with the outcome produced by `read`.
    ///
    /// Only the first call does anything. Panics raised by `read` or by the
    /// finishing step resolve the operation to [`Error::HandlerPanicked`].
    pub(crate) fn complete<R>(&self, read: R)
    where
        R: FnOnce() -> (Result<Transferred>, Option<Request>),
    {
        let finish = self
            .finish
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(finish) = finish else {
            return;
        };

        let value = panic::catch_unwind(AssertUnwindSafe(move || {
            let (outcome, request) = read();
            finish(outcome, request)
        }))
        .unwrap_or_else(|payload| T::from_error(Error::HandlerPanicked(panic_message(&*payload))));

        self.resolver.resolve(value);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Host name of a connect request, for name-resolution failures.
fn host_of(request: Option<&Request>) -> String {
    match request {
        Some(Request::Connect(destination)) => destination.host().unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_is_extracted() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(panic_message(&*payload), "boom 7");

        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static");
    }

    #[test]
    fn test_completer_runs_finish_once() {
        let (operation, resolver) = pending::<Result<usize>>();
        let completer = Completer::new(resolver, |outcome: Result<Transferred>, _: Option<Request>| {
            outcome.map(|t| t.bytes)
        });

        completer.complete(|| (Ok(Transferred::bytes(3)), None));
        completer.complete(|| panic!("second completion must not run"));

        assert!(operation.is_complete());
    }

    #[test]
    fn test_panicking_end_becomes_failure() {
        let (operation, resolver) = pending::<Result<usize>>();
        let completer = Completer::new(resolver, |outcome: Result<Transferred>, _: Option<Request>| {
            outcome.map(|t| t.bytes)
        });

        completer.complete(|| panic!("end blew up"));
        assert!(operation.is_complete());

        let runtime = crate::RuntimeBuilder::new().worker_threads(1).build();
        let result = runtime.block_on(operation);

        assert!(matches!(result, Err(Error::HandlerPanicked(ref m)) if m == "end blew up"));
    }
}
