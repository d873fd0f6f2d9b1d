use super::{Completer, FromError, Operation, host_of, pending};

use crate::error::{Error, Result};
use crate::native::{CompletionArgs, NativeSocket, Request, Submission, Transferred};

use std::sync::Arc;

/// Event-completion strategy: submit, then read the args on whichever path
/// completes.
pub(super) fn submit<S, T, F>(socket: &S, request: Request, finish: F) -> Operation<T>
where
    S: NativeSocket + ?Sized,
    T: FromError,
    F: FnOnce(Result<Transferred>, Option<Request>) -> T + Send + 'static,
{
    let (operation, resolver) = pending();
    let completer = Arc::new(Completer::new(resolver, finish));

    let mut args = CompletionArgs::new(request);
    let on_complete = completer.clone();
    args.on_completed(move |args| on_complete.complete(move || read(args)));

    if let Submission::Completed(args) = socket.submit(args) {
        completer.complete(move || read(args));
    }

    operation
}

fn read(mut args: CompletionArgs) -> (Result<Transferred>, Option<Request>) {
    let request = args.take_request();

    if args.socket_error.is_success() {
        let transferred = Transferred {
            bytes: args.bytes_transferred,
            accepted: args.accept_socket.take(),
        };

        return (Ok(transferred), request);
    }

    let error = match args.connect_by_name_error.take() {
        Some(source) => Error::NameResolution {
            host: host_of(request.as_ref()),
            source,
        },
        None => Error::from_status(args.socket_error),
    };

    (Err(error), request)
}
