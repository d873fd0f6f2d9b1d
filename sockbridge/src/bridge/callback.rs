use super::{Completer, FromError, Operation, host_of, pending};

use crate::error::{Error, Result};
use crate::native::{AsyncCallback, AsyncResult, NativeSocket, Request, Transferred};

use std::sync::Arc;

/// Callback-pair strategy: `begin`, then `end` inside the callback.
pub(super) fn begin_end<S, T, F>(socket: &S, request: Request, finish: F) -> Operation<T>
where
    S: NativeSocket + ?Sized,
    T: FromError,
    F: FnOnce(Result<Transferred>, Option<Request>) -> T + Send + 'static,
{
    let (operation, resolver) = pending();
    let completer = Arc::new(Completer::new(resolver, finish));

    let on_complete = completer.clone();
    let callback: AsyncCallback = Box::new(move |result: AsyncResult| {
        on_complete.complete(move || end(result));
    });

    if let Err(refused) = socket.begin(request, callback) {
        completer.complete(move || (Err(Error::from(refused.error)), Some(refused.request)));
    }

    operation
}

fn end(mut result: AsyncResult) -> (Result<Transferred>, Option<Request>) {
    let outcome = result.end();
    let resolution_failed = result.resolution_failed();
    let request = result.into_request();

    let outcome = outcome.map_err(|source| {
        if resolution_failed {
            Error::NameResolution {
                host: host_of(Some(&request)),
                source,
            }
        } else {
            Error::from(source)
        }
    });

    (outcome, Some(request))
}
