//! The I/O thread.
//!
//! Operations that would block are parked here until their descriptor is
//! ready, then retried. Finished operations are reported through the
//! mechanism they were started with, on this thread.
//!
//! The reactor is started lazily by the first operation that has to wait
//! and lives for the rest of the process.

mod command;
mod core;
mod poller;

pub(crate) use command::Notify;
pub(crate) use core::ReactorHandle;
pub(crate) use poller::Interest;

use std::io;
use std::sync::OnceLock;

static REACTOR: OnceLock<Result<ReactorHandle, String>> = OnceLock::new();

/// Handle to the process-wide reactor, starting it on first use.
pub(crate) fn handle() -> io::Result<&'static ReactorHandle> {
    REACTOR
        .get_or_init(|| core::Reactor::start().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| io::Error::other(format!("failed to start the I/O thread: {e}")))
}

/// Wakes the reactor if it is running, so it notices descriptors that were
/// closed or reset under a parked operation.
pub(crate) fn wake_if_started() {
    if let Some(Ok(handle)) = REACTOR.get() {
        handle.wake();
    }
}
