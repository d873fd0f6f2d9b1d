//! The lookup thread.
//!
//! Connects by host name ask the system resolver, which blocks. They are
//! started on this thread instead of the caller's, then continue like any
//! other operation: finished on the spot or parked on the I/O thread.

use super::job::{Job, Progress};
use super::reactor::{self, Notify};

use std::io;
use std::sync::OnceLock;
use std::sync::mpsc::{Sender, channel};
use std::thread;

static RESOLVER: OnceLock<Result<Sender<Lookup>, String>> = OnceLock::new();

struct Lookup {
    job: Job,
    notify: Notify,
}

impl Lookup {
    fn run(self) {
        let Lookup { mut job, notify } = self;

        match job.attempt() {
            Progress::Done(outcome) => notify.deliver(job, outcome),
            Progress::Wait(interest) => match reactor::handle() {
                Ok(handle) => handle.submit(job, interest, notify),
                Err(error) => notify.deliver(job, Err(error)),
            },
        }
    }
}

fn start() -> Result<Sender<Lookup>, String> {
    let (sender, receiver) = channel::<Lookup>();

    thread::Builder::new()
        .name("sockbridge-resolve".into())
        .spawn(move || {
            for lookup in receiver {
                lookup.run();
            }
        })
        .map_err(|e| e.to_string())?;

    tracing::debug!("lookup thread started");

    Ok(sender)
}

/// Starts `job` on the lookup thread. `notify` fires once it finishes.
///
/// If the thread cannot be reached the operation fails right here, through
/// `notify`.
pub(crate) fn submit(job: Job, notify: Notify) {
    tracing::trace!(operation = job.name(), "host lookup queued");

    let sender = match RESOLVER.get_or_init(start) {
        Ok(sender) => sender,
        Err(e) => {
            let error = io::Error::other(format!("failed to start the lookup thread: {e}"));
            notify.deliver(job, Err(error));
            return;
        }
    };

    if let Err(err) = sender.send(Lookup { job, notify }) {
        let Lookup { job, notify } = err.0;
        notify.deliver(job, Err(io::Error::other("the lookup thread has stopped")));
    }
}
