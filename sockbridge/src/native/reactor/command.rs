use super::poller::Interest;

use crate::native::job::Job;
use crate::native::{AsyncCallback, AsyncResult, CompletionArgs, Transferred};

use std::io;
use std::panic::{self, AssertUnwindSafe};

/// How a parked operation reports its outcome.
pub(crate) enum Notify {
    Callback(AsyncCallback),
    Event(CompletionArgs),
}

impl Notify {
    /// Reports `outcome` for `job`.
    ///
    /// A panicking handler is logged and contained so the I/O thread keeps
    /// serving other operations.
    pub(crate) fn deliver(self, job: Job, outcome: io::Result<Transferred>) {
        let name = job.name();

        let delivered = panic::catch_unwind(AssertUnwindSafe(move || match self {
            Notify::Callback(callback) => {
                let resolution_failed = job.resolution_failed();
                let mut result = AsyncResult::new(job.into_request(), outcome, false);

                if resolution_failed {
                    result = result.with_resolution_failure();
                }

                callback(result);
            }
            Notify::Event(mut args) => {
                job.finish_args(&mut args, outcome);
                args.complete();
            }
        }));

        if delivered.is_err() {
            tracing::error!(operation = name, "completion handler panicked");
        }
    }
}

/// A parked operation.
pub(crate) struct Entry {
    pub(crate) job: Job,
    pub(crate) interest: Interest,
    pub(crate) notify: Notify,
}

pub(crate) enum Command {
    Submit(Entry),
}
