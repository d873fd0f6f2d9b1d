use super::command::{Command, Entry, Notify};
use super::poller::{Event, Interest, Poller, Waker};

use crate::native::SocketError;
use crate::native::job::{Job, Progress};

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

/// The reactor.
///
/// Runs on the `sockbridge-io` thread. It owns every parked operation,
/// polls their descriptors, retries the ready ones and delivers their
/// notifications.
pub(crate) struct Reactor {
    receiver: Receiver<Command>,
    poller: Poller,
    events: Vec<Event>,
    entries: Vec<Entry>,
}

/// Sends work to the reactor thread.
pub(crate) struct ReactorHandle {
    sender: Sender<Command>,
    waker: Arc<Waker>,
}

impl ReactorHandle {
    /// Parks `job` until its descriptor shows `interest`.
    pub(crate) fn submit(&self, job: Job, interest: Interest, notify: Notify) {
        tracing::trace!(operation = job.name(), "operation pending");

        let entry = Entry {
            job,
            interest,
            notify,
        };

        if let Err(err) = self.sender.send(Command::Submit(entry)) {
            // The reactor thread is gone; fail the operation right here.
            let Command::Submit(entry) = err.0;
            let error = io::Error::other("the I/O thread has stopped");
            entry.notify.deliver(entry.job, Err(error));
            return;
        }

        self.waker.wake();
    }

    pub(crate) fn wake(&self) {
        self.waker.wake();
    }
}

impl Reactor {
    fn new(receiver: Receiver<Command>, poller: Poller) -> Self {
        Self {
            receiver,
            poller,
            events: Vec::with_capacity(64),
            entries: Vec::new(),
        }
    }

    /// Starts the reactor thread and returns a handle to it.
    pub(crate) fn start() -> io::Result<ReactorHandle> {
        let (sender, receiver) = channel();
        let poller = Poller::new()?;
        let waker = poller.waker();

        thread::Builder::new()
            .name("sockbridge-io".into())
            .spawn(move || {
                let mut reactor = Reactor::new(receiver, poller);
                reactor.run();
            })?;

        tracing::debug!("I/O thread started");

        Ok(ReactorHandle { sender, waker })
    }

    fn run(&mut self) {
        loop {
            while let Ok(Command::Submit(entry)) = self.receiver.try_recv() {
                self.entries.push(entry);
            }

            let mut sources = Vec::with_capacity(self.entries.len());
            let mut token = 0;

            // An entry whose descriptor was closed or reset meanwhile can
            // never become ready. `swap_remove` moves the last entry into
            // `token`, which is checked again.
            while token < self.entries.len() {
                match self.entries[token].job.fd() {
                    Ok(fd) => {
                        sources.push((token, fd, self.entries[token].interest));
                        token += 1;
                    }
                    Err(_) => abort(self.entries.swap_remove(token)),
                }
            }

            if let Err(e) = self.poller.poll(sources, &mut self.events) {
                tracing::error!(error = %e, "poll failed");
                self.fail_all(e);
                continue;
            }

            self.dispatch();
        }
    }

    /// Retries every ready entry, highest token first so `swap_remove`
    /// keeps the remaining tokens valid.
    fn dispatch(&mut self) {
        let mut ready: Vec<usize> = self
            .events
            .drain(..)
            .filter(|event| {
                let interest = self.entries[event.token].interest;
                (event.readable && interest.read) || (event.writable && interest.write)
            })
            .map(|event| event.token)
            .collect();

        ready.sort_unstable_by(|a, b| b.cmp(a));
        ready.dedup();

        let mut requeue = Vec::new();

        for token in ready {
            let mut entry = self.entries.swap_remove(token);

            if entry.job.fd().is_err() {
                abort(entry);
                continue;
            }

            match entry.job.attempt() {
                Progress::Done(outcome) => {
                    tracing::trace!(
                        operation = entry.job.name(),
                        ok = outcome.is_ok(),
                        "operation completed"
                    );
                    entry.notify.deliver(entry.job, outcome);
                }
                Progress::Wait(interest) => {
                    entry.interest = interest;
                    requeue.push(entry);
                }
            }
        }

        self.entries.extend(requeue);
    }

    fn fail_all(&mut self, error: io::Error) {
        for entry in self.entries.drain(..) {
            let error = io::Error::new(error.kind(), error.to_string());
            entry.notify.deliver(entry.job, Err(error));
        }
    }
}

/// Fails a parked entry whose descriptor was closed or reset.
fn abort(entry: Entry) {
    tracing::trace!(operation = entry.job.name(), "operation aborted");
    entry
        .notify
        .deliver(entry.job, Err(SocketError::OperationAborted.to_io()));
}
