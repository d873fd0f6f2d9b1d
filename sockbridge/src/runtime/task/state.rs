/// Not queued; waiting for a wakeup.
pub(crate) const IDLE: usize = 0;

/// In the injector queue.
pub(crate) const QUEUED: usize = 1;

/// Being polled by a worker.
pub(crate) const RUNNING: usize = 2;

/// Woken while running; re-queued once the current poll returns.
pub(crate) const NOTIFIED: usize = 3;

/// The future finished (or panicked) and will not be polled again.
pub(crate) const COMPLETED: usize = 4;
