use crate::runtime::task::Runnable;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Shared handle to the injector.
pub(crate) type InjectorHandle = Arc<Injector>;

/// Run queue shared by all workers.
///
/// Also coordinates parking: idle workers sleep on a condition variable
/// until a task is pushed or the runtime shuts down.
pub(crate) struct Injector {
    queue: Mutex<VecDeque<Arc<dyn Runnable>>>,
    condvar: Condvar,
    shutdown: AtomicBool,
}

impl Injector {
    pub(crate) fn new() -> Self {
        Injector {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Arc<dyn Runnable>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Signals shutdown and wakes all parked workers.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);

        let _queue = self.queue();
        self.condvar.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Pushes a task and wakes one parked worker.
    pub(crate) fn push(&self, task: Arc<dyn Runnable>) {
        self.queue().push_back(task);
        self.condvar.notify_one();
    }

    /// Takes the next task, parking until one arrives.
    ///
    /// Returns `None` once the runtime shuts down.
    pub(crate) fn next(&self) -> Option<Arc<dyn Runnable>> {
        let mut queue = self.queue();

        loop {
            if self.is_shutdown() {
                return None;
            }

            if let Some(task) = queue.pop_front() {
                return Some(task);
            }

            queue = self
                .condvar
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
