use super::JoinHandle;
use super::state::{COMPLETED, IDLE, NOTIFIED, QUEUED, RUNNING};

use crate::runtime::context::current_injector;
use crate::runtime::executor::Injector;

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Wake, Waker};
use std::thread;

/// Type-erased task, as seen by the workers.
pub(crate) trait Runnable: Send + Sync {
    fn run(self: Arc<Self>);
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A spawned future plus its scheduling state.
pub(crate) struct Task<T> {
    /// Taken out once the future completes.
    future: Mutex<Option<BoxFuture<T>>>,
    /// The output, or the panic payload if polling panicked.
    pub(crate) result: Mutex<Option<thread::Result<T>>>,
    pub(crate) state: AtomicUsize,
    injector: Arc<Injector>,
    /// Wakers of `JoinHandle`s awaiting this task.
    pub(crate) waiters: Mutex<Vec<Waker>>,
}

fn lock<U>(mutex: &Mutex<U>) -> MutexGuard<'_, U> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Send + 'static> Task<T> {
    pub(crate) fn new<F>(future: F, injector: Arc<Injector>) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            future: Mutex::new(Some(Box::pin(future))),
            result: Mutex::new(None),
            state: AtomicUsize::new(QUEUED),
            injector,
            waiters: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPLETED
    }

    /// Polls the future once.
    ///
    /// A wakeup that arrives while polling re-queues the task afterwards.
    fn poll_once(self: Arc<Self>) {
        let current = self.state.load(Ordering::Acquire);

        if current != QUEUED && current != NOTIFIED {
            return;
        }

        if self
            .state
            .compare_exchange(current, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = Waker::from(self.clone());
        let mut cx = Context::from_waker(&waker);

        let mut slot = lock(&self.future);
        let Some(future) = slot.as_mut() else {
            return;
        };

        let poll = panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)));

        let output = match poll {
            Ok(Poll::Pending) => {
                drop(slot);

                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    self.state.store(QUEUED, Ordering::Release);
                    self.injector.push(self.clone());
                }

                return;
            }
            Ok(Poll::Ready(value)) => Ok(value),
            Err(payload) => Err(payload),
        };

        *slot = None;
        drop(slot);

        *lock(&self.result) = Some(output);
        self.state.store(COMPLETED, Ordering::Release);

        for waiter in lock(&self.waiters).drain(..) {
            waiter.wake();
        }
    }

    /// Schedules the task if it is idle; flags it if it is running.
    fn schedule(self: &Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.injector.push(self.clone());
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                _ => return,
            }
        }
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn run(self: Arc<Self>) {
        self.poll_once();
    }
}

impl<T: Send + 'static> Wake for Task<T> {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.schedule();
    }
}

/// Spawns a future onto the current runtime.
///
/// # Panics
///
/// Panics if called outside a runtime worker.
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let injector =
        current_injector().expect("spawn must be called within the context of a runtime");

    let task = Arc::new(Task::new(future, injector.clone()));
    injector.push(task.clone());

    JoinHandle { task }
}
