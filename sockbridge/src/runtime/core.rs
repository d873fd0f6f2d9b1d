use super::executor::Executor;
use super::task::JoinHandle;

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, Thread};

/// The runtime handle.
///
/// Dropping the runtime stops its workers once their current task yields.
/// Tasks still pending at that point are dropped.
pub struct Runtime {
    executor: Executor,
}

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

impl Runtime {
    pub(crate) fn new(worker_threads: usize, thread_name: &str) -> Self {
        Self {
            executor: Executor::new(worker_threads, thread_name),
        }
    }

    /// Spawns a future onto the runtime.
    ///
    /// The returned handle resolves to the future's output. Dropping it
    /// does not cancel the task.
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.executor.spawn(future)
    }

    /// Runs a future to completion on the workers, blocking the current
    /// thread until it finishes.
    ///
    /// # Panics
    ///
    /// A panic inside the future is resumed on the calling thread.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let result = runtime.block_on(async { 42 });
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let mut handle = pin!(self.spawn(future));

        let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
        let mut cx = Context::from_waker(&waker);

        loop {
            match handle.as_mut().poll(&mut cx) {
                Poll::Ready(value) => return value,
                Poll::Pending => thread::park(),
            }
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.executor.shutdown();
        self.executor.join();
    }
}
