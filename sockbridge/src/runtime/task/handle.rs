use super::Task;

use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::sync::{Arc, PoisonError};
use std::task::{Context, Poll};

/// Handle to a spawned task; resolves to its output.
///
/// Dropping the handle does **not** cancel the task.
///
/// # Panics
///
/// If the task panicked, awaiting the handle resumes that panic.
pub struct JoinHandle<T> {
    pub(crate) task: Arc<Task<T>>,
}

impl<T: Send + 'static> JoinHandle<T> {
    pub fn is_finished(&self) -> bool {
        self.task.is_complete()
    }

    fn take(&self) -> Poll<T> {
        let result = self
            .task
            .result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match result {
            Some(Ok(value)) => Poll::Ready(value),
            Some(Err(payload)) => panic::resume_unwind(payload),
            None => panic!("`JoinHandle` polled after completion"),
        }
    }
}

impl<T: Send + 'static> Future for JoinHandle<T> {
    type Output = T;

    /// The waker is registered before the state is checked a second time,
    /// so a completion in between is not missed.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if self.task.is_complete() {
            return self.take();
        }

        self.task
            .waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cx.waker().clone());

        if self.task.is_complete() {
            return self.take();
        }

        Poll::Pending
    }
}
