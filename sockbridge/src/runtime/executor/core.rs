use super::injector::Injector;
use super::worker::Worker;

use crate::runtime::task::{JoinHandle, Task};

use std::future::Future;
use std::sync::Arc;
use std::thread::{self, JoinHandle as ThreadHandle};

/// Multi-threaded task executor.
///
/// Owns the shared injector and the worker threads.
pub(crate) struct Executor {
    injector: Arc<Injector>,
    handles: Vec<ThreadHandle<()>>,
}

impl Executor {
    /// Spawns `threads` workers named `{thread_name}-{index}`.
    pub(crate) fn new(threads: usize, thread_name: &str) -> Self {
        let injector = Arc::new(Injector::new());
        let mut handles = Vec::with_capacity(threads);

        for id in 0..threads {
            let worker = Worker::new(id, injector.clone());

            let spawned = thread::Builder::new()
                .name(format!("{thread_name}-{id}"))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => tracing::error!(worker = id, error = %e, "failed to spawn worker"),
            }
        }

        Self { injector, handles }
    }

    /// Signals every worker to stop.
    pub(crate) fn shutdown(&self) {
        self.injector.shutdown();
    }

    /// Queues a new task. Tasks spawned after shutdown never run.
    pub(crate) fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let task = Arc::new(Task::new(future, self.injector.clone()));
        self.injector.push(task.clone());

        JoinHandle { task }
    }

    /// Waits for every worker thread to exit.
    pub(crate) fn join(&mut self) {
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
