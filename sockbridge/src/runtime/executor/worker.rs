use super::injector::InjectorHandle;

use crate::runtime::context::enter_context;

/// A worker thread: takes tasks from the injector and runs them until the
/// runtime shuts down.
pub(crate) struct Worker {
    id: usize,
    injector: InjectorHandle,
}

impl Worker {
    pub(crate) fn new(id: usize, injector: InjectorHandle) -> Self {
        Self { id, injector }
    }

    pub(crate) fn run(self) {
        tracing::trace!(worker = self.id, "worker started");

        enter_context(self.injector.clone(), || {
            while let Some(task) = self.injector.next() {
                task.run();
            }
        });

        tracing::trace!(worker = self.id, "worker stopped");
    }
}
