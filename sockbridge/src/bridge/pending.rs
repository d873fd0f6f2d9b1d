use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

enum Slot<T> {
    Waiting(Option<Waker>),
    Ready(T),
    Consumed,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Future of one in-flight socket operation.
///
/// It resolves exactly once, to the value of the first completion the
/// native layer reports. The operation keeps running if the future is
/// dropped; its result is then discarded.
///
/// # Panics
///
/// Polling again after the future returned `Poll::Ready` panics.
#[must_use = "the operation result is only observable by awaiting it"]
pub struct Operation<T> {
    shared: Arc<Shared<T>>,
}

/// Write side of an [`Operation`].
pub(crate) struct Resolver<T> {
    shared: Arc<Shared<T>>,
}

/// Creates a linked unresolved operation and its resolver.
pub(crate) fn pending<T>() -> (Operation<T>, Resolver<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Waiting(None)),
    });

    (
        Operation {
            shared: shared.clone(),
        },
        Resolver { shared },
    )
}

impl<T> Operation<T> {
    /// Whether a result has been stored (or already consumed).
    pub fn is_complete(&self) -> bool {
        !matches!(*self.shared.lock(), Slot::Waiting(_))
    }
}

impl<T> Future for Operation<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut slot = self.shared.lock();

        match mem::replace(&mut *slot, Slot::Consumed) {
            Slot::Ready(value) => Poll::Ready(value),
            Slot::Waiting(_) => {
                *slot = Slot::Waiting(Some(cx.waker().clone()));
                Poll::Pending
            }
            Slot::Consumed => panic!("`Operation` polled after completion"),
        }
    }
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("complete", &self.is_complete())
            .finish()
    }
}

impl<T> Resolver<T> {
    /// Stores `value` unless a value was stored before.
    ///
    /// Returns whether this call resolved the operation. Later calls are
    /// no-ops.
    pub(crate) fn resolve(&self, value: T) -> bool {
        let waker = {
            let mut slot = self.shared.lock();

            match &mut *slot {
                Slot::Waiting(waker) => {
                    let waker = waker.take();
                    *slot = Slot::Ready(value);
                    waker
                }
                Slot::Ready(_) | Slot::Consumed => return false,
            }
        };

        if let Some(waker) = waker {
            waker.wake();
        }

        true
    }
}
