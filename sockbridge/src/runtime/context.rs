use super::executor::InjectorHandle;

use std::cell::RefCell;

thread_local! {
    /// Injector of the runtime the current thread works for.
    pub(crate) static CURRENT_INJECTOR: RefCell<Option<InjectorHandle>> =
        const { RefCell::new(None) };
}

/// Runs `f` with `injector` installed as the current runtime context.
///
/// The previous context is restored afterwards.
pub(crate) fn enter_context<R>(injector: InjectorHandle, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT_INJECTOR.with(|cell| cell.replace(Some(injector)));
    let out = f();
    CURRENT_INJECTOR.with(|cell| cell.replace(previous));

    out
}

/// The injector of the current runtime, if any.
pub(crate) fn current_injector() -> Option<InjectorHandle> {
    CURRENT_INJECTOR.with(|cell| cell.borrow().clone())
}
