//! Task executor.
//!
//! - [`core`]: executor lifecycle (spawning workers, shutdown),
//! - [`injector`]: the shared run queue and worker parking,
//! - [`worker`]: the worker loop.

mod core;
mod injector;
mod worker;

pub(crate) use core::Executor;
pub(crate) use injector::{Injector, InjectorHandle};
