//! Spawned tasks.
//!
//! [`spawn`] queues a future on the current runtime and returns a
//! [`JoinHandle`] resolving to its output.

mod core;
mod handle;
mod state;

pub(crate) use core::{Runnable, Task};

pub use core::spawn;
pub use handle::JoinHandle;
