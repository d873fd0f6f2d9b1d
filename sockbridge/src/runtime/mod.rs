//! Task runtime.
//!
//! A small multi-threaded executor used to await socket operations from
//! synchronous code (`main`, tests). Tasks are pushed to a shared injector
//! queue and picked up by a fixed set of worker threads.
//!
//! The runtime does not drive any I/O itself: socket operations complete
//! on the native I/O thread and simply wake the task awaiting them.

mod builder;
mod context;
mod core;
mod executor;

pub mod task;

pub use builder::RuntimeBuilder;
pub use core::Runtime;
