//! # sockbridge
//!
//! **sockbridge** exposes socket operations as futures, whatever completion
//! mechanism the underlying socket offers.
//!
//! A native socket reports completions either through a **callback pair**
//! (begin the operation, then call *end* inside a callback) or through an
//! **event completion** (submit an argument object that either completes
//! on the spot or fires its completed handler later). The completion bridge
//! turns both into one [`Operation`] future that resolves exactly once, and
//! the operation façades of [`SocketExt`] put argument validation in front
//! of it.
//!
//! - **Façades**: connect (host, address, address list, endpoint),
//!   disconnect, accept, receive, send (single or vectored), send_to,
//!   send_file
//! - **Message composer**: encode text with a [`Codec`], then send it
//! - **Native layer**: [`Socket`], a non-blocking OS socket implementing both
//!   mechanisms on top of a dedicated I/O thread
//! - **Runtime**: a small executor and `#[sockbridge::main]` /
//!   `#[sockbridge::test]` to await operations from synchronous code
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sockbridge::{Ascii, BufferView, Socket, SocketExt, SocketFlags};
//!
//! #[sockbridge::main]
//! async fn main() -> sockbridge::Result<()> {
//!     let socket = Socket::new();
//!     socket.connect_host("localhost", 11000)?.await?;
//!
//!     let sent = socket.send_message("ping<EOF>", &Ascii, SocketFlags::NONE)?.await;
//!     sent.0?;
//!
//!     let received = socket.receive(BufferView::full(vec![0; 1024]), SocketFlags::NONE)?.await;
//!     let n = received.0?;
//!     println!("{}", String::from_utf8_lossy(&received.1.as_slice()[..n]));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Mechanism selection
//!
//! Sockets use the callback pair by default, or the event completion when
//! the `event-completion` feature is enabled. [`SocketBuilder::mechanism`]
//! overrides the default per socket.

mod bridge;
mod error;
mod message;
mod ops;
mod runtime;

pub mod native;

pub use bridge::Operation;
pub use error::{Error, Result};
pub use message::{Ascii, Codec, Message, Utf8, Utf16Le};
pub use native::{
    BufferView, Mechanism, Socket, SocketBuilder, SocketError, SocketFlags, SocketKind,
    TransmitFileOptions,
};
pub use ops::{BufResult, SocketExt};
pub use runtime::task;
pub use runtime::{Runtime, RuntimeBuilder};

pub use sockbridge_macros::{main, test};
