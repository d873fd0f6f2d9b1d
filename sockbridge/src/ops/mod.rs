//! Operation façades.
//!
//! Every façade validates its arguments, builds a native [`Request`],
//! drives it through the completion bridge and returns the resulting
//! [`Operation`]. Validation failures are returned synchronously as
//! [`Error::Argument`], before the native layer is involved.
//!
//! [`Request`]: crate::native::Request
//! [`Error::Argument`]: crate::Error::Argument

mod accept;
mod connect;
mod disconnect;
mod receive;
mod send;
mod send_file;
mod send_to;

use crate::bridge::{FromError, Operation};
use crate::error::{Error, Result};
use crate::message::{Codec, Message};
use crate::native::{BufferView, NativeSocket, Socket, SocketFlags, TransmitFileOptions};

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// Result of an operation that borrowed caller buffers.
///
/// The buffers come back in both the success and the failure case.
#[derive(Debug)]
pub struct BufResult<T, B>(pub Result<T>, pub B);

impl<T, B> BufResult<T, B> {
    pub fn into_parts(self) -> (Result<T>, B) {
        (self.0, self.1)
    }
}

impl<T, B> FromError for BufResult<T, B>
where
    T: Send + 'static,
    B: Default + Send + 'static,
{
    /// The buffers are lost when the bridge fails before handing them back.
    fn from_error(error: Error) -> Self {
        BufResult(Err(error), B::default())
    }
}

/// The asynchronous operations of a [`NativeSocket`].
///
/// Implemented for every native socket; import it to call the façades.
pub trait SocketExt: NativeSocket {
    /// Connects to `host:port`, resolving the host name first.
    fn connect_host(&self, host: &str, port: u16) -> Result<Operation<Result<()>>> {
        connect::connect_host(self, host, port)
    }

    fn connect_address(&self, address: IpAddr, port: u16) -> Result<Operation<Result<()>>> {
        connect::connect_address(self, address, port)
    }

    /// Connects to the first of `addresses` that accepts the connection.
    fn connect_addresses(&self, addresses: &[IpAddr], port: u16) -> Result<Operation<Result<()>>> {
        connect::connect_addresses(self, addresses, port)
    }

    fn connect(&self, endpoint: SocketAddr) -> Result<Operation<Result<()>>> {
        connect::connect(self, endpoint)
    }

    /// Closes the connection; with `reuse_socket` the socket may connect
    /// again afterwards.
    fn disconnect(&self, reuse_socket: bool) -> Result<Operation<Result<()>>> {
        disconnect::disconnect(self, reuse_socket)
    }

    /// Waits for the next incoming connection on a listening socket.
    fn accept(&self) -> Result<Operation<Result<Socket>>> {
        accept::accept(self)
    }

    /// Receives into `buffer`'s window. `Ok(0)` is returned as is.
    fn receive(
        &self,
        buffer: BufferView,
        flags: SocketFlags,
    ) -> Result<Operation<BufResult<usize, BufferView>>> {
        receive::receive(self, buffer, flags)
    }

    /// Scatter receive over several windows.
    fn receive_vectored(
        &self,
        buffers: Vec<BufferView>,
        flags: SocketFlags,
    ) -> Result<Operation<BufResult<usize, Vec<BufferView>>>> {
        receive::receive_vectored(self, buffers, flags)
    }

    fn send(
        &self,
        buffer: BufferView,
        flags: SocketFlags,
    ) -> Result<Operation<BufResult<usize, BufferView>>> {
        send::send(self, buffer, flags)
    }

    /// Gather send over several windows.
    fn send_vectored(
        &self,
        buffers: Vec<BufferView>,
        flags: SocketFlags,
    ) -> Result<Operation<BufResult<usize, Vec<BufferView>>>> {
        send::send_vectored(self, buffers, flags)
    }

    /// Sends a datagram to `endpoint`.
    fn send_to(
        &self,
        buffer: BufferView,
        flags: SocketFlags,
        endpoint: SocketAddr,
    ) -> Result<Operation<BufResult<usize, BufferView>>> {
        send_to::send_to(self, buffer, flags, endpoint)
    }

    /// Streams the file at `path` over the connection.
    fn send_file(&self, path: &Path) -> Result<Operation<Result<()>>> {
        send_file::send_file(self, path, None, None, TransmitFileOptions::USE_DEFAULT)
    }

    /// Streams `pre`, the file at `path` and `post`, then applies `options`.
    fn send_file_with(
        &self,
        path: &Path,
        pre: Option<Vec<u8>>,
        post: Option<Vec<u8>>,
        options: TransmitFileOptions,
    ) -> Result<Operation<Result<()>>> {
        send_file::send_file(self, path, pre, post, options)
    }

    /// Encodes `message` with `codec` into a fresh buffer and sends it.
    ///
    /// An empty message still issues a zero-length send.
    fn send_message<'a, C: Codec>(
        &self,
        message: impl Into<Message<'a>>,
        codec: &C,
        flags: SocketFlags,
    ) -> Result<Operation<BufResult<usize, BufferView>>> {
        crate::message::send_message(self, message.into(), codec, flags)
    }

    /// Encodes `message` into `buffer` at `index` and sends exactly the
    /// encoded bytes.
    fn send_message_into<'a, C: Codec>(
        &self,
        message: impl Into<Message<'a>>,
        codec: &C,
        flags: SocketFlags,
        buffer: Vec<u8>,
        index: usize,
    ) -> Result<Operation<BufResult<usize, BufferView>>> {
        crate::message::send_message_into(self, message.into(), codec, flags, buffer, index)
    }
}

impl<S: NativeSocket + ?Sized> SocketExt for S {}

/// Rejects an empty scatter/gather list.
fn require_buffers(buffers: &[BufferView]) -> Result<()> {
    if buffers.is_empty() {
        return Err(Error::argument("buffers", "at least one buffer is required"));
    }

    Ok(())
}

/// Gives back the single buffer of a one-view request.
fn single_buffer(request: Option<crate::native::Request>) -> BufferView {
    request
        .and_then(|request| request.into_buffers().into_iter().next())
        .unwrap_or_default()
}
