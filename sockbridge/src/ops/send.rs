use super::{BufResult, require_buffers, single_buffer};

use crate::bridge::{self, Operation};
use crate::error::Result;
use crate::native::{BufferView, NativeSocket, Request, SocketFlags};

pub(super) fn send<S>(
    socket: &S,
    buffer: BufferView,
    flags: SocketFlags,
) -> Result<Operation<BufResult<usize, BufferView>>>
where
    S: NativeSocket + ?Sized,
{
    let request = Request::Send {
        buffers: vec![buffer],
        flags,
    };

    Ok(bridge::drive(socket, request, |outcome, request| {
        BufResult(outcome.map(|t| t.bytes), single_buffer(request))
    }))
}

pub(super) fn send_vectored<S>(
    socket: &S,
    buffers: Vec<BufferView>,
    flags: SocketFlags,
) -> Result<Operation<BufResult<usize, Vec<BufferView>>>>
where
    S: NativeSocket + ?Sized,
{
    require_buffers(&buffers)?;

    let request = Request::Send { buffers, flags };

    Ok(bridge::drive(socket, request, |outcome, request| {
        BufResult(
            outcome.map(|t| t.bytes),
            request.map(Request::into_buffers).unwrap_or_default(),
        )
    }))
}
