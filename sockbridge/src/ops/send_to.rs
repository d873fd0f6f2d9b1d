use super::{BufResult, single_buffer};

use crate::bridge::{self, Operation};
use crate::error::{Error, Result};
use crate::native::{BufferView, NativeSocket, Request, SocketFlags};

use std::net::SocketAddr;

pub(super) fn send_to<S>(
    socket: &S,
    buffer: BufferView,
    flags: SocketFlags,
    endpoint: SocketAddr,
) -> Result<Operation<BufResult<usize, BufferView>>>
where
    S: NativeSocket + ?Sized,
{
    if endpoint.port() == 0 {
        return Err(Error::argument("endpoint", "port 0 cannot be sent to"));
    }

    let request = Request::SendTo {
        buffer,
        flags,
        endpoint,
    };

    Ok(bridge::drive(socket, request, |outcome, request| {
        BufResult(outcome.map(|t| t.bytes), single_buffer(request))
    }))
}
