use crate::bridge::{self, Operation};
use crate::error::Result;
use crate::native::{NativeSocket, Request};

pub(super) fn disconnect<S>(socket: &S, reuse_socket: bool) -> Result<Operation<Result<()>>>
where
    S: NativeSocket + ?Sized,
{
    Ok(bridge::drive(
        socket,
        Request::Disconnect { reuse_socket },
        |outcome, _| outcome.map(drop),
    ))
}
