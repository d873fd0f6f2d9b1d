use crate::bridge::{self, Operation};
use crate::error::{Error, Result};
use crate::native::{NativeSocket, Request, Socket};

use std::io;

pub(super) fn accept<S>(socket: &S) -> Result<Operation<Result<Socket>>>
where
    S: NativeSocket + ?Sized,
{
    Ok(bridge::drive(socket, Request::Accept, |outcome, _| -> Result<Socket> {
        outcome?.accepted.ok_or_else(|| {
            Error::from(io::Error::new(
                io::ErrorKind::InvalidData,
                "accept completed without a connected socket",
            ))
        })
    }))
}
