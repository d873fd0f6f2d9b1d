use crate::bridge::{self, Operation};
use crate::error::{Error, Result};
use crate::native::{NativeSocket, Request, TransmitFileOptions};

use std::path::Path;

pub(super) fn send_file<S>(
    socket: &S,
    path: &Path,
    pre: Option<Vec<u8>>,
    post: Option<Vec<u8>>,
    options: TransmitFileOptions,
) -> Result<Operation<Result<()>>>
where
    S: NativeSocket + ?Sized,
{
    if path.as_os_str().is_empty() {
        return Err(Error::argument("path", "file path is empty"));
    }

    let request = Request::SendFile {
        path: path.to_path_buf(),
        pre,
        post,
        options,
    };

    Ok(bridge::drive(socket, request, |outcome, _| outcome.map(drop)))
}
