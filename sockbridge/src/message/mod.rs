//! Message composer: encode text, then send it.

mod codec;

pub use codec::{Ascii, Codec, Utf16Le, Utf8};

use crate::bridge::Operation;
use crate::error::{Error, Result};
use crate::native::{BufferView, NativeSocket, SocketFlags};
use crate::ops::{BufResult, SocketExt};

/// Text payload of a message.
#[derive(Clone, Copy, Debug)]
pub enum Message<'a> {
    Text(&'a str),
    /// `count` characters of `chars`, starting at `index`.
    Chars {
        chars: &'a [char],
        index: usize,
        count: usize,
    },
}

impl<'a> From<&'a str> for Message<'a> {
    fn from(text: &'a str) -> Self {
        Message::Text(text)
    }
}

impl<'a> From<&'a String> for Message<'a> {
    fn from(text: &'a String) -> Self {
        Message::Text(text)
    }
}

impl<'a> From<&'a [char]> for Message<'a> {
    fn from(chars: &'a [char]) -> Self {
        Message::Chars {
            chars,
            index: 0,
            count: chars.len(),
        }
    }
}

impl Message<'_> {
    fn validate(&self) -> Result<()> {
        if let Message::Chars {
            chars,
            index,
            count,
        } = *self
        {
            if index > chars.len() {
                return Err(Error::argument(
                    "index",
                    format!("{index} is past the end of {} characters", chars.len()),
                ));
            }

            if count > chars.len() - index {
                return Err(Error::argument(
                    "count",
                    format!(
                        "{count} characters from {index} overrun {} characters",
                        chars.len()
                    ),
                ));
            }
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        match *self {
            Message::Text(text) => text.is_empty(),
            Message::Chars { count, .. } => count == 0,
        }
    }

    fn byte_count<C: Codec>(&self, codec: &C) -> usize {
        match *self {
            Message::Text(text) => codec.byte_count(text.chars()),
            Message::Chars {
                chars,
                index,
                count,
            } => codec.byte_count(chars[index..index + count].iter().copied()),
        }
    }

    fn encode<C: Codec>(&self, codec: &C, dst: &mut [u8]) -> usize {
        match *self {
            Message::Text(text) => codec.encode(text.chars(), dst),
            Message::Chars {
                chars,
                index,
                count,
            } => codec.encode(chars[index..index + count].iter().copied(), dst),
        }
    }
}

pub(crate) fn send_message<S, C>(
    socket: &S,
    message: Message<'_>,
    codec: &C,
    flags: SocketFlags,
) -> Result<Operation<BufResult<usize, BufferView>>>
where
    S: NativeSocket + ?Sized,
    C: Codec,
{
    message.validate()?;

    if message.is_empty() {
        return socket.send(BufferView::empty(), flags);
    }

    let mut bytes = vec![0; message.byte_count(codec)];
    let written = message.encode(codec, &mut bytes);
    bytes.truncate(written);

    socket.send(BufferView::full(bytes), flags)
}

pub(crate) fn send_message_into<S, C>(
    socket: &S,
    message: Message<'_>,
    codec: &C,
    flags: SocketFlags,
    mut buffer: Vec<u8>,
    index: usize,
) -> Result<Operation<BufResult<usize, BufferView>>>
where
    S: NativeSocket + ?Sized,
    C: Codec,
{
    message.validate()?;

    if index > buffer.len() {
        return Err(Error::argument(
            "buffer_index",
            format!("{index} is past the end of a {}-byte buffer", buffer.len()),
        ));
    }

    let needed = message.byte_count(codec);

    if needed > buffer.len() - index {
        return Err(Error::argument(
            "buffer",
            format!(
                "{needed} encoded bytes do not fit in {} bytes from index {index}",
                buffer.len() - index
            ),
        ));
    }

    let written = message.encode(codec, &mut buffer[index..index + needed]);

    socket.send(BufferView::new(buffer, index, written)?, flags)
}
