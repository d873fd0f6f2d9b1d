/// Turns characters into bytes for [`send_message`](crate::SocketExt::send_message).
///
/// `encode` must write exactly `byte_count` bytes for the same characters.
pub trait Codec {
    fn byte_count<I>(&self, chars: I) -> usize
    where
        I: Iterator<Item = char>;

    /// Encodes `chars` into the front of `dst` and returns the bytes
    /// written. `dst` holds at least `byte_count` bytes.
    fn encode<I>(&self, chars: I, dst: &mut [u8]) -> usize
    where
        I: Iterator<Item = char>;
}

/// 7-bit ASCII. Anything else becomes `?`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ascii;

impl Codec for Ascii {
    fn byte_count<I>(&self, chars: I) -> usize
    where
        I: Iterator<Item = char>,
    {
        chars.count()
    }

    fn encode<I>(&self, chars: I, dst: &mut [u8]) -> usize
    where
        I: Iterator<Item = char>,
    {
        let mut written = 0;

        for (slot, c) in dst.iter_mut().zip(chars) {
            *slot = if c.is_ascii() { c as u8 } else { b'?' };
            written += 1;
        }

        written
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Utf8;

impl Codec for Utf8 {
    fn byte_count<I>(&self, chars: I) -> usize
    where
        I: Iterator<Item = char>,
    {
        chars.map(char::len_utf8).sum()
    }

    fn encode<I>(&self, chars: I, dst: &mut [u8]) -> usize
    where
        I: Iterator<Item = char>,
    {
        let mut written = 0;

        for c in chars {
            written += c.encode_utf8(&mut dst[written..]).len();
        }

        written
    }
}

/// UTF-16, little endian, no byte order mark.
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf16Le;

impl Codec for Utf16Le {
    fn byte_count<I>(&self, chars: I) -> usize
    where
        I: Iterator<Item = char>,
    {
        chars.map(|c| c.len_utf16() * 2).sum()
    }

    fn encode<I>(&self, chars: I, dst: &mut [u8]) -> usize
    where
        I: Iterator<Item = char>,
    {
        let mut written = 0;
        let mut units = [0u16; 2];

        for c in chars {
            for unit in c.encode_utf16(&mut units) {
                dst[written..written + 2].copy_from_slice(&unit.to_le_bytes());
                written += 2;
            }
        }

        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_all<C: Codec>(codec: &C, text: &str) -> Vec<u8> {
        let mut dst = vec![0; codec.byte_count(text.chars())];
        let written = codec.encode(text.chars(), &mut dst);

        assert_eq!(written, dst.len());
        dst
    }

    #[test]
    fn test_ascii_replaces_non_ascii() {
        assert_eq!(encode_all(&Ascii, "héllo"), b"h?llo".to_vec());
    }

    #[test]
    fn test_utf8_matches_str_bytes() {
        assert_eq!(encode_all(&Utf8, "héllo ✓"), "héllo ✓".as_bytes().to_vec());
    }

    #[test]
    fn test_utf16_handles_surrogate_pairs() {
        let bytes = encode_all(&Utf16Le, "a😀");

        assert_eq!(bytes, vec![0x61, 0x00, 0x3d, 0xd8, 0x00, 0xde]);
    }
}
