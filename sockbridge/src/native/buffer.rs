use crate::error::{Error, Result};

/// A `(offset, len)` window over a caller-owned byte buffer.
///
/// The buffer travels with the operation and comes back to the caller with
/// the result, so the native layer can fill or drain it from the completion
/// thread without copying.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferView {
    buffer: Vec<u8>,
    offset: usize,
    len: usize,
}

impl BufferView {
    /// Creates a window of `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] when the window does not fit in `buffer`.
    pub fn new(buffer: Vec<u8>, offset: usize, len: usize) -> Result<Self> {
        if offset > buffer.len() {
            return Err(Error::argument(
                "offset",
                format!("{offset} is past the end of a {}-byte buffer", buffer.len()),
            ));
        }

        if len > buffer.len() - offset {
            return Err(Error::argument(
                "size",
                format!(
                    "{len} bytes from offset {offset} overrun a {}-byte buffer",
                    buffer.len()
                ),
            ));
        }

        Ok(Self {
            buffer,
            offset,
            len,
        })
    }

    /// A window covering the whole buffer.
    pub fn full(buffer: Vec<u8>) -> Self {
        let len = buffer.len();

        Self {
            buffer,
            offset: 0,
            len,
        }
    }

    /// A zero-length window over an empty buffer.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bytes inside the window.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[self.offset..self.offset + self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buffer[self.offset..self.offset + self.len]
    }

    /// The whole underlying buffer, window or not.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

impl From<Vec<u8>> for BufferView {
    fn from(buffer: Vec<u8>) -> Self {
        BufferView::full(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_selects_bytes() {
        let view = BufferView::new(b"hello world".to_vec(), 6, 5).unwrap();

        assert_eq!(view.as_slice(), b"world");
        assert_eq!(view.offset(), 6);
        assert_eq!(view.len(), 5);
        assert_eq!(view.buffer().len(), 11);
    }

    #[test]
    fn test_window_at_end_is_empty() {
        let view = BufferView::new(vec![0; 4], 4, 0).unwrap();

        assert!(view.is_empty());
        assert!(view.as_slice().is_empty());
    }

    #[test]
    fn test_out_of_range_window_is_rejected() {
        let err = BufferView::new(vec![0; 4], 5, 0).unwrap_err();
        assert!(matches!(err, Error::Argument { name: "offset", .. }));

        let err = BufferView::new(vec![0; 4], 2, 3).unwrap_err();
        assert!(matches!(err, Error::Argument { name: "size", .. }));
    }

    #[test]
    fn test_writes_stay_inside_window() {
        let mut view = BufferView::new(vec![0; 6], 2, 2).unwrap();
        view.as_mut_slice().copy_from_slice(b"ok");

        assert_eq!(view.into_inner(), b"\0\0ok\0\0".to_vec());
    }
}
