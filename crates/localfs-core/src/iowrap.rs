//! Reader adapters used by the byte-stream operations.

use std::io::{self, Read};

/// Passes every chunk read from the inner reader to a callback.
pub(crate) struct CallbackReader<'a, R> {
    inner: R,
    on_chunk: &'a mut dyn FnMut(&[u8]),
}

impl<'a, R: Read> CallbackReader<'a, R> {
    pub(crate) fn new(inner: R, on_chunk: &'a mut dyn FnMut(&[u8])) -> Self {
        Self { inner, on_chunk }
    }
}

impl<R: Read> Read for CallbackReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            (self.on_chunk)(&buf[..n]);
        }
        Ok(n)
    }
}
