//! Blocking byte sources that deliver a request body.

use std::io::{self, Read};

/// A blocking source of request body bytes.
///
/// Unlike [`std::io::Read`], a read returning `0` does not mean end of
/// stream: the source may simply have nothing ready yet. Callers decide how
/// many consecutive empty reads they tolerate.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes into `buf`, returning how many were read.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_chunk(buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_chunk(buf)
    }
}

/// Adapts any [`std::io::Read`] into a [`ByteSource`].
///
/// End of stream shows up as empty reads, which a body reader eventually
/// reports as a stall if the declared length was not reached.
#[derive(Debug)]
pub struct ReadSource<R> {
    inner: R,
}

impl<R: Read> ReadSource<R> {
    /// Wrap a reader.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Borrow the wrapped reader.
    #[must_use]
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the reader.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl ByteSource for &[u8] {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }
}
