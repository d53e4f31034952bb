use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_noise, encode_passing, Message, Passing, LINE_TERMINATOR, PASSING_MSG_LEN};
use crate::error::{Result, StreamError};

/// Writes protocol lines to any `Write` sink.
///
/// Each call writes one complete, terminated line and flushes. The writer has
/// no internal locking; share it behind a `Mutex` when several producers feed
/// the same sink.
pub struct Writer<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> Writer<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(PASSING_MSG_LEN + LINE_TERMINATOR.len()),
        }
    }

    /// Encode and write a passing, returning the number of bytes written.
    ///
    /// Nothing is written when the record cannot be encoded.
    pub fn write_passing(&mut self, rec: &Passing) -> Result<usize> {
        self.buf.clear();
        encode_passing(rec, &mut self.buf)?;
        self.write_buffered()
    }

    /// Encode and write a noise level, returning the number of bytes written.
    pub fn write_noise(&mut self, noise: u16) -> Result<usize> {
        self.buf.clear();
        encode_noise(noise, &mut self.buf);
        self.write_buffered()
    }

    /// Encode and write a message of either kind.
    pub fn write_message(&mut self, msg: &Message) -> Result<usize> {
        self.buf.clear();
        msg.encode(&mut self.buf)?;
        self.write_buffered()
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(StreamError::Io(err)),
            }
        }
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn write_buffered(&mut self) -> Result<usize> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(StreamError::WriteZero),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(StreamError::Io(err)),
            }
        }

        self.flush()?;
        Ok(offset)
    }
}
