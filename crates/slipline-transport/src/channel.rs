use std::fmt;
use std::io::{ErrorKind, Read, Write};

use tracing::trace;

use crate::error::{Result, TransportError};

/// A raw byte channel: the only thing the framing layer knows about the wire.
///
/// `read` may return fewer bytes than the buffer holds. Returning `Ok(0)`
/// means "nothing available right now" (a timeout on a serial line, an empty
/// receive window on a socket) and is not an error. `size_hint` is the number
/// of bytes the caller expects, which a line with known symbol timing may use
/// to wait for them; implementations are free to ignore it.
///
/// `write` either accepts the whole buffer or reports an error.
pub trait Channel {
    /// Read available bytes into `buf`.
    fn read(&mut self, buf: &mut [u8], size_hint: usize) -> Result<usize>;

    /// Write `buf` to the wire.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn read(&mut self, buf: &mut [u8], size_hint: usize) -> Result<usize> {
        (**self).read(buf, size_hint)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn read(&mut self, buf: &mut [u8], size_hint: usize) -> Result<usize> {
        (**self).read(buf, size_hint)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }
}

/// Adapts any `Read + Write` byte stream (an opened serial device, a pipe,
/// a TCP stream) to [`Channel`].
///
/// Stream reads that time out, would block or return zero bytes are reported
/// as "no data". This matches a serial device opened with a read timeout,
/// where a zero-length read is the timeout. Interrupted calls are retried.
pub struct IoChannel<T> {
    inner: T,
    log_data: bool,
}

impl<T: Read + Write> IoChannel<T> {
    /// Wrap a stream.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            log_data: false,
        }
    }

    /// Trace every chunk read and written on this channel as hex.
    pub fn with_data_logging(mut self, enabled: bool) -> Self {
        self.log_data = enabled;
        self
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the channel and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> Channel for IoChannel<T> {
    fn read(&mut self, buf: &mut [u8], _size_hint: usize) -> Result<usize> {
        loop {
            match self.inner.read(buf) {
                Ok(n) => {
                    if self.log_data && n > 0 {
                        trace!(data = %HexDump(&buf[..n]), "channel read");
                    }
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => return Ok(0),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.log_data {
            trace!(data = %HexDump(buf), "channel write");
        }

        let mut offset = 0usize;
        while offset < buf.len() {
            match self.inner.write(&buf[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(offset),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<T> fmt::Debug for IoChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoChannel")
            .field("log_data", &self.log_data)
            .finish_non_exhaustive()
    }
}

pub(crate) fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// Formats a byte slice as space-separated lowercase hex pairs.
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, byte) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
