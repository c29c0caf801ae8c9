//! In-memory buffer transport
// (c) 2025 Ross Younger

use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};

use crate::config::Configuration;
use crate::error::{TransportError, TransportErrorKind};
use crate::transport::Transport;

/// A transport backed by a growable byte queue.
///
/// Writes append at the back; reads drain from the front. [`flush`](Transport::flush)
/// is a no-op. This is the workhorse of the test suite and the request
/// accumulator pattern used by buffering transports.
#[derive(Debug, Default)]
pub struct MemoryBuffer {
    buf: BytesMut,
}

impl MemoryBuffer {
    /// Creates a buffer with initial capacity taken from the configuration.
    #[must_use]
    pub fn new(cfg: Option<Configuration>) -> Self {
        Self {
            buf: BytesMut::with_capacity(Configuration::resolve(cfg).max_buffer_size),
        }
    }

    /// Number of bytes currently queued
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// A view of the queued bytes, front first
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

#[async_trait]
impl Transport for MemoryBuffer {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let n = self.buf.len().min(buf.len());
        self.buf.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        self.buf.put_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn read_u8(&mut self) -> Result<u8, TransportError> {
        if self.buf.is_empty() {
            return Err(TransportError::new(
                TransportErrorKind::Eof,
                "unexpected end of stream (buffer empty)",
            ));
        }
        Ok(self.buf.get_u8())
    }

    fn write_u8(&mut self, v: u8) -> Result<(), TransportError> {
        self.buf.put_u8(v);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryBuffer;
    use crate::error::TransportErrorKind;
    use crate::transport::Transport;
    use pretty_assertions::assert_eq;

    #[test]
    fn fifo_order() {
        let mut t = MemoryBuffer::default();
        t.write_all(b"hello").unwrap();
        t.write_u8(b'!').unwrap();
        let mut out = [0u8; 6];
        t.read_exact(&mut out).unwrap();
        assert_eq!(&out, b"hello!");
        assert!(t.is_empty());
    }

    #[test]
    fn reading_past_the_end_is_eof() {
        let mut t = MemoryBuffer::default();
        t.write_all(b"ab").unwrap();
        let mut out = [0u8; 3];
        let e = t.read_exact(&mut out).unwrap_err();
        assert_eq!(e.kind(), TransportErrorKind::Eof);
        let e = t.read_u8().unwrap_err();
        assert_eq!(e.kind(), TransportErrorKind::Eof);
    }
}
