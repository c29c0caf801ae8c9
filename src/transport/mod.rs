//! Byte-oriented transport abstraction
// (c) 2025 Ross Younger

mod http;
mod memory;

pub use http::{HttpTransport, HttpTransportFactory};
pub use memory::MemoryBuffer;

use async_trait::async_trait;

use crate::config::Configuration;
use crate::error::{TransportError, TransportErrorKind};

/// A byte-oriented read/write/flush capability.
///
/// Reads and writes are synchronous; implementations are expected to buffer.
/// [`flush`](Transport::flush) is the only suspension point: it commits
/// buffered writes to the underlying medium and may block or be cancelled
/// (by dropping its future). A transport cancelled mid-flush is in an
/// undefined state and should be discarded.
///
/// The single-byte operations are the "extra" layer: they have working
/// defaults in terms of bulk reads and writes, and implementations with a
/// cheaper path may override them.
#[async_trait]
pub trait Transport: Send {
    /// Reads some bytes into `buf`, returning how many were read.
    /// Returns `Ok(0)` only when no more bytes will ever arrive.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Writes some bytes from `buf`, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError>;

    /// Commits buffered writes to the underlying medium.
    async fn flush(&mut self) -> Result<(), TransportError>;

    /// Reads exactly `buf.len()` bytes.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(TransportError::new(
                    TransportErrorKind::Eof,
                    format!("unexpected end of stream ({filled} of {} bytes)", buf.len()),
                ));
            }
            filled += n;
        }
        Ok(())
    }

    /// Writes all of `buf`.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..])?;
            if n == 0 {
                return Err(TransportError::new(
                    TransportErrorKind::Eof,
                    "transport accepted no bytes",
                ));
            }
            written += n;
        }
        Ok(())
    }

    /// Reads a single byte.
    fn read_u8(&mut self) -> Result<u8, TransportError> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    /// Writes a single byte.
    fn write_u8(&mut self, v: u8) -> Result<(), TransportError> {
        self.write_all(&[v])
    }

    /// Accepts a configuration. The default implementation ignores it;
    /// transports that care (buffer sizing, limits) opt in by overriding.
    fn set_configuration(&mut self, _cfg: &Configuration) {}
}

/// Mints fresh transports, for clients that manage connections.
pub trait TransportFactory: Send + Sync {
    /// The transport type produced
    type Output: Transport;

    /// Creates a fresh, unconnected transport.
    fn transport(&self) -> Result<Self::Output, TransportError>;
}
