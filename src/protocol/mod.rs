//! Wire protocol codecs
//!
//! A [`Protocol`] frames values and messages over a [`Transport`]. Two
//! implementations are provided: [`BinaryProtocol`] (fixed-width
//! big-endian) and [`CompactProtocol`] (varint/zig-zag with field-identity
//! deltas and packed booleans). When paired, the two round-trip every
//! value the codec layer can produce; each is also byte-compatible with
//! the published Thrift wire specification it implements.
//!
//! Protocols are not safe for concurrent use; sharing one requires
//! external serialization, which the standard client provides.
// (c) 2025 Ross Younger

mod binary;
mod compact;

pub use binary::{BinaryProtocol, BinaryProtocolFactory};
pub use compact::{CompactProtocol, CompactProtocolFactory};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ProtocolError, ProtocolErrorKind};
use crate::transport::Transport;
use crate::types::{
    TFieldHeader, TListHeader, TMapHeader, TMessageHeader, TSetHeader, TStructHeader, TType,
};

/// Framing and scalar encoding over a transport.
///
/// Operations come in begin/end pairs for messages, structs, fields and
/// containers, plus scalar readers and writers. The `*_end` operations
/// are no-ops on both provided wire formats but remain part of the
/// contract: a decoder must close every container it opens with the
/// matching end call.
///
/// [`flush`](Protocol::flush) is the only suspension point; everything
/// else is synchronous against the (buffering) transport.
#[allow(missing_docs)] // operation names follow the wire model directly
#[async_trait]
pub trait Protocol: Send {
    fn write_message_begin(&mut self, h: &TMessageHeader) -> Result<(), ProtocolError>;
    fn write_message_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
    fn write_struct_begin(&mut self, h: &TStructHeader) -> Result<(), ProtocolError>;
    fn write_struct_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
    fn write_field_begin(&mut self, h: &TFieldHeader) -> Result<(), ProtocolError>;
    fn write_field_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
    /// Marks end-of-struct on the wire.
    fn write_field_stop(&mut self) -> Result<(), ProtocolError>;
    fn write_map_begin(&mut self, h: &TMapHeader) -> Result<(), ProtocolError>;
    fn write_map_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
    fn write_set_begin(&mut self, h: &TSetHeader) -> Result<(), ProtocolError>;
    fn write_set_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
    fn write_list_begin(&mut self, h: &TListHeader) -> Result<(), ProtocolError>;
    fn write_list_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<(), ProtocolError>;
    fn write_byte(&mut self, v: u8) -> Result<(), ProtocolError>;
    fn write_double(&mut self, v: f64) -> Result<(), ProtocolError>;
    fn write_u16(&mut self, v: u16) -> Result<(), ProtocolError>;
    fn write_i16(&mut self, v: i16) -> Result<(), ProtocolError>;
    fn write_u32(&mut self, v: u32) -> Result<(), ProtocolError>;
    fn write_i32(&mut self, v: i32) -> Result<(), ProtocolError>;
    fn write_u64(&mut self, v: u64) -> Result<(), ProtocolError>;
    fn write_i64(&mut self, v: i64) -> Result<(), ProtocolError>;
    fn write_string(&mut self, v: &str) -> Result<(), ProtocolError>;
    fn write_binary(&mut self, v: &[u8]) -> Result<(), ProtocolError>;

    fn read_message_begin(&mut self) -> Result<TMessageHeader, ProtocolError>;
    fn read_message_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
    fn read_struct_begin(&mut self) -> Result<TStructHeader, ProtocolError>;
    fn read_struct_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
    /// Reads the next field header. A header whose type is [`TType::Stop`]
    /// signals end-of-struct.
    fn read_field_begin(&mut self) -> Result<TFieldHeader, ProtocolError>;
    fn read_field_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
    fn read_map_begin(&mut self) -> Result<TMapHeader, ProtocolError>;
    fn read_map_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
    fn read_set_begin(&mut self) -> Result<TSetHeader, ProtocolError>;
    fn read_set_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
    fn read_list_begin(&mut self) -> Result<TListHeader, ProtocolError>;
    fn read_list_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool, ProtocolError>;
    fn read_byte(&mut self) -> Result<u8, ProtocolError>;
    fn read_double(&mut self) -> Result<f64, ProtocolError>;
    fn read_u16(&mut self) -> Result<u16, ProtocolError>;
    fn read_i16(&mut self) -> Result<i16, ProtocolError>;
    fn read_u32(&mut self) -> Result<u32, ProtocolError>;
    fn read_i32(&mut self) -> Result<i32, ProtocolError>;
    fn read_u64(&mut self) -> Result<u64, ProtocolError>;
    fn read_i64(&mut self) -> Result<i64, ProtocolError>;
    fn read_string(&mut self) -> Result<String, ProtocolError>;
    fn read_binary(&mut self) -> Result<Bytes, ProtocolError>;

    /// Consumes and discards one value of the given wire type, descending
    /// into containers and structs (a struct terminates at its first Stop
    /// field). Unknown fields on decode are not errors: they are skipped
    /// through here.
    fn skip(&mut self, v: TType) -> Result<(), ProtocolError> {
        match v {
            TType::Bool => self.read_bool().map(drop),
            TType::Byte => self.read_byte().map(drop),
            TType::Double => self.read_double().map(drop),
            TType::U16 => self.read_u16().map(drop),
            TType::I16 => self.read_i16().map(drop),
            TType::U32 => self.read_u32().map(drop),
            TType::I32 => self.read_i32().map(drop),
            TType::U64 => self.read_u64().map(drop),
            TType::I64 => self.read_i64().map(drop),
            TType::String => self.read_binary().map(drop),
            TType::Struct => {
                let _ = self.read_struct_begin()?;
                loop {
                    let h = self.read_field_begin()?;
                    if h.field_type == TType::Stop {
                        break;
                    }
                    self.skip(h.field_type)?;
                    self.read_field_end()?;
                }
                self.read_struct_end()
            }
            TType::Map => {
                let h = self.read_map_begin()?;
                for _ in 0..h.size {
                    self.skip(h.key)?;
                    self.skip(h.value)?;
                }
                self.read_map_end()
            }
            TType::Set => {
                let h = self.read_set_begin()?;
                for _ in 0..h.size {
                    self.skip(h.element)?;
                }
                self.read_set_end()
            }
            TType::List => {
                let h = self.read_list_begin()?;
                for _ in 0..h.size {
                    self.skip(h.element)?;
                }
                self.read_list_end()
            }
            TType::Stop | TType::Void => Err(ProtocolError::new(
                ProtocolErrorKind::InvalidData,
                format!("cannot skip a value of type {v}"),
            )),
        }
    }

    /// Flushes the underlying transport.
    async fn flush(&mut self) -> Result<(), ProtocolError>;
}

/// Mints protocols over a transport, for clients that manage connections.
pub trait ProtocolFactory: Send + Sync {
    /// The protocol type produced over a given transport
    type Output<T: Transport + 'static>: Protocol;

    /// Wraps `transport` in a fresh protocol.
    fn protocol<T: Transport + 'static>(&self, transport: T) -> Self::Output<T>;
}
