//! Binary wire protocol (fixed-width big-endian)
// (c) 2025 Ross Younger

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{Configuration, ConfigurationSetter};
use crate::error::{ProtocolError, ProtocolErrorKind};
use crate::protocol::{Protocol, ProtocolFactory};
use crate::transport::Transport;
use crate::types::{
    TFieldHeader, TListHeader, TMapHeader, TMessageHeader, TMessageType, TSetHeader,
    TStructHeader, TType,
};

/// Strict-mode version word, ORed with the message type
const VERSION_1: u32 = 0x8001_0000;
/// Mask isolating the version bits of a strict message header
const VERSION_MASK: u32 = 0xffff_0000;

/// The Thrift binary protocol.
///
/// Scalars are fixed-width big-endian; strings and containers carry 4-byte
/// length prefixes. Message headers honour the strict-read/strict-write
/// flags of the [`Configuration`]: strict mode frames the header with a
/// version word, non-strict mode leads with the name.
#[derive(Debug)]
pub struct BinaryProtocol<T: Transport> {
    transport: T,
    cfg: Configuration,
}

impl<T: Transport> BinaryProtocol<T> {
    /// Wraps a transport using the default configuration.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_configuration(transport, None)
    }

    /// Wraps a transport. `None` substitutes the default configuration.
    /// The configuration is propagated to the transport.
    #[must_use]
    pub fn with_configuration(mut transport: T, cfg: Option<Configuration>) -> Self {
        let cfg = Configuration::resolve(cfg);
        transport.set_configuration(&cfg);
        Self { transport, cfg }
    }

    /// Consumes the protocol, returning the transport within.
    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn write_size(&mut self, v: usize) -> Result<(), ProtocolError> {
        let v = i32::try_from(v).map_err(|_| {
            ProtocolError::new(
                ProtocolErrorKind::SizeLimit,
                format!("size does not fit a length prefix: {v}"),
            )
        })?;
        self.write_i32(v)
    }

    fn read_size(&mut self) -> Result<usize, ProtocolError> {
        let v = self.read_i32()?;
        self.cfg.check_size(i64::from(v))
    }

    fn read_string_body(&mut self, n: usize) -> Result<String, ProtocolError> {
        let mut buf = vec![0u8; n];
        self.transport.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| {
            ProtocolError::new(ProtocolErrorKind::InvalidData, format!("invalid UTF-8: {e}"))
        })
    }
}

impl<T: Transport> ConfigurationSetter for BinaryProtocol<T> {
    fn set_configuration(&mut self, cfg: &Configuration) {
        self.cfg = *cfg;
        self.transport.set_configuration(cfg);
    }
}

#[async_trait]
impl<T: Transport> Protocol for BinaryProtocol<T> {
    fn write_message_begin(&mut self, h: &TMessageHeader) -> Result<(), ProtocolError> {
        if self.cfg.strict_write {
            self.write_u32(VERSION_1 | u32::from(u8::from(h.message_type)))?;
            self.write_string(&h.name)?;
        } else {
            self.write_string(&h.name)?;
            self.write_byte(u8::from(h.message_type))?;
        }
        self.write_i32(h.identity)
    }

    fn write_struct_begin(&mut self, _h: &TStructHeader) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_field_begin(&mut self, h: &TFieldHeader) -> Result<(), ProtocolError> {
        self.write_byte(u8::from(h.field_type))?;
        self.write_i16(h.identity)
    }

    fn write_field_stop(&mut self) -> Result<(), ProtocolError> {
        self.write_byte(u8::from(TType::Stop))
    }

    fn write_map_begin(&mut self, h: &TMapHeader) -> Result<(), ProtocolError> {
        self.write_byte(u8::from(h.key))?;
        self.write_byte(u8::from(h.value))?;
        self.write_size(h.size)
    }

    fn write_set_begin(&mut self, h: &TSetHeader) -> Result<(), ProtocolError> {
        self.write_byte(u8::from(h.element))?;
        self.write_size(h.size)
    }

    fn write_list_begin(&mut self, h: &TListHeader) -> Result<(), ProtocolError> {
        self.write_byte(u8::from(h.element))?;
        self.write_size(h.size)
    }

    fn write_bool(&mut self, v: bool) -> Result<(), ProtocolError> {
        self.write_byte(u8::from(v))
    }

    fn write_byte(&mut self, v: u8) -> Result<(), ProtocolError> {
        Ok(self.transport.write_u8(v)?)
    }

    fn write_double(&mut self, v: f64) -> Result<(), ProtocolError> {
        self.write_u64(v.to_bits())
    }

    fn write_u16(&mut self, v: u16) -> Result<(), ProtocolError> {
        Ok(self.transport.write_all(&v.to_be_bytes())?)
    }

    fn write_i16(&mut self, v: i16) -> Result<(), ProtocolError> {
        Ok(self.transport.write_all(&v.to_be_bytes())?)
    }

    fn write_u32(&mut self, v: u32) -> Result<(), ProtocolError> {
        Ok(self.transport.write_all(&v.to_be_bytes())?)
    }

    fn write_i32(&mut self, v: i32) -> Result<(), ProtocolError> {
        Ok(self.transport.write_all(&v.to_be_bytes())?)
    }

    fn write_u64(&mut self, v: u64) -> Result<(), ProtocolError> {
        Ok(self.transport.write_all(&v.to_be_bytes())?)
    }

    fn write_i64(&mut self, v: i64) -> Result<(), ProtocolError> {
        Ok(self.transport.write_all(&v.to_be_bytes())?)
    }

    fn write_string(&mut self, v: &str) -> Result<(), ProtocolError> {
        self.write_binary(v.as_bytes())
    }

    fn write_binary(&mut self, v: &[u8]) -> Result<(), ProtocolError> {
        self.write_size(v.len())?;
        Ok(self.transport.write_all(v)?)
    }

    fn read_message_begin(&mut self) -> Result<TMessageHeader, ProtocolError> {
        let first = self.read_i32()?;
        if first < 0 {
            // Strict layout: version word, name, identity.
            #[allow(clippy::cast_sign_loss)] // bit pattern, not a quantity
            let word = first as u32;
            if word & VERSION_MASK != VERSION_1 {
                return Err(ProtocolError::new(
                    ProtocolErrorKind::BadVersion,
                    format!("bad version in message header: {word:#010x}"),
                ));
            }
            #[allow(clippy::cast_possible_truncation)] // low byte only
            let message_type = TMessageType::try_from((word & 0xff) as u8).map_err(|_| {
                ProtocolError::new(
                    ProtocolErrorKind::InvalidData,
                    format!("invalid message type: {}", word & 0xff),
                )
            })?;
            let name = self.read_string()?;
            let identity = self.read_i32()?;
            Ok(TMessageHeader {
                name,
                message_type,
                identity,
            })
        } else {
            // Old layout: name, type byte, identity.
            if self.cfg.strict_read {
                return Err(ProtocolError::new(
                    ProtocolErrorKind::BadVersion,
                    "missing version in message header",
                ));
            }
            let n = self.cfg.check_size(i64::from(first))?;
            let name = self.read_string_body(n)?;
            let byte = self.read_byte()?;
            let message_type = TMessageType::try_from(byte).map_err(|_| {
                ProtocolError::new(
                    ProtocolErrorKind::InvalidData,
                    format!("invalid message type: {byte}"),
                )
            })?;
            let identity = self.read_i32()?;
            Ok(TMessageHeader {
                name,
                message_type,
                identity,
            })
        }
    }

    fn read_struct_begin(&mut self) -> Result<TStructHeader, ProtocolError> {
        Ok(TStructHeader::default())
    }

    fn read_field_begin(&mut self) -> Result<TFieldHeader, ProtocolError> {
        let byte = self.read_byte()?;
        let field_type = TType::try_from(byte).map_err(|_| {
            ProtocolError::new(
                ProtocolErrorKind::InvalidData,
                format!("invalid field type: {byte}"),
            )
        })?;
        let identity = if field_type == TType::Stop {
            0
        } else {
            self.read_i16()?
        };
        Ok(TFieldHeader {
            name: String::new(),
            field_type,
            identity,
        })
    }

    fn read_map_begin(&mut self) -> Result<TMapHeader, ProtocolError> {
        let key = self.read_element_type()?;
        let value = self.read_element_type()?;
        let size = self.read_size()?;
        Ok(TMapHeader { key, value, size })
    }

    fn read_set_begin(&mut self) -> Result<TSetHeader, ProtocolError> {
        let element = self.read_element_type()?;
        let size = self.read_size()?;
        Ok(TSetHeader { element, size })
    }

    fn read_list_begin(&mut self) -> Result<TListHeader, ProtocolError> {
        let element = self.read_element_type()?;
        let size = self.read_size()?;
        Ok(TListHeader { element, size })
    }

    fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_byte()? != 0)
    }

    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.transport.read_u8()?)
    }

    fn read_double(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        let mut buf = [0u8; 2];
        self.transport.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        let mut buf = [0u8; 2];
        self.transport.read_exact(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let mut buf = [0u8; 4];
        self.transport.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        let mut buf = [0u8; 4];
        self.transport.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        let mut buf = [0u8; 8];
        self.transport.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        let mut buf = [0u8; 8];
        self.transport.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    fn read_string(&mut self) -> Result<String, ProtocolError> {
        let n = self.read_size()?;
        self.read_string_body(n)
    }

    fn read_binary(&mut self) -> Result<Bytes, ProtocolError> {
        let n = self.read_size()?;
        let mut buf = vec![0u8; n];
        self.transport.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    async fn flush(&mut self) -> Result<(), ProtocolError> {
        Ok(self.transport.flush().await?)
    }
}

impl<T: Transport> BinaryProtocol<T> {
    fn read_element_type(&mut self) -> Result<TType, ProtocolError> {
        let byte = self.read_byte()?;
        TType::try_from(byte).map_err(|_| {
            ProtocolError::new(
                ProtocolErrorKind::InvalidData,
                format!("invalid element type: {byte}"),
            )
        })
    }
}

/// Mints [`BinaryProtocol`]s with a shared configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryProtocolFactory {
    cfg: Option<Configuration>,
}

impl BinaryProtocolFactory {
    /// Creates a factory. `None` substitutes the default configuration.
    #[must_use]
    pub fn new(cfg: Option<Configuration>) -> Self {
        Self { cfg }
    }
}

impl ProtocolFactory for BinaryProtocolFactory {
    type Output<T: Transport + 'static> = BinaryProtocol<T>;

    fn protocol<T: Transport + 'static>(&self, transport: T) -> BinaryProtocol<T> {
        BinaryProtocol::with_configuration(transport, self.cfg)
    }
}
