//! Compact wire protocol (varint/zig-zag, field-identity deltas, packed booleans)
// (c) 2025 Ross Younger

use async_trait::async_trait;
use bytes::Bytes;
use int_enum::IntEnum;

use crate::config::{Configuration, ConfigurationSetter};
use crate::error::{ProtocolError, ProtocolErrorKind};
use crate::protocol::{Protocol, ProtocolFactory};
use crate::transport::Transport;
use crate::types::{
    TFieldHeader, TListHeader, TMapHeader, TMessageHeader, TMessageType, TSetHeader,
    TStructHeader, TType,
};

/// Leading byte of every compact message header
const PROTOCOL_ID: u8 = 0x82;
/// Protocol version, carried in the low five bits of the second header byte
const VERSION: u8 = 1;
/// Mask isolating the version bits
const VERSION_MASK: u8 = 0x1f;
/// Message type occupies the top three bits of the second header byte
const TYPE_SHIFT: u8 = 5;
/// Short-form list/set headers pack sizes below this into the high nibble
const MAX_SHORT_SIZE: usize = 15;

/// On-wire type tags of the compact protocol. These are *not* the
/// [`TType`] tags; translation happens on every field and container
/// header. Booleans have two tags so that a boolean field's value can
/// ride along in its field header.
#[derive(Clone, Copy, Debug, Eq, IntEnum, PartialEq)]
#[repr(u8)]
enum CompactType {
    Stop = 0,
    BooleanTrue = 1,
    BooleanFalse = 2,
    Byte = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    Double = 7,
    Binary = 8,
    List = 9,
    Set = 10,
    Map = 11,
    Struct = 12,
}

fn to_compact(t: TType) -> Result<CompactType, ProtocolError> {
    Ok(match t {
        TType::Stop => CompactType::Stop,
        TType::Bool => CompactType::BooleanTrue,
        TType::Byte => CompactType::Byte,
        TType::Double => CompactType::Double,
        TType::U16 | TType::I16 => CompactType::I16,
        TType::U32 | TType::I32 => CompactType::I32,
        TType::U64 | TType::I64 => CompactType::I64,
        TType::String => CompactType::Binary,
        TType::Struct => CompactType::Struct,
        TType::Map => CompactType::Map,
        TType::Set => CompactType::Set,
        TType::List => CompactType::List,
        TType::Void => {
            return Err(ProtocolError::new(
                ProtocolErrorKind::InvalidData,
                format!("type {t} has no compact representation"),
            ));
        }
    })
}

fn from_compact(byte: u8) -> Result<TType, ProtocolError> {
    let ct = CompactType::try_from(byte).map_err(|_| {
        ProtocolError::new(
            ProtocolErrorKind::InvalidData,
            format!("invalid compact type: {byte}"),
        )
    })?;
    Ok(match ct {
        CompactType::Stop => TType::Stop,
        CompactType::BooleanTrue | CompactType::BooleanFalse => TType::Bool,
        CompactType::Byte => TType::Byte,
        CompactType::I16 => TType::I16,
        CompactType::I32 => TType::I32,
        CompactType::I64 => TType::I64,
        CompactType::Double => TType::Double,
        CompactType::Binary => TType::String,
        CompactType::List => TType::List,
        CompactType::Set => TType::Set,
        CompactType::Map => TType::Map,
        CompactType::Struct => TType::Struct,
    })
}

// Casts here are bit-pattern manipulation, not quantities.
#[allow(clippy::cast_sign_loss)]
const fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

#[allow(clippy::cast_possible_wrap)]
const fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// The Thrift compact protocol.
///
/// Integers travel as varints (zig-zag for the signed widths), field
/// headers delta-encode their identities against the previous field in
/// the same struct, and boolean fields pack their value into the header's
/// type nibble. Both the read and the write half carry state (an identity
/// stack and a boolean latch), so an instance must not be shared without
/// external serialization.
#[derive(Debug)]
pub struct CompactProtocol<T: Transport> {
    transport: T,
    cfg: Configuration,
    // write half
    last_write_identity: i16,
    write_identity_stack: Vec<i16>,
    pending_bool_field: Option<TFieldHeader>,
    // read half
    last_read_identity: i16,
    read_identity_stack: Vec<i16>,
    pending_bool_value: Option<bool>,
}

impl<T: Transport> CompactProtocol<T> {
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
        Self {
            transport,
            cfg,
            last_write_identity: 0,
            write_identity_stack: Vec::new(),
            pending_bool_field: None,
            last_read_identity: 0,
            read_identity_stack: Vec::new(),
            pending_bool_value: None,
        }
    }

    /// Consumes the protocol, returning the transport within.
    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn write_varint(&mut self, mut v: u64) -> Result<(), ProtocolError> {
        loop {
            if v < 0x80 {
                #[allow(clippy::cast_possible_truncation)] // < 0x80
                return Ok(self.transport.write_u8(v as u8)?);
            }
            #[allow(clippy::cast_possible_truncation)] // masked
            self.transport.write_u8((v as u8) | 0x80)?;
            v >>= 7;
        }
    }

    fn read_varint(&mut self) -> Result<u64, ProtocolError> {
        let mut v = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.transport.read_u8()?;
            v |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(v);
            }
            shift += 7;
            if shift >= 64 {
                return Err(ProtocolError::new(
                    ProtocolErrorKind::InvalidData,
                    "varint too long",
                ));
            }
        }
    }

    fn write_zigzag(&mut self, v: i64) -> Result<(), ProtocolError> {
        self.write_varint(zigzag_encode(v))
    }

    fn read_zigzag(&mut self) -> Result<i64, ProtocolError> {
        Ok(zigzag_decode(self.read_varint()?))
    }

    fn write_size(&mut self, v: usize) -> Result<(), ProtocolError> {
        self.write_varint(v as u64)
    }

    fn read_size(&mut self) -> Result<usize, ProtocolError> {
        let v = self.read_varint()?;
        let v = i64::try_from(v).map_err(|_| {
            ProtocolError::new(ProtocolErrorKind::SizeLimit, format!("absurd size: {v}"))
        })?;
        self.cfg.check_size(v)
    }

    /// Emits a field header: delta-packed when the identity is within 15
    /// of the previous one, full zig-zag identity otherwise.
    fn write_field_header(&mut self, ct: CompactType, identity: i16) -> Result<(), ProtocolError> {
        let delta = i32::from(identity) - i32::from(self.last_write_identity);
        if delta > 0 && delta <= 15 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // (0, 15]
            self.transport
                .write_u8(((delta as u8) << 4) | u8::from(ct))?;
        } else {
            self.transport.write_u8(u8::from(ct))?;
            self.write_zigzag(i64::from(identity))?;
        }
        self.last_write_identity = identity;
        Ok(())
    }

    fn read_sized_bytes(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let n = self.read_size()?;
        let mut buf = vec![0u8; n];
        self.transport.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl<T: Transport> ConfigurationSetter for CompactProtocol<T> {
    fn set_configuration(&mut self, cfg: &Configuration) {
        self.cfg = *cfg;
        self.transport.set_configuration(cfg);
    }
}

#[async_trait]
impl<T: Transport> Protocol for CompactProtocol<T> {
    fn write_message_begin(&mut self, h: &TMessageHeader) -> Result<(), ProtocolError> {
        self.transport.write_u8(PROTOCOL_ID)?;
        self.transport
            .write_u8(VERSION | (u8::from(h.message_type) << TYPE_SHIFT))?;
        self.write_zigzag(i64::from(h.identity))?;
        self.write_string(&h.name)
    }

    fn write_struct_begin(&mut self, _h: &TStructHeader) -> Result<(), ProtocolError> {
        self.write_identity_stack.push(self.last_write_identity);
        self.last_write_identity = 0;
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<(), ProtocolError> {
        self.last_write_identity = self.write_identity_stack.pop().ok_or_else(|| {
            ProtocolError::new(
                ProtocolErrorKind::InvalidData,
                "struct end without matching struct begin",
            )
        })?;
        Ok(())
    }

    fn write_field_begin(&mut self, h: &TFieldHeader) -> Result<(), ProtocolError> {
        if h.field_type == TType::Bool {
            // Deferred: the header byte wants the value's tag.
            self.pending_bool_field = Some(h.clone());
            return Ok(());
        }
        let ct = to_compact(h.field_type)?;
        self.write_field_header(ct, h.identity)
    }

    fn write_field_stop(&mut self) -> Result<(), ProtocolError> {
        Ok(self.transport.write_u8(u8::from(CompactType::Stop))?)
    }

    fn write_map_begin(&mut self, h: &TMapHeader) -> Result<(), ProtocolError> {
        self.write_size(h.size)?;
        if h.size > 0 {
            let key = u8::from(to_compact(h.key)?);
            let value = u8::from(to_compact(h.value)?);
            self.transport.write_u8((key << 4) | value)?;
        }
        Ok(())
    }

    fn write_set_begin(&mut self, h: &TSetHeader) -> Result<(), ProtocolError> {
        let element = u8::from(to_compact(h.element)?);
        if h.size < MAX_SHORT_SIZE {
            #[allow(clippy::cast_possible_truncation)] // < 15
            return Ok(self.transport.write_u8(((h.size as u8) << 4) | element)?);
        }
        self.transport.write_u8(0xf0 | element)?;
        self.write_size(h.size)
    }

    fn write_list_begin(&mut self, h: &TListHeader) -> Result<(), ProtocolError> {
        self.write_set_begin(&TSetHeader {
            element: h.element,
            size: h.size,
        })
    }

    fn write_bool(&mut self, v: bool) -> Result<(), ProtocolError> {
        let tag = if v {
            CompactType::BooleanTrue
        } else {
            CompactType::BooleanFalse
        };
        match self.pending_bool_field.take() {
            Some(h) => self.write_field_header(tag, h.identity),
            None => Ok(self.transport.write_u8(u8::from(tag))?),
        }
    }

    fn write_byte(&mut self, v: u8) -> Result<(), ProtocolError> {
        Ok(self.transport.write_u8(v)?)
    }

    fn write_double(&mut self, v: f64) -> Result<(), ProtocolError> {
        Ok(self.transport.write_all(&v.to_bits().to_le_bytes())?)
    }

    fn write_u16(&mut self, v: u16) -> Result<(), ProtocolError> {
        self.write_varint(u64::from(v))
    }

    fn write_i16(&mut self, v: i16) -> Result<(), ProtocolError> {
        self.write_zigzag(i64::from(v))
    }

    fn write_u32(&mut self, v: u32) -> Result<(), ProtocolError> {
        self.write_varint(u64::from(v))
    }

    fn write_i32(&mut self, v: i32) -> Result<(), ProtocolError> {
        self.write_zigzag(i64::from(v))
    }

    fn write_u64(&mut self, v: u64) -> Result<(), ProtocolError> {
        self.write_varint(v)
    }

    fn write_i64(&mut self, v: i64) -> Result<(), ProtocolError> {
        self.write_zigzag(v)
    }

    fn write_string(&mut self, v: &str) -> Result<(), ProtocolError> {
        self.write_binary(v.as_bytes())
    }

    fn write_binary(&mut self, v: &[u8]) -> Result<(), ProtocolError> {
        self.write_size(v.len())?;
        Ok(self.transport.write_all(v)?)
    }

    fn read_message_begin(&mut self) -> Result<TMessageHeader, ProtocolError> {
        let id = self.transport.read_u8()?;
        if id != PROTOCOL_ID {
            return Err(ProtocolError::new(
                ProtocolErrorKind::BadVersion,
                format!("bad protocol id: {id:#04x}"),
            ));
        }
        let byte = self.transport.read_u8()?;
        if byte & VERSION_MASK != VERSION {
            return Err(ProtocolError::new(
                ProtocolErrorKind::BadVersion,
                format!("bad version in message header: {}", byte & VERSION_MASK),
            ));
        }
        let raw_type = byte >> TYPE_SHIFT;
        let message_type = TMessageType::try_from(raw_type).map_err(|_| {
            ProtocolError::new(
                ProtocolErrorKind::InvalidData,
                format!("invalid message type: {raw_type}"),
            )
        })?;
        let identity = i32::try_from(self.read_zigzag()?).map_err(|_| {
            ProtocolError::new(ProtocolErrorKind::InvalidData, "message identity overflow")
        })?;
        let name = self.read_string()?;
        Ok(TMessageHeader {
            name,
            message_type,
            identity,
        })
    }

    fn read_struct_begin(&mut self) -> Result<TStructHeader, ProtocolError> {
        self.read_identity_stack.push(self.last_read_identity);
        self.last_read_identity = 0;
        Ok(TStructHeader::default())
    }

    fn read_struct_end(&mut self) -> Result<(), ProtocolError> {
        self.last_read_identity = self.read_identity_stack.pop().ok_or_else(|| {
            ProtocolError::new(
                ProtocolErrorKind::InvalidData,
                "struct end without matching struct begin",
            )
        })?;
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<TFieldHeader, ProtocolError> {
        let byte = self.transport.read_u8()?;
        let type_nibble = byte & 0x0f;
        if type_nibble == u8::from(CompactType::Stop) {
            return Ok(TFieldHeader {
                name: String::new(),
                field_type: TType::Stop,
                identity: 0,
            });
        }
        let delta = i16::from(byte >> 4);
        let identity = if delta == 0 {
            i16::try_from(self.read_zigzag()?).map_err(|_| {
                ProtocolError::new(ProtocolErrorKind::InvalidData, "field identity overflow")
            })?
        } else {
            self.last_read_identity.wrapping_add(delta)
        };
        self.last_read_identity = identity;
        if type_nibble == u8::from(CompactType::BooleanTrue)
            || type_nibble == u8::from(CompactType::BooleanFalse)
        {
            self.pending_bool_value = Some(type_nibble == u8::from(CompactType::BooleanTrue));
        }
        Ok(TFieldHeader {
            name: String::new(),
            field_type: from_compact(type_nibble)?,
            identity,
        })
    }

    fn read_map_begin(&mut self) -> Result<TMapHeader, ProtocolError> {
        let size = self.read_size()?;
        let (key, value) = if size == 0 {
            (TType::Stop, TType::Stop)
        } else {
            let byte = self.transport.read_u8()?;
            (from_compact(byte >> 4)?, from_compact(byte & 0x0f)?)
        };
        Ok(TMapHeader { key, value, size })
    }

    fn read_set_begin(&mut self) -> Result<TSetHeader, ProtocolError> {
        let byte = self.transport.read_u8()?;
        let element = from_compact(byte & 0x0f)?;
        let short = usize::from(byte >> 4);
        let size = if short == MAX_SHORT_SIZE {
            self.read_size()?
        } else {
            short
        };
        Ok(TSetHeader { element, size })
    }

    fn read_list_begin(&mut self) -> Result<TListHeader, ProtocolError> {
        let h = self.read_set_begin()?;
        Ok(TListHeader {
            element: h.element,
            size: h.size,
        })
    }

    fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        if let Some(v) = self.pending_bool_value.take() {
            return Ok(v);
        }
        Ok(self.transport.read_u8()? == u8::from(CompactType::BooleanTrue))
    }

    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.transport.read_u8()?)
    }

    fn read_double(&mut self) -> Result<f64, ProtocolError> {
        let mut buf = [0u8; 8];
        self.transport.read_exact(&mut buf)?;
        Ok(f64::from_bits(u64::from_le_bytes(buf)))
    }

    fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        u16::try_from(self.read_varint()?)
            .map_err(|_| ProtocolError::new(ProtocolErrorKind::InvalidData, "u16 overflow"))
    }

    fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        i16::try_from(self.read_zigzag()?)
            .map_err(|_| ProtocolError::new(ProtocolErrorKind::InvalidData, "i16 overflow"))
    }

    fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        u32::try_from(self.read_varint()?)
            .map_err(|_| ProtocolError::new(ProtocolErrorKind::InvalidData, "u32 overflow"))
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        i32::try_from(self.read_zigzag()?)
            .map_err(|_| ProtocolError::new(ProtocolErrorKind::InvalidData, "i32 overflow"))
    }

    fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        self.read_varint()
    }

    fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        self.read_zigzag()
    }

    fn read_string(&mut self) -> Result<String, ProtocolError> {
        let buf = self.read_sized_bytes()?;
        String::from_utf8(buf).map_err(|e| {
            ProtocolError::new(ProtocolErrorKind::InvalidData, format!("invalid UTF-8: {e}"))
        })
    }

    fn read_binary(&mut self) -> Result<Bytes, ProtocolError> {
        Ok(Bytes::from(self.read_sized_bytes()?))
    }

    async fn flush(&mut self) -> Result<(), ProtocolError> {
        Ok(self.transport.flush().await?)
    }
}

/// Mints [`CompactProtocol`]s with a shared configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompactProtocolFactory {
    cfg: Option<Configuration>,
}

impl CompactProtocolFactory {
    /// Creates a factory. `None` substitutes the default configuration.
    #[must_use]
    pub fn new(cfg: Option<Configuration>) -> Self {
        Self { cfg }
    }
}

impl ProtocolFactory for CompactProtocolFactory {
    type Output<T: Transport + 'static> = CompactProtocol<T>;

    fn protocol<T: Transport + 'static>(&self, transport: T) -> CompactProtocol<T> {
        CompactProtocol::with_configuration(transport, self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::{CompactProtocol, Protocol, zigzag_decode, zigzag_encode};
    use crate::error::ProtocolErrorKind;
    use crate::transport::MemoryBuffer;
    use crate::types::{
        TFieldHeader, TListHeader, TMessageHeader, TMessageType, TStructHeader, TType,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn proto() -> CompactProtocol<MemoryBuffer> {
        CompactProtocol::new(MemoryBuffer::default())
    }

    #[rstest]
    #[case(0, 0)]
    #[case(-1, 1)]
    #[case(1, 2)]
    #[case(-2, 3)]
    #[case(i64::MAX, u64::MAX - 1)]
    #[case(i64::MIN, u64::MAX)]
    fn zigzag(#[case] signed: i64, #[case] unsigned: u64) {
        assert_eq!(zigzag_encode(signed), unsigned);
        assert_eq!(zigzag_decode(unsigned), signed);
    }

    #[test]
    fn i32_minus_one_is_a_single_byte() {
        let mut p = proto();
        p.write_i32(-1).unwrap();
        assert_eq!(p.into_transport().as_slice(), &[0x01]);

        let mut p = proto();
        p.write_i32(-1).unwrap();
        assert_eq!(p.read_i32().unwrap(), -1);
    }

    #[test]
    fn small_identity_deltas_pack_into_one_byte() {
        let mut p = proto();
        p.write_struct_begin(&TStructHeader::default()).unwrap();
        for identity in [1i16, 2, 17, 32] {
            // pairwise deltas 1, 1, 15, 15
            p.write_field_begin(&TFieldHeader {
                name: String::new(),
                field_type: TType::I64,
                identity,
            })
            .unwrap();
            p.write_i64(0).unwrap(); // one byte each
            p.write_field_end().unwrap();
        }
        p.write_field_stop().unwrap();
        p.write_struct_end().unwrap();
        // 4 × (header byte + value byte) + stop byte
        assert_eq!(p.into_transport().len(), 9);
    }

    #[test]
    fn wide_identity_deltas_spill_to_varints() {
        let mut p = proto();
        p.write_struct_begin(&TStructHeader::default()).unwrap();
        p.write_field_begin(&TFieldHeader {
            name: String::new(),
            field_type: TType::I32,
            identity: 100,
        })
        .unwrap();
        p.write_i32(5).unwrap();
        p.write_field_end().unwrap();
        p.write_field_stop().unwrap();
        p.write_struct_end().unwrap();

        let h = {
            let _ = p.read_struct_begin().unwrap();
            p.read_field_begin().unwrap()
        };
        assert_eq!(h.identity, 100);
        assert_eq!(h.field_type, TType::I32);
        assert_eq!(p.read_i32().unwrap(), 5);
    }

    #[test]
    fn boolean_fields_pack_into_the_header() {
        let mut p = proto();
        p.write_struct_begin(&TStructHeader::default()).unwrap();
        for (identity, value) in [(1i16, true), (2, false)] {
            p.write_field_begin(&TFieldHeader {
                name: String::new(),
                field_type: TType::Bool,
                identity,
            })
            .unwrap();
            p.write_bool(value).unwrap();
            p.write_field_end().unwrap();
        }
        p.write_field_stop().unwrap();
        p.write_struct_end().unwrap();
        // one byte per field + stop: the values ride in the headers
        assert_eq!(p.transport_len(), 3);

        let _ = p.read_struct_begin().unwrap();
        let h = p.read_field_begin().unwrap();
        assert_eq!((h.identity, h.field_type), (1, TType::Bool));
        assert!(p.read_bool().unwrap());
        p.read_field_end().unwrap();
        let h = p.read_field_begin().unwrap();
        assert_eq!((h.identity, h.field_type), (2, TType::Bool));
        assert!(!p.read_bool().unwrap());
        p.read_field_end().unwrap();
        assert_eq!(p.read_field_begin().unwrap().field_type, TType::Stop);
        p.read_struct_end().unwrap();
    }

    #[test]
    fn standalone_booleans_are_one_byte() {
        let mut p = proto();
        p.write_bool(true).unwrap();
        p.write_bool(false).unwrap();
        assert_eq!(p.transport_len(), 2);
        assert!(p.read_bool().unwrap());
        assert!(!p.read_bool().unwrap());
    }

    #[test]
    fn nested_structs_restore_the_identity_baseline() {
        let mut p = proto();
        p.write_struct_begin(&TStructHeader::default()).unwrap();
        p.write_field_begin(&TFieldHeader {
            name: String::new(),
            field_type: TType::I32,
            identity: 5,
        })
        .unwrap();
        p.write_i32(1).unwrap();
        p.write_field_end().unwrap();
        // nested struct restarts the delta baseline
        p.write_field_begin(&TFieldHeader {
            name: String::new(),
            field_type: TType::Struct,
            identity: 6,
        })
        .unwrap();
        p.write_struct_begin(&TStructHeader::default()).unwrap();
        p.write_field_begin(&TFieldHeader {
            name: String::new(),
            field_type: TType::I32,
            identity: 1,
        })
        .unwrap();
        p.write_i32(2).unwrap();
        p.write_field_end().unwrap();
        p.write_field_stop().unwrap();
        p.write_struct_end().unwrap();
        p.write_field_end().unwrap();
        // after the nested struct, deltas continue from 6
        p.write_field_begin(&TFieldHeader {
            name: String::new(),
            field_type: TType::I32,
            identity: 7,
        })
        .unwrap();
        p.write_i32(3).unwrap();
        p.write_field_end().unwrap();
        p.write_field_stop().unwrap();
        p.write_struct_end().unwrap();

        let _ = p.read_struct_begin().unwrap();
        assert_eq!(p.read_field_begin().unwrap().identity, 5);
        assert_eq!(p.read_i32().unwrap(), 1);
        p.read_field_end().unwrap();
        assert_eq!(p.read_field_begin().unwrap().identity, 6);
        let _ = p.read_struct_begin().unwrap();
        assert_eq!(p.read_field_begin().unwrap().identity, 1);
        assert_eq!(p.read_i32().unwrap(), 2);
        p.read_field_end().unwrap();
        assert_eq!(p.read_field_begin().unwrap().field_type, TType::Stop);
        p.read_struct_end().unwrap();
        p.read_field_end().unwrap();
        assert_eq!(p.read_field_begin().unwrap().identity, 7);
        assert_eq!(p.read_i32().unwrap(), 3);
    }

    #[test]
    fn unbalanced_struct_end_is_an_error() {
        let mut p = proto();
        let e = p.write_struct_end().unwrap_err();
        assert_eq!(e.kind(), ProtocolErrorKind::InvalidData);
    }

    #[test]
    fn message_header_round_trip() {
        let mut p = proto();
        let h = TMessageHeader {
            name: "greet".into(),
            message_type: TMessageType::Call,
            identity: 42,
        };
        p.write_message_begin(&h).unwrap();
        p.write_message_end().unwrap();
        assert_eq!(p.read_message_begin().unwrap(), h);
    }

    #[test]
    fn bad_protocol_id_is_rejected() {
        let mut p = proto();
        p.write_byte(0x80).unwrap();
        p.write_byte(0x21).unwrap();
        let e = p.read_message_begin().unwrap_err();
        assert_eq!(e.kind(), ProtocolErrorKind::BadVersion);
    }

    #[test]
    fn bad_version_is_rejected() {
        let mut p = proto();
        p.write_byte(0x82).unwrap();
        p.write_byte(0x02).unwrap(); // version 2, type 0
        let e = p.read_message_begin().unwrap_err();
        assert_eq!(e.kind(), ProtocolErrorKind::BadVersion);
    }

    #[test]
    fn short_list_header_is_one_byte() {
        let mut p = proto();
        p.write_list_begin(&TListHeader {
            element: TType::I32,
            size: 3,
        })
        .unwrap();
        assert_eq!(p.transport_len(), 1);
        let h = p.read_list_begin().unwrap();
        assert_eq!((h.element, h.size), (TType::I32, 3));
    }

    #[test]
    fn long_list_header_spills_to_a_varint() {
        let mut p = proto();
        p.write_list_begin(&TListHeader {
            element: TType::String,
            size: 100,
        })
        .unwrap();
        let h = p.read_list_begin().unwrap();
        assert_eq!((h.element, h.size), (TType::String, 100));
    }

    #[test]
    fn unknown_compact_type_is_invalid_data() {
        let mut p = proto();
        p.write_byte(0x1d).unwrap(); // delta 1, type nibble 13: unassigned
        let e = p.read_field_begin().unwrap_err();
        assert_eq!(e.kind(), ProtocolErrorKind::InvalidData);
    }

    #[test]
    fn doubles_are_little_endian() {
        let mut p = proto();
        p.write_double(1.0).unwrap();
        assert_eq!(
            p.transport_slice(),
            &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf0, 0x3f]
        );
        assert_eq!(p.read_double().unwrap().to_bits(), 1.0f64.to_bits());
    }

    #[test]
    fn unsigned_scalars_round_trip() {
        let mut p = proto();
        p.write_u16(65535).unwrap();
        p.write_u32(255).unwrap();
        p.write_u64(u64::MAX).unwrap();
        assert_eq!(p.read_u16().unwrap(), 65535);
        assert_eq!(p.read_u32().unwrap(), 255);
        assert_eq!(p.read_u64().unwrap(), u64::MAX);
    }

    impl CompactProtocol<MemoryBuffer> {
        fn transport_len(&self) -> usize {
            self.transport.len()
        }
        fn transport_slice(&self) -> &[u8] {
            self.transport.as_slice()
        }
    }
}
