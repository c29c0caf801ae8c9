//! Memoized encoder registry and the scalar/container encoders
// (c) 2025 Ross Younger

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, OnceLock, RwLock};

use crate::codec::structs::StructEncoder;
use crate::codec::value::{TypeDescriptor, Value};
use crate::codec::CodecError;
use crate::error::Error;
use crate::protocol::Protocol;
use crate::types::{TListHeader, TMapHeader, TSetHeader, TType};

/// Writes values of one type to a protocol and reads them back.
///
/// Encoders are stateless after construction and freely shared; composite
/// encoders share their leaf encoders through the registry.
pub trait InternalEncoder: Debug + Send + Sync {
    /// Writes `v` to the protocol.
    fn encode(&self, v: &Value, p: &mut dyn Protocol) -> Result<(), Error>;
    /// Reads a value from the protocol into `v`, replacing its contents.
    fn decode(&self, v: &mut Value, p: &mut dyn Protocol) -> Result<(), Error>;
    /// The wire type this encoder produces.
    fn kind(&self) -> TType;
}

static REGISTRY: OnceLock<RwLock<HashMap<TypeDescriptor, Arc<dyn InternalEncoder>>>> =
    OnceLock::new();

fn registry() -> &'static RwLock<HashMap<TypeDescriptor, Arc<dyn InternalEncoder>>> {
    REGISTRY.get_or_init(RwLock::default)
}

/// Looks up (or constructs and memoizes) the encoder for a type shape.
///
/// The registry is process-wide and thread-safe. A lookup-then-insert
/// race may construct an encoder twice, but only the first insert is
/// kept, so all callers observe a single instance once the dust settles.
pub fn encoder_of(d: &TypeDescriptor) -> Result<Arc<dyn InternalEncoder>, CodecError> {
    if let Some(e) = registry().read().expect("codec registry poisoned").get(d) {
        return Ok(Arc::clone(e));
    }
    // Not held across construction: building a struct encoder recurses here.
    let built = build(d)?;
    let mut map = registry().write().expect("codec registry poisoned");
    Ok(Arc::clone(map.entry(d.clone()).or_insert(built)))
}

fn build(d: &TypeDescriptor) -> Result<Arc<dyn InternalEncoder>, CodecError> {
    Ok(match d {
        TypeDescriptor::Bool => Arc::new(BoolEncoder),
        TypeDescriptor::Byte => Arc::new(ByteEncoder),
        TypeDescriptor::I8 => Arc::new(I8Encoder),
        TypeDescriptor::Double => Arc::new(DoubleEncoder),
        TypeDescriptor::U16 => Arc::new(U16Encoder),
        TypeDescriptor::I16 => Arc::new(I16Encoder),
        TypeDescriptor::U32 => Arc::new(U32Encoder),
        TypeDescriptor::I32 => Arc::new(I32Encoder),
        TypeDescriptor::U64 => Arc::new(U64Encoder),
        TypeDescriptor::I64 => Arc::new(I64Encoder),
        TypeDescriptor::String => Arc::new(StringEncoder),
        TypeDescriptor::Binary => Arc::new(BinaryEncoder),
        TypeDescriptor::List(elem) => Arc::new(SeqEncoder {
            wire: TType::List,
            element_descriptor: (**elem).clone(),
            element: encoder_of(elem)?,
        }),
        TypeDescriptor::Set(elem) => Arc::new(SeqEncoder {
            wire: TType::Set,
            element_descriptor: (**elem).clone(),
            element: encoder_of(elem)?,
        }),
        TypeDescriptor::Map(key, value) => Arc::new(MapEncoder {
            key_descriptor: (**key).clone(),
            value_descriptor: (**value).clone(),
            key: encoder_of(key)?,
            value: encoder_of(value)?,
        }),
        TypeDescriptor::Optional(inner) => Arc::new(OptionalEncoder {
            inner_descriptor: (**inner).clone(),
            inner: encoder_of(inner)?,
        }),
        TypeDescriptor::Struct(sd) => Arc::new(StructEncoder::build(Arc::clone(sd))?),
    })
}

///////////////////////////////////////////////////////////////////////////
// SCALARS

macro_rules! scalar_encoder {
    ($name:ident, $variant:ident, $kind:expr, $write:ident, $read:ident) => {
        #[derive(Debug)]
        struct $name;
        impl InternalEncoder for $name {
            fn encode(&self, v: &Value, p: &mut dyn Protocol) -> Result<(), Error> {
                match v {
                    Value::$variant(x) => Ok(p.$write(*x)?),
                    other => Err(CodecError::mismatch(stringify!($variant), other).into()),
                }
            }
            fn decode(&self, v: &mut Value, p: &mut dyn Protocol) -> Result<(), Error> {
                *v = Value::$variant(p.$read()?);
                Ok(())
            }
            fn kind(&self) -> TType {
                $kind
            }
        }
    };
}

scalar_encoder!(BoolEncoder, Bool, TType::Bool, write_bool, read_bool);
scalar_encoder!(ByteEncoder, Byte, TType::Byte, write_byte, read_byte);
scalar_encoder!(DoubleEncoder, Double, TType::Double, write_double, read_double);
scalar_encoder!(U16Encoder, U16, TType::I16, write_u16, read_u16);
scalar_encoder!(I16Encoder, I16, TType::I16, write_i16, read_i16);
scalar_encoder!(U32Encoder, U32, TType::I32, write_u32, read_u32);
scalar_encoder!(I32Encoder, I32, TType::I32, write_i32, read_i32);
scalar_encoder!(U64Encoder, U64, TType::I64, write_u64, read_u64);
scalar_encoder!(I64Encoder, I64, TType::I64, write_i64, read_i64);

/// A signed octet travels as BYTE; the bit pattern is preserved.
#[derive(Debug)]
struct I8Encoder;
#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)] // bit pattern, not a quantity
impl InternalEncoder for I8Encoder {
    fn encode(&self, v: &Value, p: &mut dyn Protocol) -> Result<(), Error> {
        match v {
            Value::I8(x) => Ok(p.write_byte(*x as u8)?),
            other => Err(CodecError::mismatch("I8", other).into()),
        }
    }
    fn decode(&self, v: &mut Value, p: &mut dyn Protocol) -> Result<(), Error> {
        *v = Value::I8(p.read_byte()? as i8);
        Ok(())
    }
    fn kind(&self) -> TType {
        TType::Byte
    }
}

#[derive(Debug)]
struct StringEncoder;
impl InternalEncoder for StringEncoder {
    fn encode(&self, v: &Value, p: &mut dyn Protocol) -> Result<(), Error> {
        match v {
            Value::String(x) => Ok(p.write_string(x)?),
            other => Err(CodecError::mismatch("String", other).into()),
        }
    }
    fn decode(&self, v: &mut Value, p: &mut dyn Protocol) -> Result<(), Error> {
        *v = Value::String(p.read_string()?);
        Ok(())
    }
    fn kind(&self) -> TType {
        TType::String
    }
}

#[derive(Debug)]
struct BinaryEncoder;
impl InternalEncoder for BinaryEncoder {
    fn encode(&self, v: &Value, p: &mut dyn Protocol) -> Result<(), Error> {
        match v {
            Value::Binary(x) => Ok(p.write_binary(x)?),
            other => Err(CodecError::mismatch("Binary", other).into()),
        }
    }
    fn decode(&self, v: &mut Value, p: &mut dyn Protocol) -> Result<(), Error> {
        *v = Value::Binary(p.read_binary()?);
        Ok(())
    }
    fn kind(&self) -> TType {
        TType::String
    }
}

///////////////////////////////////////////////////////////////////////////
// CONTAINERS

/// LIST and SET share an implementation; only the header operations and
/// the produced [`Value`] variant differ.
#[derive(Debug)]
struct SeqEncoder {
    wire: TType,
    element_descriptor: TypeDescriptor,
    element: Arc<dyn InternalEncoder>,
}

impl InternalEncoder for SeqEncoder {
    fn encode(&self, v: &Value, p: &mut dyn Protocol) -> Result<(), Error> {
        let items = v
            .as_seq()
            .ok_or_else(|| CodecError::mismatch("sequence", v))?;
        let element = self.element.kind();
        if self.wire == TType::Set {
            p.write_set_begin(&TSetHeader {
                element,
                size: items.len(),
            })?;
        } else {
            p.write_list_begin(&TListHeader {
                element,
                size: items.len(),
            })?;
        }
        for item in items {
            self.element.encode(item, p)?;
        }
        if self.wire == TType::Set {
            p.write_set_end()?;
        } else {
            p.write_list_end()?;
        }
        Ok(())
    }

    fn decode(&self, v: &mut Value, p: &mut dyn Protocol) -> Result<(), Error> {
        let (element, size) = if self.wire == TType::Set {
            let h = p.read_set_begin()?;
            (h.element, h.size)
        } else {
            let h = p.read_list_begin()?;
            (h.element, h.size)
        };
        if element == self.element.kind() {
            let mut items = Vec::with_capacity(size);
            for _ in 0..size {
                let mut item = Value::default_of(&self.element_descriptor);
                self.element.decode(&mut item, p)?;
                items.push(item);
            }
            *v = if self.wire == TType::Set {
                Value::Set(items)
            } else {
                Value::List(items)
            };
        } else {
            // element type mismatch: discard the whole container
            for _ in 0..size {
                p.skip(element)?;
            }
        }
        if self.wire == TType::Set {
            p.read_set_end()?;
        } else {
            p.read_list_end()?;
        }
        Ok(())
    }

    fn kind(&self) -> TType {
        self.wire
    }
}

#[derive(Debug)]
struct MapEncoder {
    key_descriptor: TypeDescriptor,
    value_descriptor: TypeDescriptor,
    key: Arc<dyn InternalEncoder>,
    value: Arc<dyn InternalEncoder>,
}

impl InternalEncoder for MapEncoder {
    fn encode(&self, v: &Value, p: &mut dyn Protocol) -> Result<(), Error> {
        let Value::Map(pairs) = v else {
            return Err(CodecError::mismatch("Map", v).into());
        };
        p.write_map_begin(&TMapHeader {
            key: self.key.kind(),
            value: self.value.kind(),
            size: pairs.len(),
        })?;
        for (k, x) in pairs {
            self.key.encode(k, p)?;
            self.value.encode(x, p)?;
        }
        p.write_map_end()?;
        Ok(())
    }

    fn decode(&self, v: &mut Value, p: &mut dyn Protocol) -> Result<(), Error> {
        let h = p.read_map_begin()?;
        if h.size > 0 && (h.key != self.key.kind() || h.value != self.value.kind()) {
            for _ in 0..h.size {
                p.skip(h.key)?;
                p.skip(h.value)?;
            }
        } else {
            let mut pairs = Vec::with_capacity(h.size);
            for _ in 0..h.size {
                let mut k = Value::default_of(&self.key_descriptor);
                self.key.decode(&mut k, p)?;
                let mut x = Value::default_of(&self.value_descriptor);
                self.value.decode(&mut x, p)?;
                pairs.push((k, x));
            }
            *v = Value::Map(pairs);
        }
        p.read_map_end()?;
        Ok(())
    }

    fn kind(&self) -> TType {
        TType::Map
    }
}

/// Transparent present-or-absent wrapper: encoding follows through to the
/// inner value (the absent case writes the inner zero value), decoding
/// always constructs a value.
#[derive(Debug)]
struct OptionalEncoder {
    inner_descriptor: TypeDescriptor,
    inner: Arc<dyn InternalEncoder>,
}

impl InternalEncoder for OptionalEncoder {
    fn encode(&self, v: &Value, p: &mut dyn Protocol) -> Result<(), Error> {
        if matches!(v, Value::Null) {
            let zero = Value::default_of(&self.inner_descriptor);
            return self.inner.encode(&zero, p);
        }
        self.inner.encode(v, p)
    }

    fn decode(&self, v: &mut Value, p: &mut dyn Protocol) -> Result<(), Error> {
        *v = Value::default_of(&self.inner_descriptor);
        self.inner.decode(v, p)
    }

    fn kind(&self) -> TType {
        self.inner.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::{TypeDescriptor, Value, encoder_of};
    use crate::codec::HostType;
    use crate::protocol::{BinaryProtocol, CompactProtocol, Protocol};
    use crate::transport::MemoryBuffer;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;

    fn round_trip(p: &mut dyn Protocol, d: &TypeDescriptor, v: &Value) {
        let e = encoder_of(d).unwrap();
        e.encode(v, p).unwrap();
        let mut out = Value::default_of(d);
        e.decode(&mut out, p).unwrap();
        assert_eq!(&out, v, "round trip of {d:?}");
    }

    fn simple_cases() -> Vec<(TypeDescriptor, Value)> {
        vec![
            (<bool as HostType>::descriptor(), Value::from(true)),
            (<bool as HostType>::descriptor(), Value::from(false)),
            (<u8 as HostType>::descriptor(), Value::from(255u8)),
            (<i8 as HostType>::descriptor(), Value::from(-128i8)),
            (<f32 as HostType>::descriptor(), Value::from(0.123f32)),
            (<f64 as HostType>::descriptor(), Value::from(0.321f64)),
            (<u16 as HostType>::descriptor(), Value::from(255u16)),
            (<i16 as HostType>::descriptor(), Value::from(-128i16)),
            (<u32 as HostType>::descriptor(), Value::from(255u32)),
            (<i32 as HostType>::descriptor(), Value::from(-128i32)),
            (<u64 as HostType>::descriptor(), Value::from(255u64)),
            (<i64 as HostType>::descriptor(), Value::from(-128i64)),
            (
                <String as HostType>::descriptor(),
                Value::from("Hello World"),
            ),
            (
                <Bytes as HostType>::descriptor(),
                Value::from(Bytes::from_static(b"Hello World")),
            ),
            (
                <Vec<String> as HostType>::descriptor(),
                Value::from(
                    ["Is", "This", "World", "Or", "Mars", "?"]
                        .map(String::from)
                        .to_vec(),
                ),
            ),
            (
                <Vec<Vec<i32>> as HostType>::descriptor(),
                Value::from(vec![vec![1i32, 2], vec![], vec![3]]),
            ),
            (
                TypeDescriptor::Map(
                    Box::new(TypeDescriptor::String),
                    Box::new(TypeDescriptor::I64),
                ),
                Value::Map(vec![
                    (Value::from("Hello"), Value::I64(1)),
                    (Value::from("Hi"), Value::I64(2)),
                ]),
            ),
            (
                <Option<i32> as HostType>::descriptor(),
                Some(17i32).into_value(),
            ),
        ]
    }

    #[rstest]
    #[case::binary(false)]
    #[case::compact(true)]
    fn basic_values_round_trip(#[case] compact: bool) {
        for (d, v) in simple_cases() {
            if compact {
                let mut p = CompactProtocol::new(MemoryBuffer::default());
                round_trip(&mut p, &d, &v);
            } else {
                let mut p = BinaryProtocol::new(MemoryBuffer::default());
                round_trip(&mut p, &d, &v);
            }
        }
    }

    #[test]
    fn null_optional_encodes_the_inner_zero() {
        let d = <Option<i32> as HostType>::descriptor();
        let e = encoder_of(&d).unwrap();
        let mut p = BinaryProtocol::new(MemoryBuffer::default());
        e.encode(&Value::Null, &mut p).unwrap();
        let mut out = Value::default_of(&d);
        e.decode(&mut out, &mut p).unwrap();
        // decode always constructs a value
        assert_eq!(out, Value::I32(0));
    }

    #[test]
    fn mismatched_value_is_an_error() {
        let e = encoder_of(&TypeDescriptor::I32).unwrap();
        let mut p = BinaryProtocol::new(MemoryBuffer::default());
        assert!(e.encode(&Value::from(true), &mut p).is_err());
    }

    #[test]
    fn mismatched_element_type_discards_the_container() {
        // writer sends list<i64>, reader expects list<i32>
        let writer = encoder_of(&<Vec<i64> as HostType>::descriptor()).unwrap();
        let reader = encoder_of(&<Vec<i32> as HostType>::descriptor()).unwrap();
        let mut p = BinaryProtocol::new(MemoryBuffer::default());
        writer
            .encode(&Value::from(vec![1i64, 2, 3]), &mut p)
            .unwrap();
        p.write_i32(7).unwrap(); // sentinel
        let mut out = Value::List(Vec::new());
        reader.decode(&mut out, &mut p).unwrap();
        assert_eq!(out, Value::List(Vec::new())); // untouched
        assert_eq!(p.read_i32().unwrap(), 7); // container fully consumed
    }

    #[test]
    fn registry_memoizes_one_encoder_per_shape() {
        let d = <Vec<String> as HostType>::descriptor();
        let a = encoder_of(&d).unwrap();
        let b = encoder_of(&d).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn registry_is_race_safe() {
        let d = TypeDescriptor::Map(
            Box::new(TypeDescriptor::I64),
            Box::new(TypeDescriptor::List(Box::new(TypeDescriptor::String))),
        );
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let d = d.clone();
                std::thread::spawn(move || encoder_of(&d).unwrap())
            })
            .collect();
        let encoders: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        // after quiescence, everyone observes the same instance
        let canonical = encoder_of(&d).unwrap();
        for e in encoders {
            assert!(Arc::ptr_eq(&e, &canonical));
        }
    }
}
