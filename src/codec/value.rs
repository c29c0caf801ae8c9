//! Host value model and type descriptors
// (c) 2025 Ross Younger

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use bytes::Bytes;

use crate::codec::structs::StructDescriptor;
use crate::codec::{CodecError, SeqKind};
use crate::types::TType;

/// A value passing through the codec layer.
///
/// This is the tagged-variant bridge between typed host values and the
/// wire: every encodable host type converts in with [`From`] and back out
/// with [`TryFrom`]. Sequences are held as plain vectors whichever wire
/// container they travel in; maps preserve insertion order.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Unsigned octet
    Byte(u8),
    /// Signed octet (shares the BYTE wire type; the bit pattern travels)
    I8(i8),
    /// 64-bit float (32-bit host floats widen on the way in)
    Double(f64),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Signed 16-bit integer
    I16(i16),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Signed 32-bit integer
    I32(i32),
    /// Unsigned 64-bit integer
    U64(u64),
    /// Signed 64-bit integer
    I64(i64),
    /// UTF-8 text
    String(String),
    /// Raw bytes (STRING on the wire)
    Binary(Bytes),
    /// Sequence bound for a LIST container
    List(Vec<Value>),
    /// Sequence bound for a SET container
    Set(Vec<Value>),
    /// Key/value pairs, insertion-ordered
    Map(Vec<(Value, Value)>),
    /// A field-tagged record
    Struct(StructValue),
    /// The absent optional
    Null,
}

impl Value {
    /// A short name for diagnostics and mismatch errors
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::I8(_) => "i8",
            Value::Double(_) => "double",
            Value::U16(_) => "u16",
            Value::I16(_) => "i16",
            Value::U32(_) => "u32",
            Value::I32(_) => "i32",
            Value::U64(_) => "u64",
            Value::I64(_) => "i64",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Null => "null",
        }
    }

    /// Is this the zero value of its type?
    ///
    /// Optional struct fields holding their zero value are elided from the
    /// encoding; this is the test.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Bool(v) => !v,
            Value::Byte(v) => *v == 0,
            Value::I8(v) => *v == 0,
            Value::Double(v) => *v == 0.0,
            Value::U16(v) => *v == 0,
            Value::I16(v) => *v == 0,
            Value::U32(v) => *v == 0,
            Value::I32(v) => *v == 0,
            Value::U64(v) => *v == 0,
            Value::I64(v) => *v == 0,
            Value::String(v) => v.is_empty(),
            Value::Binary(v) => v.is_empty(),
            Value::List(v) | Value::Set(v) => v.is_empty(),
            Value::Map(v) => v.is_empty(),
            Value::Struct(v) => v.fields().iter().all(Value::is_zero),
            Value::Null => true,
        }
    }

    /// The zero value of a descriptor's type.
    #[must_use]
    pub fn default_of(d: &TypeDescriptor) -> Value {
        match d {
            TypeDescriptor::Bool => Value::Bool(false),
            TypeDescriptor::Byte => Value::Byte(0),
            TypeDescriptor::I8 => Value::I8(0),
            TypeDescriptor::Double => Value::Double(0.0),
            TypeDescriptor::U16 => Value::U16(0),
            TypeDescriptor::I16 => Value::I16(0),
            TypeDescriptor::U32 => Value::U32(0),
            TypeDescriptor::I32 => Value::I32(0),
            TypeDescriptor::U64 => Value::U64(0),
            TypeDescriptor::I64 => Value::I64(0),
            TypeDescriptor::String => Value::String(String::new()),
            TypeDescriptor::Binary => Value::Binary(Bytes::new()),
            TypeDescriptor::List(_) => Value::List(Vec::new()),
            TypeDescriptor::Set(_) => Value::Set(Vec::new()),
            TypeDescriptor::Map(..) => Value::Map(Vec::new()),
            TypeDescriptor::Optional(_) => Value::Null,
            TypeDescriptor::Struct(sd) => Value::Struct(StructValue::new(Arc::clone(sd))),
        }
    }

    /// Borrows the elements of either sequence variant.
    pub(crate) fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) | Value::Set(v) => Some(v),
            _ => None,
        }
    }
}

/// A live struct value: its descriptor plus one [`Value`] per declared
/// field, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct StructValue {
    descriptor: Arc<StructDescriptor>,
    fields: Vec<Value>,
}

impl StructValue {
    /// Creates a struct value with every field at its zero value.
    #[must_use]
    pub fn new(descriptor: Arc<StructDescriptor>) -> Self {
        let fields = descriptor
            .fields()
            .iter()
            .map(|f| Value::default_of(f.descriptor()))
            .collect();
        Self { descriptor, fields }
    }

    /// The descriptor this value was built from
    #[must_use]
    pub fn descriptor(&self) -> &Arc<StructDescriptor> {
        &self.descriptor
    }

    /// All field values, in declaration order
    #[must_use]
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Borrows one field by declaration index
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    /// Mutably borrows one field by declaration index
    pub fn field_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.fields.get_mut(index)
    }

    /// Replaces one field by declaration index
    pub fn set_field(&mut self, index: usize, v: Value) -> Result<(), CodecError> {
        let slot = self.fields.get_mut(index).ok_or_else(|| {
            CodecError::construction(format!(
                "field index {index} out of range for struct {:?}",
                self.descriptor.name()
            ))
        })?;
        *slot = v;
        Ok(())
    }

    /// Takes one field out by declaration index, leaving its zero value.
    pub fn take_field(&mut self, index: usize) -> Option<Value> {
        let d = self.descriptor.fields().get(index)?.descriptor().clone();
        let slot = self.fields.get_mut(index)?;
        Some(std::mem::replace(slot, Value::default_of(&d)))
    }
}

///////////////////////////////////////////////////////////////////////////
// TYPE DESCRIPTORS

/// Names the shape of a host type, recursively.
///
/// Descriptors are the registry key of the codec layer: structurally equal
/// descriptors share one memoized encoder.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TypeDescriptor {
    /// Boolean
    Bool,
    /// Unsigned octet
    Byte,
    /// Signed octet
    I8,
    /// Float of either width
    Double,
    /// Unsigned 16-bit integer
    U16,
    /// Signed 16-bit integer
    I16,
    /// Unsigned 32-bit integer
    U32,
    /// Signed 32-bit integer
    I32,
    /// Unsigned 64-bit (or native-width) integer
    U64,
    /// Signed 64-bit (or native-width) integer
    I64,
    /// UTF-8 text
    String,
    /// Raw byte sequence
    Binary,
    /// Sequence travelling as a LIST (the default for host sequences)
    List(Box<TypeDescriptor>),
    /// Sequence travelling as a SET
    Set(Box<TypeDescriptor>),
    /// Mapping
    Map(Box<TypeDescriptor>, Box<TypeDescriptor>),
    /// Present-or-absent wrapper
    Optional(Box<TypeDescriptor>),
    /// Field-tagged record
    Struct(Arc<StructDescriptor>),
}

impl TypeDescriptor {
    /// The wire type a value of this shape travels as.
    ///
    /// Unsigned widths share the signed wire tags (the bit pattern
    /// travels); binary shares STRING; an optional is transparent.
    #[must_use]
    pub fn wire_type(&self) -> TType {
        match self {
            TypeDescriptor::Bool => TType::Bool,
            TypeDescriptor::Byte | TypeDescriptor::I8 => TType::Byte,
            TypeDescriptor::Double => TType::Double,
            TypeDescriptor::U16 | TypeDescriptor::I16 => TType::I16,
            TypeDescriptor::U32 | TypeDescriptor::I32 => TType::I32,
            TypeDescriptor::U64 | TypeDescriptor::I64 => TType::I64,
            TypeDescriptor::String | TypeDescriptor::Binary => TType::String,
            TypeDescriptor::List(_) => TType::List,
            TypeDescriptor::Set(_) => TType::Set,
            TypeDescriptor::Map(..) => TType::Map,
            TypeDescriptor::Optional(inner) => inner.wire_type(),
            TypeDescriptor::Struct(_) => TType::Struct,
        }
    }

    /// Applies a field tag's sequence-discriminator queue.
    ///
    /// Tokens are consumed left-to-right, one per sequence node, walking
    /// depth-first (map keys before values) and stopping at struct
    /// boundaries (nested structs carry their own field tags). A node
    /// with no token left keeps its declared kind; leftover tokens are a
    /// construction error.
    pub(crate) fn resolved(self, queue: &[SeqKind]) -> Result<TypeDescriptor, CodecError> {
        let mut iter = queue.iter().copied();
        let d = self.resolve_inner(&mut iter);
        if iter.next().is_some() {
            return Err(CodecError::construction(
                "field tag has more list/set modifiers than sequence types",
            ));
        }
        Ok(d)
    }

    fn sequence(kind: SeqKind, elem: TypeDescriptor) -> TypeDescriptor {
        match kind {
            SeqKind::List => TypeDescriptor::List(Box::new(elem)),
            SeqKind::Set => TypeDescriptor::Set(Box::new(elem)),
        }
    }

    fn resolve_inner(self, queue: &mut impl Iterator<Item = SeqKind>) -> TypeDescriptor {
        match self {
            TypeDescriptor::List(elem) => {
                let kind = queue.next().unwrap_or(SeqKind::List);
                Self::sequence(kind, elem.resolve_inner(queue))
            }
            TypeDescriptor::Set(elem) => {
                let kind = queue.next().unwrap_or(SeqKind::Set);
                Self::sequence(kind, elem.resolve_inner(queue))
            }
            TypeDescriptor::Map(k, v) => {
                let k = Box::new(k.resolve_inner(queue));
                let v = Box::new(v.resolve_inner(queue));
                TypeDescriptor::Map(k, v)
            }
            TypeDescriptor::Optional(inner) => {
                TypeDescriptor::Optional(Box::new(inner.resolve_inner(queue)))
            }
            other => other,
        }
    }
}

///////////////////////////////////////////////////////////////////////////
// HOST TYPE BRIDGE

/// A host type the codec layer can carry.
///
/// Implementors name their shape with a [`TypeDescriptor`] and convert to
/// and from [`Value`]s. Most implementations also provide `From`/`TryFrom`
/// conversions for ergonomics; the trait carries its own methods so that
/// composite shapes (notably optionals) stay clear of the standard
/// library's blanket conversion impls.
pub trait HostType: Sized {
    /// This type's shape
    fn descriptor() -> TypeDescriptor;
    /// Wraps this value for the codec layer.
    fn into_value(self) -> Value;
    /// Unwraps a codec value back into this type.
    fn from_value(v: Value) -> Result<Self, CodecError>;
}

macro_rules! host_scalar {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Value {
                Value::$variant(v)
            }
        }
        impl TryFrom<Value> for $ty {
            type Error = CodecError;
            fn try_from(v: Value) -> Result<Self, CodecError> {
                match v {
                    Value::$variant(x) => Ok(x),
                    other => Err(CodecError::mismatch(stringify!($variant), &other)),
                }
            }
        }
        impl HostType for $ty {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::$variant
            }
            fn into_value(self) -> Value {
                self.into()
            }
            fn from_value(v: Value) -> Result<Self, CodecError> {
                v.try_into()
            }
        }
    };
}

host_scalar!(bool, Bool);
host_scalar!(u8, Byte);
host_scalar!(i8, I8);
host_scalar!(f64, Double);
host_scalar!(u16, U16);
host_scalar!(i16, I16);
host_scalar!(u32, U32);
host_scalar!(i32, I32);
host_scalar!(u64, U64);
host_scalar!(i64, I64);
host_scalar!(String, String);

// f32 widens to the wire double
impl From<f32> for Value {
    fn from(v: f32) -> Value {
        Value::Double(f64::from(v))
    }
}
impl TryFrom<Value> for f32 {
    type Error = CodecError;
    fn try_from(v: Value) -> Result<Self, CodecError> {
        match v {
            #[allow(clippy::cast_possible_truncation)] // widened on the way in
            Value::Double(x) => Ok(x as f32),
            other => Err(CodecError::mismatch("Double", &other)),
        }
    }
}
impl HostType for f32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Double
    }
    fn into_value(self) -> Value {
        self.into()
    }
    fn from_value(v: Value) -> Result<Self, CodecError> {
        v.try_into()
    }
}

// native-width integers travel as the 64-bit kinds
impl From<usize> for Value {
    #[allow(clippy::cast_possible_truncation)] // usize is at most 64 bits here
    fn from(v: usize) -> Value {
        Value::U64(v as u64)
    }
}
impl TryFrom<Value> for usize {
    type Error = CodecError;
    fn try_from(v: Value) -> Result<Self, CodecError> {
        match v {
            Value::U64(x) => usize::try_from(x)
                .map_err(|_| CodecError::construction("u64 does not fit usize")),
            other => Err(CodecError::mismatch("U64", &other)),
        }
    }
}
impl HostType for usize {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::U64
    }
    fn into_value(self) -> Value {
        self.into()
    }
    fn from_value(v: Value) -> Result<Self, CodecError> {
        v.try_into()
    }
}

impl From<isize> for Value {
    #[allow(clippy::cast_possible_truncation)] // isize is at most 64 bits here
    fn from(v: isize) -> Value {
        Value::I64(v as i64)
    }
}
impl TryFrom<Value> for isize {
    type Error = CodecError;
    fn try_from(v: Value) -> Result<Self, CodecError> {
        match v {
            Value::I64(x) => isize::try_from(x)
                .map_err(|_| CodecError::construction("i64 does not fit isize")),
            other => Err(CodecError::mismatch("I64", &other)),
        }
    }
}
impl HostType for isize {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::I64
    }
    fn into_value(self) -> Value {
        self.into()
    }
    fn from_value(v: Value) -> Result<Self, CodecError> {
        v.try_into()
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::String(v.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Value {
        Value::Binary(v)
    }
}
impl TryFrom<Value> for Bytes {
    type Error = CodecError;
    fn try_from(v: Value) -> Result<Self, CodecError> {
        match v {
            Value::Binary(x) => Ok(x),
            other => Err(CodecError::mismatch("Binary", &other)),
        }
    }
}
impl HostType for Bytes {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Binary
    }
    fn into_value(self) -> Value {
        self.into()
    }
    fn from_value(v: Value) -> Result<Self, CodecError> {
        v.try_into()
    }
}

impl<T: HostType> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Value {
        Value::List(v.into_iter().map(HostType::into_value).collect())
    }
}
impl<T: HostType> TryFrom<Value> for Vec<T> {
    type Error = CodecError;
    fn try_from(v: Value) -> Result<Self, CodecError> {
        match v {
            Value::List(items) | Value::Set(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => Err(CodecError::mismatch("List", &other)),
        }
    }
}
impl<T: HostType> HostType for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::List(Box::new(T::descriptor()))
    }
    fn into_value(self) -> Value {
        self.into()
    }
    fn from_value(v: Value) -> Result<Self, CodecError> {
        v.try_into()
    }
}

impl<T: HostType + Eq + Hash> From<HashSet<T>> for Value {
    fn from(v: HashSet<T>) -> Value {
        Value::Set(v.into_iter().map(HostType::into_value).collect())
    }
}
impl<T: HostType + Eq + Hash> TryFrom<Value> for HashSet<T> {
    type Error = CodecError;
    fn try_from(v: Value) -> Result<Self, CodecError> {
        match v {
            Value::List(items) | Value::Set(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => Err(CodecError::mismatch("Set", &other)),
        }
    }
}
impl<T: HostType + Eq + Hash> HostType for HashSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Set(Box::new(T::descriptor()))
    }
    fn into_value(self) -> Value {
        self.into()
    }
    fn from_value(v: Value) -> Result<Self, CodecError> {
        v.try_into()
    }
}

impl<T: HostType + Ord> From<BTreeSet<T>> for Value {
    fn from(v: BTreeSet<T>) -> Value {
        Value::Set(v.into_iter().map(HostType::into_value).collect())
    }
}
impl<T: HostType + Ord> TryFrom<Value> for BTreeSet<T> {
    type Error = CodecError;
    fn try_from(v: Value) -> Result<Self, CodecError> {
        match v {
            Value::List(items) | Value::Set(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => Err(CodecError::mismatch("Set", &other)),
        }
    }
}
impl<T: HostType + Ord> HostType for BTreeSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Set(Box::new(T::descriptor()))
    }
    fn into_value(self) -> Value {
        self.into()
    }
    fn from_value(v: Value) -> Result<Self, CodecError> {
        v.try_into()
    }
}

impl<K: HostType + Eq + Hash, V: HostType> From<HashMap<K, V>> for Value {
    fn from(v: HashMap<K, V>) -> Value {
        Value::Map(
            v.into_iter()
                .map(|(k, x)| (k.into_value(), x.into_value()))
                .collect(),
        )
    }
}
impl<K: HostType + Eq + Hash, V: HostType> TryFrom<Value> for HashMap<K, V> {
    type Error = CodecError;
    fn try_from(v: Value) -> Result<Self, CodecError> {
        match v {
            Value::Map(pairs) => pairs
                .into_iter()
                .map(|(k, x)| Ok((K::from_value(k)?, V::from_value(x)?)))
                .collect(),
            other => Err(CodecError::mismatch("Map", &other)),
        }
    }
}
impl<K: HostType + Eq + Hash, V: HostType> HostType for HashMap<K, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Map(Box::new(K::descriptor()), Box::new(V::descriptor()))
    }
    fn into_value(self) -> Value {
        self.into()
    }
    fn from_value(v: Value) -> Result<Self, CodecError> {
        v.try_into()
    }
}

impl<K: HostType + Ord, V: HostType> From<BTreeMap<K, V>> for Value {
    fn from(v: BTreeMap<K, V>) -> Value {
        Value::Map(
            v.into_iter()
                .map(|(k, x)| (k.into_value(), x.into_value()))
                .collect(),
        )
    }
}
impl<K: HostType + Ord, V: HostType> TryFrom<Value> for BTreeMap<K, V> {
    type Error = CodecError;
    fn try_from(v: Value) -> Result<Self, CodecError> {
        match v {
            Value::Map(pairs) => pairs
                .into_iter()
                .map(|(k, x)| Ok((K::from_value(k)?, V::from_value(x)?)))
                .collect(),
            other => Err(CodecError::mismatch("Map", &other)),
        }
    }
}
impl<K: HostType + Ord, V: HostType> HostType for BTreeMap<K, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Map(Box::new(K::descriptor()), Box::new(V::descriptor()))
    }
    fn into_value(self) -> Value {
        self.into()
    }
    fn from_value(v: Value) -> Result<Self, CodecError> {
        v.try_into()
    }
}

// Option stays off the `From`/`TryFrom` surface: the standard library's
// `impl<T> From<T> for Option<T>` makes those conversions ambiguous.
impl<T: HostType> HostType for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Optional(Box::new(T::descriptor()))
    }
    fn into_value(self) -> Value {
        match self {
            Some(x) => x.into_value(),
            None => Value::Null,
        }
    }
    fn from_value(v: Value) -> Result<Self, CodecError> {
        match v {
            Value::Null => Ok(None),
            other => Ok(Some(T::from_value(other)?)),
        }
    }
}
