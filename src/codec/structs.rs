//! Struct descriptors, the struct encoder and the RPC carrier
// (c) 2025 Ross Younger

use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::encoder::{InternalEncoder, encoder_of};
use crate::codec::value::{StructValue, TypeDescriptor, Value};
use crate::codec::{CodecError, FieldTag};
use crate::error::Error;
use crate::protocol::Protocol;
use crate::types::{TFieldHeader, TStructHeader, TType};

/// One declared field of a struct: a name, a parsed [`FieldTag`] and the
/// (tag-resolved) shape of its value.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FieldDecl {
    name: String,
    tag: FieldTag,
    descriptor: TypeDescriptor,
}

impl FieldDecl {
    /// Declares a field. The tag is parsed and its sequence-discriminator
    /// queue is applied to the descriptor immediately, so a malformed tag
    /// fails here rather than at first use.
    pub fn new(
        name: impl Into<String>,
        tag: &str,
        descriptor: TypeDescriptor,
    ) -> Result<Self, CodecError> {
        let tag: FieldTag = tag.parse()?;
        let descriptor = descriptor.resolved(tag.seq_queue())?;
        Ok(Self {
            name: name.into(),
            tag,
            descriptor,
        })
    }

    /// Field name (diagnostics only)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parsed tag
    #[must_use]
    pub fn tag(&self) -> &FieldTag {
        &self.tag
    }

    /// The resolved shape of the field's value
    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }
}

/// The runtime description of a struct type: a name plus ordered field
/// declarations. Field identities must be unique; a collision is a
/// construction error.
#[derive(Debug, Eq, Hash, PartialEq)]
pub struct StructDescriptor {
    name: String,
    fields: Vec<FieldDecl>,
}

impl StructDescriptor {
    /// Builds a descriptor, validating identity uniqueness.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldDecl>,
    ) -> Result<Arc<Self>, CodecError> {
        let name = name.into();
        let mut seen = HashMap::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            if seen.insert(field.tag.identity(), index).is_some() {
                return Err(CodecError::DuplicateIdentity {
                    name,
                    identity: field.tag.identity(),
                });
            }
        }
        Ok(Arc::new(Self { name, fields }))
    }

    /// Struct name (diagnostics only)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field declarations, in declaration order
    #[must_use]
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    /// Finds a field's declaration index by its identity.
    #[must_use]
    pub fn index_of(&self, identity: i16) -> Option<usize> {
        self.fields.iter().position(|f| f.tag.identity() == identity)
    }
}

/// The encoder for one struct shape: per-field headers and inner encoders
/// by declaration index, plus the inverse identity → index mapping used
/// on decode.
#[derive(Debug)]
pub(crate) struct StructEncoder {
    descriptor: Arc<StructDescriptor>,
    fields: Vec<FieldCodec>,
    by_identity: HashMap<i16, usize>,
}

#[derive(Debug)]
struct FieldCodec {
    header: TFieldHeader,
    optional: bool,
    encoder: Arc<dyn InternalEncoder>,
}

impl StructEncoder {
    pub(crate) fn build(descriptor: Arc<StructDescriptor>) -> Result<Self, CodecError> {
        let mut fields = Vec::with_capacity(descriptor.fields().len());
        let mut by_identity = HashMap::with_capacity(descriptor.fields().len());
        for (index, decl) in descriptor.fields().iter().enumerate() {
            let encoder = encoder_of(decl.descriptor())?;
            fields.push(FieldCodec {
                header: TFieldHeader {
                    name: decl.name().to_string(),
                    field_type: encoder.kind(),
                    identity: decl.tag().identity(),
                },
                optional: decl.tag().is_optional(),
                encoder,
            });
            if by_identity.insert(decl.tag().identity(), index).is_some() {
                // unreachable through StructDescriptor::new, which validates
                return Err(CodecError::DuplicateIdentity {
                    name: descriptor.name().to_string(),
                    identity: decl.tag().identity(),
                });
            }
        }
        Ok(Self {
            descriptor,
            fields,
            by_identity,
        })
    }
}

impl InternalEncoder for StructEncoder {
    fn encode(&self, v: &Value, p: &mut dyn Protocol) -> Result<(), Error> {
        let Value::Struct(sv) = v else {
            return Err(CodecError::mismatch("Struct", v).into());
        };
        if sv.fields().len() != self.fields.len() {
            return Err(CodecError::construction(format!(
                "value has {} fields, struct {:?} declares {}",
                sv.fields().len(),
                self.descriptor.name(),
                self.fields.len()
            ))
            .into());
        }
        p.write_struct_begin(&TStructHeader {
            name: self.descriptor.name().to_string(),
        })?;
        for (fc, value) in self.fields.iter().zip(sv.fields()) {
            if fc.optional && value.is_zero() {
                continue;
            }
            p.write_field_begin(&fc.header)?;
            fc.encoder.encode(value, p)?;
            p.write_field_end()?;
        }
        p.write_field_stop()?;
        p.write_struct_end()?;
        Ok(())
    }

    fn decode(&self, v: &mut Value, p: &mut dyn Protocol) -> Result<(), Error> {
        *v = Value::Struct(StructValue::new(Arc::clone(&self.descriptor)));
        let Value::Struct(sv) = v else { unreachable!() };
        let _ = p.read_struct_begin()?;
        loop {
            let h = p.read_field_begin()?;
            if h.field_type == TType::Stop {
                break;
            }
            match self.by_identity.get(&h.identity) {
                Some(&index) if self.fields[index].header.field_type == h.field_type => {
                    let slot = sv.field_mut(index).ok_or_else(|| {
                        CodecError::construction("field index out of range")
                    })?;
                    self.fields[index].encoder.decode(slot, p)?;
                }
                _ => {
                    tracing::debug!(
                        identity = h.identity,
                        field_type = %h.field_type,
                        "skipping unknown field"
                    );
                    p.skip(h.field_type)?;
                }
            }
            p.read_field_end()?;
        }
        p.read_struct_end()?;
        Ok(())
    }

    fn kind(&self) -> TType {
        TType::Struct
    }
}

/// A live struct and its encoder: the argument and result envelope of an
/// RPC.
///
/// A bare carrier is created once at binding time; each call derives a
/// fresh one with [`instantiate`](DynamicStruct::instantiate), fills its
/// fields, and drives [`write`](DynamicStruct::write) /
/// [`read`](DynamicStruct::read). The encoder is shared (it comes from
/// the registry); the value is owned.
#[derive(Debug)]
pub struct DynamicStruct {
    descriptor: Arc<StructDescriptor>,
    encoder: Arc<dyn InternalEncoder>,
    value: Value,
}

impl DynamicStruct {
    /// Creates a carrier for a struct shape, fields at their zero values.
    pub fn new(descriptor: Arc<StructDescriptor>) -> Result<Self, CodecError> {
        let encoder = encoder_of(&TypeDescriptor::Struct(Arc::clone(&descriptor)))?;
        Ok(Self {
            value: Value::Struct(StructValue::new(Arc::clone(&descriptor))),
            descriptor,
            encoder,
        })
    }

    /// Derives a fresh carrier of the same shape, fields at their zero
    /// values. The encoder is shared, not rebuilt.
    #[must_use]
    pub fn instantiate(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            encoder: Arc::clone(&self.encoder),
            value: Value::Struct(StructValue::new(Arc::clone(&self.descriptor))),
        }
    }

    /// Resets every field to its zero value.
    pub fn reset(&mut self) {
        self.value = Value::Struct(StructValue::new(Arc::clone(&self.descriptor)));
    }

    /// The shape this carrier was built for
    #[must_use]
    pub fn descriptor(&self) -> &Arc<StructDescriptor> {
        &self.descriptor
    }

    /// Number of declared fields
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.descriptor.fields().len()
    }

    /// Borrows a field by declaration index
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Value> {
        match &self.value {
            Value::Struct(sv) => sv.field(index),
            _ => None,
        }
    }

    /// Replaces a field by declaration index
    pub fn set_field(&mut self, index: usize, v: Value) -> Result<(), CodecError> {
        match &mut self.value {
            Value::Struct(sv) => sv.set_field(index, v),
            _ => Err(CodecError::construction("carrier does not hold a struct")),
        }
    }

    /// Takes a field out by declaration index, leaving its zero value
    pub fn take_field(&mut self, index: usize) -> Option<Value> {
        match &mut self.value {
            Value::Struct(sv) => sv.take_field(index),
            _ => None,
        }
    }

    /// The whole live value
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Serializes the live value.
    pub fn write(&self, p: &mut dyn Protocol) -> Result<(), Error> {
        self.encoder.encode(&self.value, p)
    }

    /// Replaces the live value with one read from the protocol.
    pub fn read(&mut self, p: &mut dyn Protocol) -> Result<(), Error> {
        self.encoder.decode(&mut self.value, p)
    }
}

#[cfg(test)]
mod tests {
    use super::{DynamicStruct, FieldDecl, StructDescriptor};
    use crate::codec::{CodecError, TypeDescriptor, Value};
    use crate::protocol::{BinaryProtocol, CompactProtocol};
    use crate::transport::MemoryBuffer;
    use crate::types::TType;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn sample_descriptor() -> Arc<StructDescriptor> {
        StructDescriptor::new(
            "Sample",
            vec![
                FieldDecl::new("name", "1", TypeDescriptor::String).unwrap(),
                FieldDecl::new("flag", "2,optional", TypeDescriptor::Bool).unwrap(),
                FieldDecl::new(
                    "scores",
                    "3",
                    TypeDescriptor::List(Box::new(TypeDescriptor::I32)),
                )
                .unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn duplicate_identities_fail_construction() {
        let err = StructDescriptor::new(
            "Dup",
            vec![
                FieldDecl::new("a", "1", TypeDescriptor::I32).unwrap(),
                FieldDecl::new("b", "1", TypeDescriptor::I32).unwrap(),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::DuplicateIdentity { identity: 1, .. }));
    }

    #[test]
    fn set_modifier_discriminates_the_wire_type() {
        let d = StructDescriptor::new(
            "WithSet",
            vec![
                FieldDecl::new(
                    "set",
                    "6,optional,set",
                    TypeDescriptor::List(Box::new(TypeDescriptor::String)),
                )
                .unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(d.fields()[0].descriptor().wire_type(), TType::Set);
    }

    #[test]
    fn optional_zero_valued_field_is_elided() {
        let d = StructDescriptor::new(
            "OptBool",
            vec![FieldDecl::new("flag", "2,optional", TypeDescriptor::Bool).unwrap()],
        )
        .unwrap();
        let carrier = DynamicStruct::new(d).unwrap();
        let mut p = BinaryProtocol::new(MemoryBuffer::default());
        carrier.write(&mut p).unwrap();
        // just the stop byte: field 2 (false) was not emitted
        assert_eq!(p.into_transport().as_slice(), &[0x00]);

        let mut p = BinaryProtocol::new(MemoryBuffer::default());
        carrier.write(&mut p).unwrap();
        let mut read = carrier.instantiate();
        read.read(&mut p).unwrap();
        assert_eq!(read.field(0), Some(&Value::Bool(false)));
    }

    #[test]
    fn non_optional_zero_valued_field_is_kept() {
        let d = StructDescriptor::new(
            "PlainBool",
            vec![FieldDecl::new("flag", "2", TypeDescriptor::Bool).unwrap()],
        )
        .unwrap();
        let carrier = DynamicStruct::new(d).unwrap();
        let mut p = BinaryProtocol::new(MemoryBuffer::default());
        carrier.write(&mut p).unwrap();
        // field header (type + identity) + value + stop
        assert_eq!(p.into_transport().as_slice(), &[0x02, 0x00, 0x02, 0x00, 0x00]);
    }

    #[test]
    fn struct_round_trip_both_protocols() {
        let descriptor = sample_descriptor();
        let mut carrier = DynamicStruct::new(descriptor).unwrap();
        carrier.set_field(0, Value::from("Mars")).unwrap();
        carrier.set_field(1, Value::from(true)).unwrap();
        carrier
            .set_field(2, Value::from(vec![3i32, 1, 4]))
            .unwrap();

        let mut p = BinaryProtocol::new(MemoryBuffer::default());
        carrier.write(&mut p).unwrap();
        let mut read = carrier.instantiate();
        read.read(&mut p).unwrap();
        assert_eq!(read.value(), carrier.value());

        let mut p = CompactProtocol::new(MemoryBuffer::default());
        carrier.write(&mut p).unwrap();
        let mut read = carrier.instantiate();
        read.read(&mut p).unwrap();
        assert_eq!(read.value(), carrier.value());
    }

    #[test]
    fn unknown_fields_are_skipped() {
        // writer's struct has an extra field 9 the reader doesn't declare
        let writer_d = StructDescriptor::new(
            "V2",
            vec![
                FieldDecl::new("name", "1", TypeDescriptor::String).unwrap(),
                FieldDecl::new(
                    "extra",
                    "9",
                    TypeDescriptor::Map(
                        Box::new(TypeDescriptor::String),
                        Box::new(TypeDescriptor::I64),
                    ),
                )
                .unwrap(),
            ],
        )
        .unwrap();
        let reader_d = StructDescriptor::new(
            "V1",
            vec![FieldDecl::new("name", "1", TypeDescriptor::String).unwrap()],
        )
        .unwrap();

        for compact in [false, true] {
            let mut writer = DynamicStruct::new(Arc::clone(&writer_d)).unwrap();
            writer.set_field(0, Value::from("kept")).unwrap();
            writer
                .set_field(1, Value::Map(vec![(Value::from("gone"), Value::I64(1))]))
                .unwrap();
            let mut reader = DynamicStruct::new(Arc::clone(&reader_d)).unwrap();
            if compact {
                let mut p = CompactProtocol::new(MemoryBuffer::default());
                writer.write(&mut p).unwrap();
                reader.read(&mut p).unwrap();
            } else {
                let mut p = BinaryProtocol::new(MemoryBuffer::default());
                writer.write(&mut p).unwrap();
                reader.read(&mut p).unwrap();
            }
            assert_eq!(reader.field(0), Some(&Value::from("kept")));
        }
    }

    #[test]
    fn type_mismatched_fields_are_skipped() {
        // same identity, different wire type: the reader must skip it
        let writer_d = StructDescriptor::new(
            "W",
            vec![FieldDecl::new("x", "1", TypeDescriptor::I64).unwrap()],
        )
        .unwrap();
        let reader_d = StructDescriptor::new(
            "R",
            vec![FieldDecl::new("x", "1", TypeDescriptor::String).unwrap()],
        )
        .unwrap();
        let mut writer = DynamicStruct::new(writer_d).unwrap();
        writer.set_field(0, Value::I64(99)).unwrap();
        let mut reader = DynamicStruct::new(reader_d).unwrap();
        let mut p = BinaryProtocol::new(MemoryBuffer::default());
        writer.write(&mut p).unwrap();
        reader.read(&mut p).unwrap();
        assert_eq!(reader.field(0), Some(&Value::String(String::new())));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut carrier = DynamicStruct::new(sample_descriptor()).unwrap();
        carrier.set_field(0, Value::from("x")).unwrap();
        carrier.reset();
        assert_eq!(carrier.field(0), Some(&Value::String(String::new())));
    }
}
