//! Round-trip properties across both wire protocols
// (c) 2025 Ross Younger

use bytes::Bytes;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thrifty::codec::{
    DynamicStruct, FieldDecl, HostType, StructDescriptor, TypeDescriptor, Value, encoder_of,
};
use thrifty::protocol::{BinaryProtocol, CompactProtocol};
use thrifty::transport::MemoryBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Wire {
    Binary,
    Compact,
}

fn round_trip(wire: Wire, d: &TypeDescriptor, v: &Value) -> Value {
    let encoder = encoder_of(d).unwrap();
    let mut out = Value::default_of(d);
    match wire {
        Wire::Binary => {
            let mut p = BinaryProtocol::new(MemoryBuffer::default());
            encoder.encode(v, &mut p).unwrap();
            encoder.decode(&mut out, &mut p).unwrap();
        }
        Wire::Compact => {
            let mut p = CompactProtocol::new(MemoryBuffer::default());
            encoder.encode(v, &mut p).unwrap();
            encoder.decode(&mut out, &mut p).unwrap();
        }
    }
    out
}

fn every_shape() -> Vec<(TypeDescriptor, Value)> {
    vec![
        (<bool as HostType>::descriptor(), Value::from(true)),
        (<u8 as HostType>::descriptor(), Value::from(255u8)),
        (<i8 as HostType>::descriptor(), Value::from(-128i8)),
        (<f32 as HostType>::descriptor(), Value::from(0.123f32)),
        (<f64 as HostType>::descriptor(), Value::from(0.321f64)),
        (<u16 as HostType>::descriptor(), Value::from(65535u16)),
        (<i16 as HostType>::descriptor(), Value::from(i16::MIN)),
        (<u32 as HostType>::descriptor(), Value::from(u32::MAX)),
        (<i32 as HostType>::descriptor(), Value::from(i32::MIN)),
        (<u64 as HostType>::descriptor(), Value::from(u64::MAX)),
        (<i64 as HostType>::descriptor(), Value::from(i64::MIN)),
        (<usize as HostType>::descriptor(), Value::from(255usize)),
        (<isize as HostType>::descriptor(), Value::from(-128isize)),
        (
            <String as HostType>::descriptor(),
            Value::from("Hello World"),
        ),
        (
            <Bytes as HostType>::descriptor(),
            Value::from(Bytes::from_static(b"\x00\x01\xfe\xff")),
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
            <HashSet<i32> as HostType>::descriptor(),
            Value::Set(vec![Value::I32(1), Value::I32(2), Value::I32(3)]),
        ),
        (
            <BTreeMap<String, i64> as HostType>::descriptor(),
            Value::from(BTreeMap::from([
                ("Hello".to_string(), 1i64),
                ("Hi".to_string(), 2i64),
            ])),
        ),
        (
            <Option<String> as HostType>::descriptor(),
            Some("present".to_string()).into_value(),
        ),
        (
            <Vec<Vec<i32>> as HostType>::descriptor(),
            Value::from(vec![vec![1i32, 2], vec![], vec![3]]),
        ),
    ]
}

#[rstest]
#[case::binary(Wire::Binary)]
#[case::compact(Wire::Compact)]
fn every_value_shape_round_trips(#[case] wire: Wire) {
    for (d, v) in every_shape() {
        assert_eq!(round_trip(wire, &d, &v), v, "shape {d:?} over {wire:?}");
    }
}

fn known_fields() -> Vec<FieldDecl> {
    vec![
        FieldDecl::new("name", "4", TypeDescriptor::String).unwrap(),
        FieldDecl::new("count", "5", TypeDescriptor::I32).unwrap(),
    ]
}

/// Unknown identities prepended and appended around the known fields must
/// decode to the same struct, with the strangers skipped.
#[rstest]
#[case::binary(Wire::Binary)]
#[case::compact(Wire::Compact)]
fn unknown_fields_are_skipped_wherever_they_sit(#[case] wire: Wire) {
    let reader_shape = StructDescriptor::new("known", known_fields()).unwrap();

    // The writer's view: unknown identities on both sides of the known ones.
    let mut writer_fields = vec![
        FieldDecl::new("before1", "1", TypeDescriptor::I64).unwrap(),
        FieldDecl::new(
            "before2",
            "2",
            TypeDescriptor::List(Box::new(TypeDescriptor::String)),
        )
        .unwrap(),
    ];
    writer_fields.extend(known_fields());
    writer_fields.push(
        FieldDecl::new(
            "after",
            "9",
            TypeDescriptor::Map(
                Box::new(TypeDescriptor::String),
                Box::new(TypeDescriptor::Double),
            ),
        )
        .unwrap(),
    );
    let writer_shape = StructDescriptor::new("with_unknowns", writer_fields).unwrap();

    let mut writer = DynamicStruct::new(Arc::clone(&writer_shape)).unwrap();
    writer.set_field(0, Value::I64(-9)).unwrap();
    writer
        .set_field(1, Value::from(vec!["noise".to_string()]))
        .unwrap();
    writer.set_field(2, Value::from("kept")).unwrap();
    writer.set_field(3, Value::I32(17)).unwrap();
    writer
        .set_field(
            4,
            Value::Map(vec![(Value::from("pi"), Value::Double(3.14))]),
        )
        .unwrap();

    let mut reader = DynamicStruct::new(reader_shape).unwrap();
    match wire {
        Wire::Binary => {
            let mut p = BinaryProtocol::new(MemoryBuffer::default());
            writer.write(&mut p).unwrap();
            reader.read(&mut p).unwrap();
        }
        Wire::Compact => {
            let mut p = CompactProtocol::new(MemoryBuffer::default());
            writer.write(&mut p).unwrap();
            reader.read(&mut p).unwrap();
        }
    }
    assert_eq!(reader.field(0), Some(&Value::from("kept")));
    assert_eq!(reader.field(1), Some(&Value::I32(17)));
}

/// The two protocols must agree through the codec layer: what Binary can
/// carry, Compact can carry too.
#[test]
fn protocols_agree_on_every_shape() {
    for (d, v) in every_shape() {
        assert_eq!(
            round_trip(Wire::Binary, &d, &v),
            round_trip(Wire::Compact, &d, &v),
            "shape {d:?}"
        );
    }
}

/// A struct exercising nested discrimination: a set at field 6 riding
/// alongside scalars, over both protocols.
#[rstest]
#[case::binary(Wire::Binary)]
#[case::compact(Wire::Compact)]
fn discriminated_set_round_trips(#[case] wire: Wire) {
    let shape = StructDescriptor::new(
        "tagged",
        vec![
            FieldDecl::new("id", "1", TypeDescriptor::I64).unwrap(),
            FieldDecl::new(
                "labels",
                "6,optional,set",
                TypeDescriptor::List(Box::new(TypeDescriptor::String)),
            )
            .unwrap(),
        ],
    )
    .unwrap();
    let mut writer = DynamicStruct::new(Arc::clone(&shape)).unwrap();
    writer.set_field(0, Value::I64(1)).unwrap();
    writer
        .set_field(
            1,
            Value::List(vec![Value::from("a"), Value::from("b")]),
        )
        .unwrap();

    let mut reader = DynamicStruct::new(shape).unwrap();
    match wire {
        Wire::Binary => {
            let mut p = BinaryProtocol::new(MemoryBuffer::default());
            writer.write(&mut p).unwrap();
            reader.read(&mut p).unwrap();
        }
        Wire::Compact => {
            let mut p = CompactProtocol::new(MemoryBuffer::default());
            writer.write(&mut p).unwrap();
            reader.read(&mut p).unwrap();
        }
    }
    // decoded through the SET wire container
    assert_eq!(
        reader.field(1),
        Some(&Value::Set(vec![Value::from("a"), Value::from("b")]))
    );
}
