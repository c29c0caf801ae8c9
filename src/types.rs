//! Wire type model: type tags, message types and header records
// (c) 2025 Ross Younger

use int_enum::IntEnum;

/// Identifies the encoding of a value on the wire.
///
/// Numbering follows the published Thrift enumeration; the unsigned
/// variants occupy the slots the published table leaves unused.
/// `Stop` is reserved to mark end-of-struct.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, IntEnum, PartialEq, strum_macros::Display,
)]
#[repr(u8)]
pub enum TType {
    /// End-of-struct marker. Never a value type.
    #[default]
    Stop = 0,
    /// No value (method with no meaningful return)
    Void = 1,
    /// Boolean
    Bool = 2,
    /// Unsigned or signed octet
    Byte = 3,
    /// 64-bit IEEE 754 float
    Double = 4,
    /// Unsigned 16-bit integer
    U16 = 5,
    /// Signed 16-bit integer
    I16 = 6,
    /// Unsigned 32-bit integer
    U32 = 7,
    /// Signed 32-bit integer
    I32 = 8,
    /// Unsigned 64-bit integer
    U64 = 9,
    /// Signed 64-bit integer
    I64 = 10,
    /// Length-prefixed UTF-8 text, also the wire form of raw binary
    String = 11,
    /// Field-tagged record
    Struct = 12,
    /// Key/value container
    Map = 13,
    /// Unordered container of unique elements
    Set = 14,
    /// Ordered container
    List = 15,
}

/// The role of a message within an RPC exchange.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, IntEnum, PartialEq, strum_macros::Display,
)]
#[repr(u8)]
pub enum TMessageType {
    /// Request expecting a reply
    #[default]
    Call = 1,
    /// Successful response to a [`Call`](TMessageType::Call)
    Reply = 2,
    /// Server-side failure response, carrying an application error envelope
    Exception = 3,
    /// Request expecting no reply
    Oneway = 4,
}

/// Envelope preceding every message on the wire.
#[derive(Clone, Debug, Default, Eq, PartialEq, derive_more::Constructor)]
pub struct TMessageHeader {
    /// Method name
    pub name: String,
    /// Message role
    pub message_type: TMessageType,
    /// Sequence identity, scoped to a client instance. A reply's identity
    /// must equal that of the request it answers.
    pub identity: i32,
}

/// Struct envelope. The name is informational and does not travel on the wire.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TStructHeader {
    /// Struct name (diagnostics only)
    pub name: String,
}

/// Field envelope within a struct.
#[derive(Clone, Debug, Default, Eq, PartialEq, derive_more::Constructor)]
pub struct TFieldHeader {
    /// Field name (diagnostics only; not on the wire)
    pub name: String,
    /// Wire type of the field value. [`TType::Stop`] marks end-of-struct.
    pub field_type: TType,
    /// Identity of the field within its struct. Valid identities are ≥ 1.
    pub identity: i16,
}

/// Map container envelope.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, derive_more::Constructor)]
pub struct TMapHeader {
    /// Wire type of the keys
    pub key: TType,
    /// Wire type of the values
    pub value: TType,
    /// Number of key/value pairs
    pub size: usize,
}

/// Set container envelope.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, derive_more::Constructor)]
pub struct TSetHeader {
    /// Wire type of the elements
    pub element: TType,
    /// Number of elements
    pub size: usize,
}

/// List container envelope.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, derive_more::Constructor)]
pub struct TListHeader {
    /// Wire type of the elements
    pub element: TType,
    /// Number of elements
    pub size: usize,
}
