// (c) 2025 Ross Younger

//! Client-side runtime for an Apache-Thrift-compatible RPC framework.
//!
//! The crate covers three layers:
//!
//! * **Wire protocols** — [`BinaryProtocol`](protocol::BinaryProtocol)
//!   (fixed-width big-endian) and
//!   [`CompactProtocol`](protocol::CompactProtocol) (varints, zig-zag,
//!   field-identity deltas, packed booleans), byte-compatible with the
//!   published Thrift specifications, over a pluggable byte
//!   [`Transport`](transport::Transport).
//! * **Type-directed codecs** — a process-wide registry
//!   ([`codec::encoder_of`]) memoizing one encoder per type shape;
//!   struct fields carry tags (`"1"`, `"2,optional"`, `"6,optional,set"`)
//!   naming their identity, optionality, and nested list/set
//!   discrimination.
//! * **Clients** — a [`StandardClient`](client::StandardClient) pairing
//!   a CALL with its REPLY or EXCEPTION (enforcing method-name and
//!   sequence-identity correspondence), a connection
//!   [`PoolClient`](client::PoolClient), and the
//!   [`service_client!`] macro which binds a record of tagged method
//!   signatures into typed asynchronous stubs.
//!
//! ## Example: encoding a value by shape
//!
//! ```
//! use thrifty::codec::{encoder_of, HostType, Value};
//! use thrifty::protocol::BinaryProtocol;
//! use thrifty::transport::MemoryBuffer;
//!
//! # fn main() -> Result<(), thrifty::Error> {
//! let mut p = BinaryProtocol::new(MemoryBuffer::default());
//! let encoder = encoder_of(&<Vec<String> as HostType>::descriptor())?;
//! encoder.encode(&Value::from(vec!["hello".to_string()]), &mut p)?;
//!
//! let mut out = Value::List(Vec::new());
//! encoder.decode(&mut out, &mut p)?;
//! assert_eq!(out, Value::from(vec!["hello".to_string()]));
//! # Ok(())
//! # }
//! ```
//!
//! Only `flush` (and therefore [`Client::call`](client::Client::call))
//! suspends; every other operation is synchronous against a buffering
//! transport. Protocols are not safe for concurrent use — the standard
//! client serializes exchanges through its own lock.

pub mod client;
pub mod codec;
mod config;
mod error;
pub mod protocol;
pub mod transport;
mod types;

pub mod service;

pub use config::{
    Configuration, ConfigurationSetter, DEFAULT_MAX_BUFFER_SIZE, DEFAULT_MAX_MESSAGE_SIZE,
};
pub use error::{
    ApplicationError, ApplicationErrorKind, Cause, Error, ProtocolError, ProtocolErrorKind,
    TransportError, TransportErrorKind,
};
pub use types::{
    TFieldHeader, TListHeader, TMapHeader, TMessageHeader, TMessageType, TSetHeader,
    TStructHeader, TType,
};
