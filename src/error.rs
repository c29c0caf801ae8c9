//! Error taxonomy: transport, protocol and application families
// (c) 2025 Ross Younger

use std::io;

use int_enum::IntEnum;

use crate::protocol::Protocol;
use crate::types::{TFieldHeader, TStructHeader, TType};

/// An underlying cause carried by a transport or protocol error
pub type Cause = Box<dyn std::error::Error + Send + Sync>;

///////////////////////////////////////////////////////////////////////////
// TRANSPORT

/// What went wrong at the byte-shovelling layer
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum TransportErrorKind {
    /// Anything we cannot classify further
    Unknown,
    /// The peer closed the connection, or a read ran off the end of a buffer
    Eof,
    /// The operation timed out
    Timeout,
}

/// Failure surfaced by a [`Transport`](crate::transport::Transport).
#[derive(Debug, thiserror::Error)]
#[error("transport error ({kind}): {source}")]
pub struct TransportError {
    kind: TransportErrorKind,
    #[source]
    source: Cause,
}

impl TransportError {
    /// Creates an error of the given kind from a message
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: message.into().into(),
        }
    }

    /// The error classification
    #[must_use]
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        let kind = match e.kind() {
            io::ErrorKind::UnexpectedEof => TransportErrorKind::Eof,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportErrorKind::Timeout,
            _ => TransportErrorKind::Unknown,
        };
        Self {
            kind,
            source: Box::new(e),
        }
    }
}

///////////////////////////////////////////////////////////////////////////
// PROTOCOL

/// What went wrong at the wire-encoding layer
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum ProtocolErrorKind {
    /// Anything we cannot classify further (including wrapped transport errors)
    Unknown,
    /// Malformed bytes: unknown type tags, invalid UTF-8, truncated varints
    InvalidData,
    /// A length prefix was negative
    NegativeSize,
    /// A length prefix exceeded the configured maximum.
    /// Fatal for the connection.
    SizeLimit,
    /// A message header's version word did not match the protocol.
    /// Fatal for the connection.
    BadVersion,
}

/// Failure surfaced by a [`Protocol`](crate::protocol::Protocol).
///
/// Any non-protocol error raised during a protocol call (in practice, a
/// [`TransportError`]) wraps as `Unknown` with the cause preserved.
#[derive(Debug, thiserror::Error)]
#[error("protocol error ({kind}): {source}")]
pub struct ProtocolError {
    kind: ProtocolErrorKind,
    #[source]
    source: Cause,
}

impl ProtocolError {
    /// Creates an error of the given kind from a message
    #[must_use]
    pub fn new(kind: ProtocolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: message.into().into(),
        }
    }

    /// The error classification
    #[must_use]
    pub fn kind(&self) -> ProtocolErrorKind {
        self.kind
    }
}

impl From<TransportError> for ProtocolError {
    fn from(e: TransportError) -> Self {
        Self {
            kind: ProtocolErrorKind::Unknown,
            source: Box::new(e),
        }
    }
}

///////////////////////////////////////////////////////////////////////////
// APPLICATION

/// Application-level failure classification.
///
/// This enum crosses the wire (field 2 of the exception reply envelope),
/// hence the numeric representation.
#[derive(Clone, Copy, Debug, Default, Eq, IntEnum, PartialEq, strum_macros::Display)]
#[repr(i32)]
pub enum ApplicationErrorKind {
    /// Anything we cannot classify further
    #[default]
    Unknown = 0,
    /// The server does not implement the requested method
    UnknownMethod = 1,
    /// A reply arrived with a message type that makes no sense here
    InvalidMessageType = 2,
    /// A reply arrived for a different method than the pending request
    WrongMethodName = 3,
    /// A reply arrived with a sequence identity that does not match the pending request
    BadSequenceId = 4,
    /// The reply carried no result where one was required
    MissingResult = 5,
    /// The server failed internally
    InternalError = 6,
    /// The server could not decode the request
    ProtocolError = 7,
    /// Request transform not supported by the peer
    InvalidTransform = 8,
    /// Protocol not supported by the peer
    InvalidProtocol = 9,
    /// Client type not supported by the peer
    UnsupportedClientType = 10,
}

/// An RPC-level failure, either raised locally (reply validation) or
/// decoded from a server exception reply.
///
/// The envelope serializes as a struct with the message at field 1 and the
/// numeric kind at field 2.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApplicationError {
    /// Error classification
    pub kind: ApplicationErrorKind,
    /// Human-readable detail
    pub message: String,
}

const ENVELOPE_MESSAGE_FIELD: i16 = 1;
const ENVELOPE_TYPE_FIELD: i16 = 2;

impl ApplicationError {
    /// Creates an error of the given kind from a message
    #[must_use]
    pub fn new(kind: ApplicationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Serializes the exception envelope.
    pub fn write(&self, p: &mut dyn Protocol) -> Result<(), ProtocolError> {
        p.write_struct_begin(&TStructHeader {
            name: "TApplicationException".into(),
        })?;
        p.write_field_begin(&TFieldHeader::new(
            "message".into(),
            TType::String,
            ENVELOPE_MESSAGE_FIELD,
        ))?;
        p.write_string(&self.message)?;
        p.write_field_end()?;
        p.write_field_begin(&TFieldHeader::new(
            "type".into(),
            TType::I32,
            ENVELOPE_TYPE_FIELD,
        ))?;
        p.write_i32(i32::from(self.kind))?;
        p.write_field_end()?;
        p.write_field_stop()?;
        p.write_struct_end()
    }

    /// Deserializes the exception envelope.
    ///
    /// Unknown fields are skipped; an unrecognized numeric kind decodes as
    /// [`ApplicationErrorKind::Unknown`].
    pub fn read(p: &mut dyn Protocol) -> Result<Self, ProtocolError> {
        let mut e = Self::new(ApplicationErrorKind::Unknown, String::new());
        let _ = p.read_struct_begin()?;
        loop {
            let h = p.read_field_begin()?;
            match (h.identity, h.field_type) {
                (_, TType::Stop) => break,
                (ENVELOPE_MESSAGE_FIELD, TType::String) => e.message = p.read_string()?,
                (ENVELOPE_TYPE_FIELD, TType::I32) => {
                    e.kind = ApplicationErrorKind::try_from(p.read_i32()?)
                        .unwrap_or(ApplicationErrorKind::Unknown);
                }
                (_, other) => p.skip(other)?,
            }
            p.read_field_end()?;
        }
        p.read_struct_end()?;
        Ok(e)
    }
}

///////////////////////////////////////////////////////////////////////////
// CRATE-LEVEL SUM

/// Any failure this crate can produce.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Byte-shovelling failure
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Wire-encoding failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// RPC-level failure
    #[error(transparent)]
    Application(#[from] ApplicationError),
    /// Codec construction or value conversion failure
    #[error(transparent)]
    Codec(#[from] crate::codec::CodecError),
}
