//! Type-directed codec layer
//!
//! This layer maps host values to and from the wire without generated
//! code. A [`TypeDescriptor`] names a host type's shape; the process-wide
//! registry ([`encoder_of`]) memoizes one [`InternalEncoder`] per
//! descriptor; a [`DynamicStruct`] carries a live [`Value`] together with
//! its struct encoder and is the argument/result envelope of an RPC.
//!
//! Struct fields are declared with tags of the form
//! `"<identity>[,optional][,list|set…]"` — see [`FieldTag`].
// (c) 2025 Ross Younger

mod encoder;
mod fields;
mod structs;
mod value;

pub use encoder::{InternalEncoder, encoder_of};
pub use fields::{FieldTag, SeqKind};
pub use structs::{DynamicStruct, FieldDecl, StructDescriptor};
pub use value::{HostType, StructValue, TypeDescriptor, Value};

/// Failure constructing a codec, or converting between host values and
/// [`Value`]s.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A field tag did not parse
    #[error("invalid field tag {tag:?}: {reason}")]
    InvalidTag {
        /// The offending tag text
        tag: String,
        /// What was wrong with it
        reason: String,
    },
    /// Two fields of one struct declared the same identity
    #[error("duplicate field identity {identity} in struct {name:?}")]
    DuplicateIdentity {
        /// Struct name
        name: String,
        /// The colliding identity
        identity: i16,
    },
    /// A value did not have the shape an encoder or conversion expected
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// What was wanted
        expected: &'static str,
        /// What was found
        found: &'static str,
    },
    /// Any other construction failure (bad method tags, out-of-range
    /// indices and the like)
    #[error("{0}")]
    Construction(String),
}

impl CodecError {
    pub(crate) fn mismatch(expected: &'static str, found: &Value) -> Self {
        Self::TypeMismatch {
            expected,
            found: found.type_name(),
        }
    }

    pub(crate) fn construction(message: impl Into<String>) -> Self {
        Self::Construction(message.into())
    }
}
