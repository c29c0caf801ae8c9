//! Field tag parsing
// (c) 2025 Ross Younger

use std::str::FromStr;

use crate::codec::CodecError;

/// Discriminates a sequence between the two wire container kinds.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum_macros::Display)]
pub enum SeqKind {
    /// Ordered container
    List,
    /// Unordered container of unique elements
    Set,
}

/// Metadata attached to one declared field of a struct.
///
/// The tag syntax is `<identity>[,<modifier>]*`. Recognized modifiers are
/// `optional` (elide the field when its value is the zero value) and the
/// sequence discriminators `list` / `set`, which queue up in declaration
/// order and are consumed left-to-right as nested sequence codecs are
/// constructed. That lets a declaration like `map<string, list<set<i32>>>`
/// spell out which nested sequence is which: `"3,list,set"`.
///
/// ```
/// use thrifty::codec::{FieldTag, SeqKind};
/// let tag: FieldTag = "6,optional,set".parse().unwrap();
/// assert_eq!(tag.identity(), 6);
/// assert!(tag.is_optional());
/// assert_eq!(tag.seq_queue(), &[SeqKind::Set]);
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FieldTag {
    identity: i16,
    /// All modifier tokens, sorted, for membership tests
    modifiers: Vec<String>,
    /// The `list`/`set` tokens in declaration order
    seq_queue: Vec<SeqKind>,
}

const MOD_OPTIONAL: &str = "optional";
const MOD_LIST: &str = "list";
const MOD_SET: &str = "set";

impl FieldTag {
    /// Creates a tag with an identity and no modifiers.
    #[must_use]
    pub fn new(identity: i16) -> Self {
        Self {
            identity,
            modifiers: Vec::new(),
            seq_queue: Vec::new(),
        }
    }

    /// The field's identity within its struct
    #[must_use]
    pub fn identity(&self) -> i16 {
        self.identity
    }

    /// Whether the field is elided when its value is the zero value
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.modifiers
            .binary_search_by(|m| m.as_str().cmp(MOD_OPTIONAL))
            .is_ok()
    }

    /// The sequence discriminators, in declaration order
    #[must_use]
    pub fn seq_queue(&self) -> &[SeqKind] {
        &self.seq_queue
    }
}

impl FromStr for FieldTag {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CodecError::InvalidTag {
            tag: s.to_string(),
            reason: reason.to_string(),
        };
        let mut tokens = s.split(',').map(str::trim);
        let identity = tokens
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| invalid("missing identity"))?;
        let identity: i16 = identity
            .parse()
            .map_err(|_| invalid("identity is not a 16-bit integer"))?;
        let mut modifiers = Vec::new();
        let mut seq_queue = Vec::new();
        for token in tokens {
            match token {
                MOD_OPTIONAL => (),
                MOD_LIST => seq_queue.push(SeqKind::List),
                MOD_SET => seq_queue.push(SeqKind::Set),
                _ => return Err(invalid("unrecognized modifier")),
            }
            modifiers.push(token.to_string());
        }
        modifiers.sort_unstable();
        Ok(Self {
            identity,
            modifiers,
            seq_queue,
        })
    }
}
