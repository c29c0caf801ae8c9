//! Shared configuration envelope for protocols and transports
// (c) 2025 Ross Younger

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolErrorKind};

/// Default limit on any single length read off the wire
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 8192;
/// Default initial capacity for buffering transports
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024;

/// Behavioural knobs shared between protocols and transports.
///
/// Wherever a constructor takes an `Option<Configuration>`, `None`
/// substitutes [`Configuration::default()`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Configuration {
    /// Binary protocol: require a version word when reading message headers
    pub strict_read: bool,
    /// Binary protocol: emit a version word when writing message headers
    pub strict_write: bool,
    /// Upper bound on any length prefix read off the wire.
    /// This exists to prevent excessive memory consumption when a peer
    /// (or network corruption) presents a malicious length.
    pub max_message_size: usize,
    /// Initial buffer capacity for transports that buffer
    pub max_buffer_size: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            strict_read: false,
            strict_write: true,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl Configuration {
    /// Resolves an optional configuration, substituting defaults for `None`.
    #[must_use]
    pub fn resolve(cfg: Option<Configuration>) -> Configuration {
        cfg.unwrap_or_default()
    }

    /// Validates a length prefix read off the wire.
    ///
    /// Negative lengths yield [`ProtocolErrorKind::NegativeSize`]; lengths
    /// beyond [`max_message_size`](Configuration::max_message_size) yield
    /// [`ProtocolErrorKind::SizeLimit`].
    pub fn check_size(&self, size: i64) -> Result<usize, ProtocolError> {
        if size < 0 {
            return Err(ProtocolError::new(
                ProtocolErrorKind::NegativeSize,
                format!("negative size: {size}"),
            ));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // checked above
        let size = size as usize;
        if size > self.max_message_size {
            return Err(ProtocolError::new(
                ProtocolErrorKind::SizeLimit,
                format!(
                    "size exceeded max allowed: {size} (limit: {})",
                    self.max_message_size
                ),
            ));
        }
        Ok(size)
    }
}

/// Implemented by components that accept configuration after construction.
///
/// Protocols propagate their configuration to any transport that opts in.
pub trait ConfigurationSetter {
    /// Accepts a configuration. What the component does with it is its own affair.
    fn set_configuration(&mut self, cfg: &Configuration);
}
