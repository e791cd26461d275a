//! Error types for the bridge library
//!
//! Application code (binary, config loading) uses `anyhow`; everything the
//! library hands back to a caller goes through [`BridgeError`].

use thiserror::Error;

/// Errors produced at the bridge boundary and by transport drivers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Channel number outside the closed 0-127 addressing space
    #[error("channel {0} is outside 0-127")]
    OutOfRangeChannel(i32),

    /// Velocity or controller value above 127
    #[error("value {0} is outside 0-127")]
    OutOfRangeValue(u8),

    /// No transport port matched the configured pattern
    #[error("MIDI input port '{0}' not found")]
    PortNotFound(String),

    /// Transport initialisation or connection failure
    #[error("MIDI transport error: {0}")]
    Midi(String),
}

impl From<midir::InitError> for BridgeError {
    fn from(err: midir::InitError) -> Self {
        BridgeError::Midi(err.to_string())
    }
}

impl<T> From<midir::ConnectError<T>> for BridgeError {
    fn from(err: midir::ConnectError<T>) -> Self {
        BridgeError::Midi(err.kind().to_string())
    }
}

/// Result alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
