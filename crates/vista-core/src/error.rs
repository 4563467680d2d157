//! Error types for the VISTA viewer core

use thiserror::Error;

/// Core VISTA errors
#[derive(Error, Debug)]
pub enum VistaError {
    // Framing errors
    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Bad status tag: {0:?}")]
    BadStatusTag([u8; 3]),

    #[error("Declared payload length {declared} but only {available} bytes arrived")]
    TruncatedPayload { declared: usize, available: usize },

    // Broadcast codec errors
    #[error("Unknown message tag: {0:#04x}")]
    UnknownMessageTag(u8),

    // Transport errors
    #[error("Connection is not in the required state")]
    NotConnected,

    #[error("A frame read is already in flight")]
    ReadInFlight,

    #[error("Transport error: {0}")]
    TransportError(String),
}

/// Result type for VISTA operations
pub type VistaResult<T> = Result<T, VistaError>;
