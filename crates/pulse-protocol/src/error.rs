//! Error types for the protocol layer.
//!
//! Each crate in Pulse defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in serialization or in the
//! shape of a frame, not in networking or session handling.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a frame type this client doesn't
    /// know, missing required fields, or truncated messages. The realtime
    /// reader logs and skips these instead of tearing the channel down.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame is valid JSON but violates protocol rules, e.g. a
    /// server answering a handshake with something other than an ack.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
