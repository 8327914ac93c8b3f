//! Error types for the realtime layer.
//!
//! Connection failures are absorbed by the actor and only show up as
//! `ConnectionStatus::ClosedError` plus a `last_error` message. The one
//! error callers of [`RealtimeClient`](crate::RealtimeClient) see directly
//! is [`RealtimeError::Unavailable`].

use std::time::Duration;

use pulse_protocol::ProtocolError;
use pulse_transport::TransportError;

/// Errors that can occur in the realtime layer.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    /// The link failed (dial, send, or receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded, or the server broke the protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server did not accept the handshake in time.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// The server answered the handshake with an error frame.
    #[error("handshake rejected ({code}): {message}")]
    HandshakeRejected { code: u16, message: String },

    /// The link closed before the server accepted the handshake.
    #[error("link closed during handshake: {0}")]
    ClosedDuringHandshake(String),

    /// Nothing arrived from the server for longer than the idle timeout.
    #[error("no traffic from server for {0:?}")]
    IdleTimeout(Duration),

    /// The actor has shut down; the handle is dead.
    #[error("realtime client has shut down")]
    Unavailable,
}
