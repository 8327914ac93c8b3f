//! Unified error type for Pulse.

use pulse_protocol::ProtocolError;
use pulse_realtime::RealtimeError;
use pulse_session::SessionError;
use pulse_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `pulse` meta-crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]` attribute
/// on each variant lets `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    /// A transport-level error (dial, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (login, registration, credential storage).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A realtime-level error (the connection actor is gone).
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    /// The operation needs a signed-in user.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A configuration value could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),
}
