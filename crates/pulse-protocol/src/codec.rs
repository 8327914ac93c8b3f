//! Codec trait and implementations for serializing/deserializing frames.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The realtime layer doesn't care HOW frames are serialized; it just
//! needs something that implements the [`Codec`] trait.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds
///
/// - `Send + Sync` → the codec is shared between the connection actor and
///   the per-link reader task.
/// - `Clone` → each transport generation gets its own copy.
/// - `'static` → it owns everything it needs.
///
/// `DeserializeOwned` (vs plain `Deserialize`) means the decoded value owns
/// its data, so the receive buffer can be dropped right after decoding.
pub trait Codec: Clone + Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use pulse_protocol::{Codec, Frame, JsonCodec, SystemMessage};
///
/// let codec = JsonCodec;
/// let frame = Frame::System(SystemMessage::Heartbeat { client_time: 5000 });
///
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: Frame = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Frame, SystemMessage, UserId};

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<Frame, _> = JsonCodec.decode(b"not json {");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated_frame_returns_decode_error() {
        let bytes = JsonCodec
            .encode(&Frame::System(SystemMessage::Presence {
                users: vec![UserId::new("u1")],
            }))
            .unwrap();
        let result: Result<Frame, _> =
            JsonCodec.decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_error_message_is_prefixed() {
        let err = JsonCodec.decode::<Frame>(b"[]").unwrap_err();
        assert!(err.to_string().starts_with("decode failed"));
    }
}
