//! Wire protocol for Pulse.
//!
//! This crate defines the "language" the client speaks with the realtime
//! server:
//!
//! - **Types** ([`Frame`], [`SystemMessage`], [`UserId`], [`RoomId`]):
//!   the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those frames are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the realtime
//! connection manager (state machine). It doesn't know about links or
//! sessions; it only knows how to serialize and deserialize frames.
//!
//! ```text
//! Transport (bytes) → Protocol (Frame) → Realtime (connection state)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

// Users write `use pulse_protocol::Frame` instead of
// `use pulse_protocol::types::Frame`.

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Frame, RoomId, SystemMessage, UserId, PROTOCOL_VERSION};
