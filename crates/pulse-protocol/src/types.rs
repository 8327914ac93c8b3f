//! Core protocol types for the Pulse wire format.
//!
//! Every type in this module travels "on the wire": it is serialized to
//! bytes by the client, sent over a link, and deserialized by the server
//! (or the other way around).

use serde::{Deserialize, Serialize};

use std::fmt;

/// The protocol version presented in every handshake. Servers reject
/// clients that speak a different version.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier of a user on the platform.
///
/// This is a "newtype wrapper" around the server-issued string id. Wrapping
/// it means a `RoomId` can never be passed where a `UserId` is expected,
/// even though both are strings underneath.
///
/// `#[serde(transparent)]` serializes `UserId("u1")` as just `"u1"`, not as
/// `{ "0": "u1" }`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a `UserId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a logical room (a chat thread, a live session, ...).
///
/// The client never caches room contents; it only remembers which room ids
/// it asked to join.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Creates a `RoomId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room:{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// SystemMessage: channel-level messages
// ---------------------------------------------------------------------------

/// Messages used by the channel itself (not application payloads).
///
/// These handle the plumbing: the authenticated handshake, presence,
/// room membership intents, liveness, and orderly shutdown.
///
/// `#[serde(tag = "type")]` produces "internally tagged" JSON:
///   `{ "type": "JoinRoom", "room_id": "lobby" }`
/// instead of `{ "JoinRoom": { "room_id": "lobby" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    // -- Connection lifecycle --
    /// Client → Server: "Hello, this is who I am."
    ///
    /// `user_id` is the identity presented for this transport generation.
    /// `token` is the stored credential, when one exists.
    Handshake {
        version: u32,
        user_id: UserId,
        token: Option<String>,
    },

    /// Server → Client: "You're connected." This is the accept event that
    /// moves a connection from `Connecting` to `Open`.
    HandshakeAck { user_id: UserId, server_time: u64 },

    /// Either direction: "I'm ending this session."
    Disconnect { reason: String },

    // -- Presence --
    /// Server → Client: the full list of users currently online.
    ///
    /// Always a replacement snapshot, never a diff.
    Presence { users: Vec<UserId> },

    // -- Room membership --
    /// Client → Server: "Subscribe me to this room."
    JoinRoom { room_id: RoomId },

    /// Client → Server: "Unsubscribe me from this room."
    LeaveRoom { room_id: RoomId },

    // -- Heartbeat (keep-alive) --
    /// Client → Server: "I'm still here."
    Heartbeat { client_time: u64 },

    /// Server → Client: echo of a heartbeat.
    HeartbeatAck { client_time: u64, server_time: u64 },

    // -- Errors --
    /// Server → Client: "Something went wrong."
    /// `code` follows HTTP-style conventions (401 = unauthorized, ...).
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Frame: the top-level wire format
// ---------------------------------------------------------------------------

/// One message on the wire: either channel plumbing or application data.
///
/// `#[serde(tag = "type", content = "data")]` produces "adjacently tagged"
/// JSON:
///   `{ "type": "System", "data": { "type": "Heartbeat", "client_time": 1 } }`
///   `{ "type": "App", "data": [104, 105] }`
///
/// The reader checks the outer tag first: system frames drive the
/// connection state machine, app frames are handed to subscribers as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Frame {
    /// A channel-level message (handshake, presence, rooms, heartbeat).
    System(SystemMessage),

    /// Application data, opaque to this crate.
    App(Vec<u8>),
}

impl Frame {
    /// Builds the handshake frame for the given identity.
    pub fn handshake(user_id: UserId, token: Option<String>) -> Self {
        Frame::System(SystemMessage::Handshake {
            version: PROTOCOL_VERSION,
            user_id,
            token,
        })
    }
}

impl From<SystemMessage> for Frame {
    fn from(msg: SystemMessage) -> Self {
        Frame::System(msg)
    }
}

// =========================================================================
// Tests
// =========================================================================
