//! Connection state machine.
//!
//! [`Connection`] owns the status, the current link handle, and the sets
//! derived from the channel. It performs no I/O: callers feed it commands
//! (`connect`, `route`, `begin_disconnect`) and tagged link events
//! (`dispatch`), and it tells them which links to close and what to
//! deliver. The actor in `client.rs` does the actual networking.
//!
//! ```text
//!            connect                 accept
//!   Idle ─────────────→ Connecting ─────────→ Open
//!    ↑  ↖                   │                  │ │
//!    │    └── peer close ───┼──────────────────┘ │
//!    │                      │ error / timeout    │ error
//!    │                      ▼                    │
//!    │                 ClosedError ←─────────────┘
//!    │                                           │ disconnect()
//!    └──────────────────── Closing ←─────────────┘
//! ```
//!
//! There is no automatic reconnection. `ClosedError` and `Idle` stay put
//! until the application calls `connect` again.

use std::fmt;

use pulse_protocol::{Frame, RoomId, SystemMessage, UserId};
use serde::{Deserialize, Serialize};

use crate::{PresenceSet, RoomMembership};

// ---------------------------------------------------------------------------
// ConnectionStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of the realtime channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStatus {
    /// No channel. Initial state, and where orderly closes end up.
    #[default]
    Idle,
    /// Dialing and handshaking; not yet accepted by the server.
    Connecting,
    /// Accepted. Outbound traffic and presence are live.
    Open,
    /// A local disconnect is closing the link.
    Closing,
    /// The last attempt failed (transport error, handshake timeout or
    /// rejection).
    ClosedError,
}

impl ConnectionStatus {
    /// Returns `true` only for `Open`.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` while a connection is being established or is up.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::ClosedError => write!(f, "closed-error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Tag of one transport generation.
///
/// Bumped every time a connection is retired, so events from a link that
/// has been torn down never match the current generation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CloseReason
// ---------------------------------------------------------------------------

/// Why an open channel ended without an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// This client called `disconnect`.
    ClientDisconnect,
    /// The server sent a `Disconnect` frame.
    ServerDisconnect { reason: String },
    /// The link closed cleanly without either side saying goodbye.
    TransportClosed,
}

impl CloseReason {
    /// Whether one of the peers deliberately ended the session.
    pub fn is_intentional(&self) -> bool {
        matches!(self, Self::ClientDisconnect | Self::ServerDisconnect { .. })
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientDisconnect => write!(f, "client disconnect"),
            Self::ServerDisconnect { reason } => {
                write!(f, "server disconnect: {reason}")
            }
            Self::TransportClosed => write!(f, "transport closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Events, plans, and outcomes
// ---------------------------------------------------------------------------

/// Everything a link can report. `L` is the link handle type.
#[derive(Debug)]
pub enum LinkEvent<L> {
    /// The server accepted the handshake; here is the live link.
    Accepted(L),
    /// The channel ended without an error.
    Closed(CloseReason),
    /// The link failed (I/O error, handshake timeout or rejection, idle).
    Failed(String),
    /// A full presence snapshot.
    Presence(Vec<UserId>),
    /// An application payload.
    App(Vec<u8>),
}

impl<L> LinkEvent<L> {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Accepted(_) => "accepted",
            Self::Closed(_) => "closed",
            Self::Failed(_) => "failed",
            Self::Presence(_) => "presence",
            Self::App(_) => "app",
        }
    }

    /// The link carried by an `Accepted` event, so it can be closed when
    /// the event is dropped.
    fn into_link(self) -> Option<L> {
        match self {
            Self::Accepted(link) => Some(link),
            _ => None,
        }
    }
}

/// What [`Connection::connect`] decided.
#[derive(Debug)]
pub enum ConnectPlan<L> {
    /// Already connecting/open for this identity. Nothing to do.
    AlreadyActive,
    /// Dial a new link for `generation`; close `superseded` first.
    Dial {
        generation: Generation,
        superseded: Option<L>,
    },
}

/// What [`Connection::dispatch`] did with an event.
#[derive(Debug)]
pub enum Dispatch<L> {
    /// Observable state changed.
    Applied,
    /// Hand this application payload to subscribers.
    Deliver(Vec<u8>),
    /// The connection left `Connecting`/`Open`; close this link.
    Retired(Option<L>),
    /// The event was stale or invalid for the current status. Any link it
    /// carried must be closed.
    Ignored(Option<L>),
}

/// Outbound intents. All are dropped unless the connection is `Open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Message(Vec<u8>),
    JoinRoom(RoomId),
    LeaveRoom(RoomId),
}

impl Outbound {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::JoinRoom(_) => "join-room",
            Self::LeaveRoom(_) => "leave-room",
        }
    }

    /// The wire frame for this intent.
    pub fn into_frame(self) -> Frame {
        match self {
            Self::Message(payload) => Frame::App(payload),
            Self::JoinRoom(room_id) => {
                Frame::System(SystemMessage::JoinRoom { room_id })
            }
            Self::LeaveRoom(room_id) => {
                Frame::System(SystemMessage::LeaveRoom { room_id })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionView
// ---------------------------------------------------------------------------

/// Snapshot published to observers after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionView {
    pub status: ConnectionStatus,
    pub generation: Generation,
    /// Identity presented in the current (or last) handshake.
    pub identity: Option<UserId>,
    pub online_users: Vec<UserId>,
    pub joined_rooms: Vec<RoomId>,
    /// How the last open channel ended, for diagnostics.
    pub last_close: Option<CloseReason>,
    /// Why the last attempt failed, for diagnostics.
    pub last_error: Option<String>,
}

impl ConnectionView {
    pub fn is_connected(&self) -> bool {
        self.status.is_open()
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// The connection state machine. `L` is the link handle type (an
/// `Arc<Link>` in the actor, anything in tests).
#[derive(Debug)]
pub struct Connection<L> {
    status: ConnectionStatus,
    generation: Generation,
    identity: Option<UserId>,
    link: Option<L>,
    presence: PresenceSet,
    rooms: RoomMembership,
    last_close: Option<CloseReason>,
    last_error: Option<String>,
}

impl<L> Default for Connection<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> Connection<L> {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Idle,
            generation: Generation::default(),
            identity: None,
            link: None,
            presence: PresenceSet::new(),
            rooms: RoomMembership::new(),
            last_close: None,
            last_error: None,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    pub fn presence(&self) -> &PresenceSet {
        &self.presence
    }

    pub fn rooms(&self) -> &RoomMembership {
        &self.rooms
    }

    /// The live link, present only while `Open`.
    pub fn link(&self) -> Option<&L> {
        self.link.as_ref()
    }

    /// Starts a connection for `user_id`.
    ///
    /// A no-op if already connecting or open for the same identity.
    /// Otherwise the current connection (if any) is retired and the status
    /// becomes `Connecting` before this returns.
    pub fn connect(&mut self, user_id: UserId) -> ConnectPlan<L> {
        if self.status.is_live() && self.identity.as_ref() == Some(&user_id) {
            tracing::debug!(%user_id, status = %self.status, "already active");
            return ConnectPlan::AlreadyActive;
        }

        let superseded = self.retire();
        self.identity = Some(user_id);
        self.status = ConnectionStatus::Connecting;
        self.last_error = None;

        ConnectPlan::Dial {
            generation: self.generation,
            superseded,
        }
    }

    /// First half of a local disconnect. Safe from any state.
    ///
    /// Retires the connection and clears the derived sets. Returns the link
    /// to close; while it is closing the status reads `Closing`.
    pub fn begin_disconnect(&mut self) -> Option<L> {
        let was_live = self.status.is_live();
        let link = self.retire();
        self.identity = None;

        if was_live {
            self.last_close = Some(CloseReason::ClientDisconnect);
        }
        self.status = if link.is_some() {
            ConnectionStatus::Closing
        } else {
            ConnectionStatus::Idle
        };
        link
    }

    /// Second half of a local disconnect: always lands in `Idle`.
    pub fn finish_disconnect(&mut self) {
        self.status = ConnectionStatus::Idle;
    }

    /// Applies one tagged link event. This is the only place link events
    /// change state.
    pub fn dispatch(
        &mut self,
        generation: Generation,
        event: LinkEvent<L>,
    ) -> Dispatch<L> {
        if generation != self.generation {
            tracing::debug!(
                %generation,
                current = %self.generation,
                event = event.kind(),
                "dropping event from superseded transport"
            );
            return Dispatch::Ignored(event.into_link());
        }

        use ConnectionStatus::{Connecting, Open};

        match (self.status, event) {
            (Connecting, LinkEvent::Accepted(link)) => {
                self.status = Open;
                self.link = Some(link);
                self.presence.clear();
                tracing::info!(
                    %generation,
                    identity = ?self.identity,
                    "connection open"
                );
                Dispatch::Applied
            }

            (Connecting | Open, LinkEvent::Failed(error)) => {
                tracing::warn!(%generation, %error, "connection failed");
                let link = self.retire();
                self.status = ConnectionStatus::ClosedError;
                self.last_error = Some(error);
                Dispatch::Retired(link)
            }

            (Open, LinkEvent::Closed(reason)) => {
                tracing::info!(
                    %generation,
                    %reason,
                    intentional = reason.is_intentional(),
                    "connection closed by peer"
                );
                let link = self.retire();
                self.status = ConnectionStatus::Idle;
                self.last_close = Some(reason);
                Dispatch::Retired(link)
            }

            // A close before the accept means the handshake never finished.
            (Connecting, LinkEvent::Closed(reason)) => {
                tracing::warn!(%generation, %reason, "closed during handshake");
                let link = self.retire();
                self.status = ConnectionStatus::ClosedError;
                self.last_error = Some(format!("closed during handshake: {reason}"));
                self.last_close = Some(reason);
                Dispatch::Retired(link)
            }

            (Open, LinkEvent::Presence(users)) => {
                self.presence.replace(users);
                Dispatch::Applied
            }

            (Open, LinkEvent::App(payload)) => Dispatch::Deliver(payload),

            (status, event) => {
                tracing::debug!(
                    %generation,
                    %status,
                    event = event.kind(),
                    "ignoring event for current status"
                );
                Dispatch::Ignored(event.into_link())
            }
        }
    }

    /// Routes an outbound intent.
    ///
    /// Returns the link to send on, or `None` (drop silently) when not
    /// `Open`. Room intents update the requested membership as soon as
    /// they are routed; the server never confirms them.
    pub fn route(&mut self, outbound: &Outbound) -> Option<&L> {
        if !self.status.is_open() {
            return None;
        }
        match outbound {
            Outbound::JoinRoom(room) => {
                self.rooms.join(room.clone());
            }
            Outbound::LeaveRoom(room) => {
                self.rooms.leave(room);
            }
            Outbound::Message(_) => {}
        }
        self.link.as_ref()
    }

    pub fn view(&self) -> ConnectionView {
        ConnectionView {
            status: self.status,
            generation: self.generation,
            identity: self.identity.clone(),
            online_users: self.presence.members().to_vec(),
            joined_rooms: self.rooms.iter().cloned().collect(),
            last_close: self.last_close.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Ends the current generation: takes the link, clears the derived
    /// sets, and bumps the generation so trailing events are stale.
    fn retire(&mut self) -> Option<L> {
        self.generation = self.generation.next();
        self.presence.clear();
        self.rooms.clear();
        self.link.take()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! State machine tests. The link handle is a plain `u32`, so a
    //! returned `Some(7)` means "the actor must close link 7".

    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    fn users(ids: &[&str]) -> Vec<UserId> {
        ids.iter().map(|id| UserId::new(*id)).collect()
    }

    /// Connects `u1` and accepts with link `1`. Returns the generation.
    fn open(conn: &mut Connection<u32>) -> Generation {
        let ConnectPlan::Dial { generation, .. } = conn.connect(user("u1"))
        else {
            panic!("expected a dial");
        };
        assert!(matches!(
            conn.dispatch(generation, LinkEvent::Accepted(1)),
            Dispatch::Applied
        ));
        generation
    }

    // =====================================================================
    // connect()
    // =====================================================================

    #[test]
    fn test_connect_from_idle_sets_connecting_immediately() {
        let mut conn = Connection::<u32>::new();
        assert_eq!(conn.status(), ConnectionStatus::Idle);

        let plan = conn.connect(user("u1"));

        assert!(matches!(plan, ConnectPlan::Dial { superseded: None, .. }));
        assert_eq!(conn.status(), ConnectionStatus::Connecting);
        assert_eq!(conn.identity(), Some(&user("u1")));
    }

    #[test]
    fn test_connect_same_identity_while_open_is_noop() {
        let mut conn = Connection::<u32>::new();
        let generation = open(&mut conn);

        assert!(matches!(conn.connect(user("u1")), ConnectPlan::AlreadyActive));
        assert_eq!(conn.generation(), generation);
        assert_eq!(conn.status(), ConnectionStatus::Open);
    }

    #[test]
    fn test_connect_same_identity_while_connecting_is_noop() {
        let mut conn = Connection::<u32>::new();
        conn.connect(user("u1"));
        assert!(matches!(conn.connect(user("u1")), ConnectPlan::AlreadyActive));
    }

    #[test]
    fn test_connect_other_identity_while_open_supersedes_link() {
        let mut conn = Connection::<u32>::new();
        let old = open(&mut conn);

        let plan = conn.connect(user("u2"));

        let ConnectPlan::Dial { generation, superseded } = plan else {
            panic!("expected a dial");
        };
        assert_eq!(superseded, Some(1), "old link must be closed");
        assert!(generation > old);
        assert_eq!(conn.status(), ConnectionStatus::Connecting);
        assert!(conn.link().is_none());
    }

    #[test]
    fn test_connect_after_error_dials_again() {
        let mut conn = Connection::<u32>::new();
        let generation = open(&mut conn);
        conn.dispatch(generation, LinkEvent::Failed("reset".into()));

        assert!(matches!(conn.connect(user("u1")), ConnectPlan::Dial { .. }));
        assert_eq!(conn.status(), ConnectionStatus::Connecting);
        assert!(conn.view().last_error.is_none());
    }

    // =====================================================================
    // dispatch(): transition table
    // =====================================================================

    #[test]
    fn test_accept_while_connecting_opens_and_clears_presence() {
        let mut conn = Connection::<u32>::new();
        open(&mut conn);
        assert_eq!(conn.status(), ConnectionStatus::Open);
        assert!(conn.presence().is_empty());
        assert_eq!(conn.link(), Some(&1));
    }

    #[test]
    fn test_failure_while_open_goes_closed_error_and_clears_sets() {
        let mut conn = Connection::<u32>::new();
        let generation = open(&mut conn);
        conn.dispatch(generation, LinkEvent::Presence(users(&["u1", "u2"])));
        conn.route(&Outbound::JoinRoom(RoomId::new("lobby")));

        let outcome =
            conn.dispatch(generation, LinkEvent::Failed("reset".into()));

        assert!(matches!(outcome, Dispatch::Retired(Some(1))));
        assert_eq!(conn.status(), ConnectionStatus::ClosedError);
        assert!(conn.presence().is_empty());
        assert!(conn.rooms().is_empty());
        assert_eq!(conn.view().last_error.as_deref(), Some("reset"));
    }

    #[test]
    fn test_failure_while_connecting_goes_closed_error() {
        let mut conn = Connection::<u32>::new();
        let ConnectPlan::Dial { generation, .. } = conn.connect(user("u1"))
        else {
            panic!("expected a dial");
        };

        let outcome = conn
            .dispatch(generation, LinkEvent::Failed("handshake timed out".into()));

        assert!(matches!(outcome, Dispatch::Retired(None)));
        assert_eq!(conn.status(), ConnectionStatus::ClosedError);
    }

    #[test]
    fn test_peer_close_while_open_goes_idle_for_every_reason() {
        let reasons = [
            CloseReason::ServerDisconnect {
                reason: "kicked".into(),
            },
            CloseReason::TransportClosed,
        ];
        for reason in reasons {
            let mut conn = Connection::<u32>::new();
            let generation = open(&mut conn);

            let outcome =
                conn.dispatch(generation, LinkEvent::Closed(reason.clone()));

            assert!(matches!(outcome, Dispatch::Retired(Some(1))));
            assert_eq!(conn.status(), ConnectionStatus::Idle);
            assert!(conn.link().is_none());
            assert_eq!(conn.view().last_close, Some(reason));
        }
    }

    #[test]
    fn test_close_while_connecting_is_a_handshake_failure() {
        let mut conn = Connection::<u32>::new();
        let ConnectPlan::Dial { generation, .. } = conn.connect(user("u1"))
        else {
            panic!("expected a dial");
        };

        conn.dispatch(generation, LinkEvent::Closed(CloseReason::TransportClosed));

        assert_eq!(conn.status(), ConnectionStatus::ClosedError);
    }

    #[test]
    fn test_presence_snapshot_replaces_wholesale() {
        let mut conn = Connection::<u32>::new();
        let generation = open(&mut conn);

        conn.dispatch(generation, LinkEvent::Presence(users(&["u1", "u2"])));
        assert_eq!(conn.view().online_users, users(&["u1", "u2"]));

        conn.dispatch(generation, LinkEvent::Presence(users(&["u3"])));
        assert_eq!(conn.view().online_users, users(&["u3"]));
    }

    #[test]
    fn test_presence_while_connecting_is_discarded() {
        let mut conn = Connection::<u32>::new();
        let ConnectPlan::Dial { generation, .. } = conn.connect(user("u1"))
        else {
            panic!("expected a dial");
        };

        let outcome =
            conn.dispatch(generation, LinkEvent::Presence(users(&["u9"])));

        assert!(matches!(outcome, Dispatch::Ignored(None)));
        assert!(conn.presence().is_empty());
    }

    #[test]
    fn test_app_payload_delivered_only_while_open() {
        let mut conn = Connection::<u32>::new();
        let generation = open(&mut conn);
        assert!(matches!(
            conn.dispatch(generation, LinkEvent::App(b"hi".to_vec())),
            Dispatch::Deliver(ref p) if p == b"hi"
        ));
    }

    // =====================================================================
    // dispatch(): transport generations
    // =====================================================================

    #[test]
    fn test_events_from_superseded_generation_are_ignored() {
        let mut conn = Connection::<u32>::new();
        let old = open(&mut conn);
        let ConnectPlan::Dial { generation, .. } = conn.connect(user("u2"))
        else {
            panic!("expected a dial");
        };
        conn.dispatch(generation, LinkEvent::Accepted(2));

        // Trailing events from the old link arrive late.
        conn.dispatch(old, LinkEvent::Presence(users(&["ghost"])));
        conn.dispatch(old, LinkEvent::Failed("late reset".into()));

        assert_eq!(conn.status(), ConnectionStatus::Open);
        assert!(conn.presence().is_empty());
        assert_eq!(conn.link(), Some(&2));
    }

    #[test]
    fn test_stale_accept_returns_link_for_closing() {
        let mut conn = Connection::<u32>::new();
        let ConnectPlan::Dial { generation: first, .. } =
            conn.connect(user("u1"))
        else {
            panic!("expected a dial");
        };
        conn.connect(user("u2"));

        let outcome = conn.dispatch(first, LinkEvent::Accepted(1));

        assert!(matches!(outcome, Dispatch::Ignored(Some(1))));
        assert_eq!(conn.status(), ConnectionStatus::Connecting);
        assert_eq!(conn.identity(), Some(&user("u2")));
    }

    #[test]
    fn test_events_after_failure_are_stale() {
        let mut conn = Connection::<u32>::new();
        let generation = open(&mut conn);
        conn.dispatch(generation, LinkEvent::Failed("reset".into()));

        let outcome = conn
            .dispatch(generation, LinkEvent::Closed(CloseReason::TransportClosed));

        assert!(matches!(outcome, Dispatch::Ignored(None)));
        assert_eq!(conn.status(), ConnectionStatus::ClosedError);
    }

    // =====================================================================
    // route()
    // =====================================================================

    #[test]
    fn test_route_when_not_open_drops_and_keeps_rooms() {
        let mut conn = Connection::<u32>::new();
        assert!(conn.route(&Outbound::Message(b"x".to_vec())).is_none());
        assert!(conn.route(&Outbound::JoinRoom(RoomId::new("a"))).is_none());
        assert!(conn.rooms().is_empty());

        conn.connect(user("u1"));
        assert!(conn.route(&Outbound::JoinRoom(RoomId::new("a"))).is_none());
        assert!(conn.rooms().is_empty());
    }

    #[test]
    fn test_route_room_intents_update_membership_optimistically() {
        let mut conn = Connection::<u32>::new();
        open(&mut conn);

        assert_eq!(conn.route(&Outbound::JoinRoom(RoomId::new("a"))), Some(&1));
        conn.route(&Outbound::JoinRoom(RoomId::new("b")));
        conn.route(&Outbound::LeaveRoom(RoomId::new("a")));

        assert_eq!(conn.view().joined_rooms, vec![RoomId::new("b")]);
    }

    // =====================================================================
    // begin_disconnect() / finish_disconnect()
    // =====================================================================

    #[test]
    fn test_disconnect_while_open_closes_through_closing() {
        let mut conn = Connection::<u32>::new();
        let generation = open(&mut conn);
        conn.dispatch(generation, LinkEvent::Presence(users(&["u1"])));
        conn.route(&Outbound::JoinRoom(RoomId::new("a")));

        let link = conn.begin_disconnect();
        assert_eq!(link, Some(1));
        assert_eq!(conn.status(), ConnectionStatus::Closing);
        assert!(conn.presence().is_empty());
        assert!(conn.rooms().is_empty());

        conn.finish_disconnect();
        assert_eq!(conn.status(), ConnectionStatus::Idle);
        assert_eq!(conn.view().last_close, Some(CloseReason::ClientDisconnect));
    }

    #[test]
    fn test_disconnect_is_idempotent_from_any_state() {
        let mut conn = Connection::<u32>::new();
        assert!(conn.begin_disconnect().is_none());
        assert_eq!(conn.status(), ConnectionStatus::Idle);

        conn.connect(user("u1"));
        assert!(conn.begin_disconnect().is_none());
        assert_eq!(conn.status(), ConnectionStatus::Idle);
        assert!(conn.begin_disconnect().is_none());
    }

    #[test]
    fn test_disconnect_while_connecting_makes_late_accept_stale() {
        let mut conn = Connection::<u32>::new();
        let ConnectPlan::Dial { generation, .. } = conn.connect(user("u1"))
        else {
            panic!("expected a dial");
        };
        conn.begin_disconnect();
        conn.finish_disconnect();

        let outcome = conn.dispatch(generation, LinkEvent::Accepted(1));

        assert!(matches!(outcome, Dispatch::Ignored(Some(1))));
        assert_eq!(conn.status(), ConnectionStatus::Idle);
    }

    // =====================================================================
    // Small types
    // =====================================================================

    #[test]
    fn test_status_display_uses_kebab_case() {
        assert_eq!(ConnectionStatus::ClosedError.to_string(), "closed-error");
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
        assert!(ConnectionStatus::Open.is_live());
        assert!(!ConnectionStatus::Closing.is_live());
    }

    #[test]
    fn test_close_reason_intentional() {
        assert!(CloseReason::ClientDisconnect.is_intentional());
        assert!(
            CloseReason::ServerDisconnect {
                reason: "bye".into()
            }
            .is_intentional()
        );
        assert!(!CloseReason::TransportClosed.is_intentional());
    }

    #[test]
    fn test_outbound_frames() {
        assert_eq!(
            Outbound::JoinRoom(RoomId::new("a")).into_frame(),
            Frame::System(SystemMessage::JoinRoom {
                room_id: RoomId::new("a")
            })
        );
        assert_eq!(
            Outbound::Message(b"x".to_vec()).into_frame(),
            Frame::App(b"x".to_vec())
        );
    }
}
