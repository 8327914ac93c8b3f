//! Realtime connection management for Pulse.
//!
//! One actor task owns the channel to the server and everything derived
//! from it: connection status, who is online, and which rooms this client
//! asked to join. The rest of the application talks to it through a cheap,
//! cloneable [`RealtimeClient`] handle and observes it through a `watch`
//! channel of [`ConnectionView`].
//!
//! # Key types
//!
//! - [`Connection`]: the pure state machine (no I/O), one dispatch function
//! - [`ConnectionStatus`]: `Idle → Connecting → Open → …`
//! - [`RealtimeClient`]: send commands to the running actor
//! - [`PresenceSet`] / [`RoomMembership`]: the derived sets
//! - [`RealtimeConfig`]: handshake timeout, heartbeat, idle detection
//!
//! # Event ordering
//!
//! Every dial starts a new transport [`Generation`]. Events are tagged
//! with the generation of the link that produced them, and the state
//! machine drops anything not from the current one. A torn-down link can
//! therefore never touch the state of its successor.

mod client;
mod config;
mod connection;
mod error;
mod link;
mod presence;
mod rooms;

pub use client::{Delivery, RealtimeClient};
pub use config::RealtimeConfig;
pub use connection::{
    CloseReason, ConnectPlan, Connection, ConnectionStatus, ConnectionView,
    Dispatch, Generation, LinkEvent, Outbound,
};
pub use error::RealtimeError;
pub use presence::PresenceSet;
pub use rooms::RoomMembership;
