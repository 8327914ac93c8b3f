//! Client transport abstraction layer for Pulse.
//!
//! Provides the [`Connector`] and [`Link`] traits that abstract over the
//! byte pipe carrying the realtime channel. A `Connector` dials the server
//! once per transport generation; the resulting `Link` moves bytes until
//! either side closes it.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`
//!
//! The [`memory`] transport is always available; it backs the test suites
//! of the crates above this one.

mod error;
pub mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketLink};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique link IDs across all connectors.
static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for one link (one dialed connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u64);

impl LinkId {
    /// Creates a new `LinkId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique `LinkId`.
    pub fn next() -> Self {
        Self(NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

/// Dials the realtime server.
///
/// The returned futures are `Send` so the connection manager can drive
/// them from a spawned Tokio task.
pub trait Connector: Send + Sync + 'static {
    /// The link type produced by this connector.
    type Link: Link;

    /// Opens a new link to the server.
    fn connect(
        &self,
    ) -> impl Future<Output = Result<Self::Link, TransportError>> + Send;
}

/// A single dialed connection that can send and receive bytes.
pub trait Link: Send + Sync + 'static {
    /// Sends data to the server.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next message from the server.
    ///
    /// Returns `Ok(None)` when the link is cleanly closed. Must be
    /// cancel-safe: dropping the future before it completes loses no data.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the link.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this link.
    fn id(&self) -> LinkId;
}
