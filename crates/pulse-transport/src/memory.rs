//! In-memory transport: a connector whose "server" lives in the same
//! process.
//!
//! [`channel()`] returns a [`MemoryConnector`] (handed to the client) and a
//! [`MemoryServer`] (kept by the test or embedder). Every successful
//! `connect()` produces a [`MemoryLink`] on the client side and a
//! [`MemoryPeer`] that the server side picks up with
//! [`MemoryServer::accept`].
//!
//! ```text
//!  MemoryConnector ──connect()──→ MemoryLink  ⇄  MemoryPeer ←──accept()── MemoryServer
//! ```
//!
//! The peer can read what the client sent, push bytes, close the link, or
//! inject a transport failure. Nothing here touches the network, so tests
//! built on it are deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::{Connector, Link, LinkId, TransportError};

/// What the peer pushes towards the client: bytes, or a simulated
/// transport failure carrying a reason.
type Inbound = Result<Vec<u8>, String>;

/// Creates a connected connector/server pair.
pub fn channel() -> (MemoryConnector, MemoryServer) {
    let (accept_tx, accept_rx) = mpsc::unbounded_channel();
    let refusing = Arc::new(AtomicBool::new(false));
    (
        MemoryConnector {
            accepts: accept_tx,
            refusing: Arc::clone(&refusing),
        },
        MemoryServer {
            accepts: accept_rx,
            refusing,
        },
    )
}

// ---------------------------------------------------------------------------
// Client side
// ---------------------------------------------------------------------------

/// Client half: dials the paired [`MemoryServer`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    accepts: mpsc::UnboundedSender<MemoryPeer>,
    refusing: Arc<AtomicBool>,
}

impl Connector for MemoryConnector {
    type Link = MemoryLink;

    async fn connect(&self) -> Result<Self::Link, TransportError> {
        if self.refusing.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed(
                "connection refused".into(),
            ));
        }

        let id = LinkId::next();
        let (to_peer, from_client) = mpsc::unbounded_channel();
        let (to_client, from_peer) = mpsc::unbounded_channel();

        let peer = MemoryPeer {
            id,
            to_client,
            from_client,
        };
        self.accepts.send(peer).map_err(|_| {
            TransportError::ConnectFailed("memory server dropped".into())
        })?;

        tracing::debug!(%id, "memory link established");
        Ok(MemoryLink {
            id,
            outbound: Mutex::new(Some(to_peer)),
            inbound: Mutex::new(from_peer),
        })
    }
}

/// Client end of an in-memory link.
#[derive(Debug)]
pub struct MemoryLink {
    id: LinkId,
    /// `None` once the client closed the link.
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    inbound: Mutex<mpsc::UnboundedReceiver<Inbound>>,
}

impl Link for MemoryLink {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        match self.outbound.lock().await.as_ref() {
            Some(tx) => tx.send(data.to_vec()).map_err(|_| {
                TransportError::ConnectionClosed("peer dropped".into())
            }),
            None => Err(TransportError::ConnectionClosed(
                "link closed locally".into(),
            )),
        }
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.inbound.lock().await.recv().await {
            Some(Ok(data)) => Ok(Some(data)),
            Some(Err(reason)) => Err(TransportError::ReceiveFailed(
                std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    reason,
                ),
            )),
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        // Dropping the sender is what the peer observes as a close.
        self.outbound.lock().await.take();
        Ok(())
    }

    fn id(&self) -> LinkId {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Server side
// ---------------------------------------------------------------------------

/// Server half: receives a [`MemoryPeer`] for every client dial.
#[derive(Debug)]
pub struct MemoryServer {
    accepts: mpsc::UnboundedReceiver<MemoryPeer>,
    refusing: Arc<AtomicBool>,
}

impl MemoryServer {
    /// Waits for the next client dial.
    ///
    /// Returns `None` once every connector clone has been dropped.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accepts.recv().await
    }

    /// Returns a pending dial without waiting.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.accepts.try_recv().ok()
    }

    /// When `true`, subsequent dials fail with
    /// [`TransportError::ConnectFailed`].
    pub fn refuse_connections(&self, refuse: bool) {
        self.refusing.store(refuse, Ordering::SeqCst);
    }
}

/// Server end of one in-memory link.
#[derive(Debug)]
pub struct MemoryPeer {
    id: LinkId,
    to_client: mpsc::UnboundedSender<Inbound>,
    from_client: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryPeer {
    /// The id shared with the client's [`MemoryLink`].
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Pushes bytes to the client. Returns `false` if the client end is
    /// gone.
    pub fn send(&self, data: &[u8]) -> bool {
        self.to_client.send(Ok(data.to_vec())).is_ok()
    }

    /// Makes the client's next `recv` fail with a transport error.
    pub fn fail(&self, reason: &str) -> bool {
        self.to_client.send(Err(reason.to_string())).is_ok()
    }

    /// Waits for the next bytes the client sent. `None` means the client
    /// closed (or dropped) its link.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.from_client.recv().await
    }

    /// Returns already-sent client bytes without waiting.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.from_client.try_recv().ok()
    }

    /// Closes the link from the server side; the client's `recv` returns
    /// `Ok(None)`.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_delivers_peer_with_same_id() {
        let (connector, mut server) = channel();
        let link = connector.connect().await.expect("should connect");
        let peer = server.accept().await.expect("should accept");
        assert_eq!(link.id(), peer.id());
    }

    #[tokio::test]
    async fn test_bytes_flow_both_ways() {
        let (connector, mut server) = channel();
        let link = connector.connect().await.unwrap();
        let mut peer = server.accept().await.unwrap();

        link.send(b"ping").await.unwrap();
        assert_eq!(peer.recv().await.unwrap(), b"ping");

        assert!(peer.send(b"pong"));
        assert_eq!(link.recv().await.unwrap().unwrap(), b"pong");
    }

    #[tokio::test]
    async fn test_refusing_server_fails_connect() {
        let (connector, server) = channel();
        server.refuse_connections(true);

        let result = connector.connect().await;
        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
    }

    #[tokio::test]
    async fn test_peer_close_yields_clean_none() {
        let (connector, mut server) = channel();
        let link = connector.connect().await.unwrap();
        server.accept().await.unwrap().close();

        assert!(link.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_peer_fail_yields_receive_error() {
        let (connector, mut server) = channel();
        let link = connector.connect().await.unwrap();
        let peer = server.accept().await.unwrap();
        peer.fail("reset by peer");

        let result = link.recv().await;
        assert!(matches!(result, Err(TransportError::ReceiveFailed(_))));
    }

    #[tokio::test]
    async fn test_local_close_is_seen_by_peer_and_blocks_send() {
        let (connector, mut server) = channel();
        let link = connector.connect().await.unwrap();
        let mut peer = server.accept().await.unwrap();

        link.close().await.unwrap();
        assert!(peer.recv().await.is_none());
        assert!(matches!(
            link.send(b"late").await,
            Err(TransportError::ConnectionClosed(_))
        ));
    }
}
