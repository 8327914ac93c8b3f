//! Connection actor and its handle.
//!
//! The actor is the single owner of the [`Connection`] state machine. It
//! runs in its own Tokio task and reacts to two inputs: commands from
//! [`RealtimeClient`] handles, and tagged events from the current link
//! task. After every change it publishes a fresh [`ConnectionView`].

use std::sync::Arc;

use pulse_protocol::{Codec, Frame, RoomId, SystemMessage, UserId};
use pulse_session::CredentialStore;
use pulse_transport::{Connector, Link};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::link::{EventReceiver, EventSender, LinkTask};
use crate::{
    ConnectPlan, Connection, ConnectionStatus, ConnectionView, Dispatch,
    Generation, LinkEvent, Outbound, RealtimeConfig, RealtimeError,
};

/// Capacity of the command channel. Senders wait when it is full.
const COMMAND_BUFFER: usize = 64;

/// What happened to an outbound intent.
///
/// Sends are fire-and-forget: `Sent` only means the frame was handed to
/// the transport, not that the server processed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Not open (or the link refused the bytes). Nothing was queued.
    Dropped,
}

/// Commands sent to the connection actor.
enum Command {
    Connect {
        user_id: UserId,
        reply: oneshot::Sender<ConnectionStatus>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Send {
        outbound: Outbound,
        reply: oneshot::Sender<Delivery>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

// ---------------------------------------------------------------------------
// RealtimeClient
// ---------------------------------------------------------------------------

/// A cheap, cloneable handle to the connection actor.
///
/// The actor stops when [`shutdown`](Self::shutdown) is called or when the
/// last handle is dropped. Either way an open link is closed first.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<ConnectionView>,
    payloads: broadcast::Sender<Vec<u8>>,
}

impl RealtimeClient {
    /// Spawns the connection actor and returns a handle to it.
    ///
    /// `credentials` is only read: the stored token (if any) rides along in
    /// every handshake. Must be called inside a Tokio runtime.
    pub fn spawn<C, K>(
        connector: C,
        codec: K,
        credentials: Arc<dyn CredentialStore>,
        config: RealtimeConfig,
    ) -> Self
    where
        C: Connector,
        K: Codec,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ConnectionView::default());
        let (payload_tx, _) = broadcast::channel(config.event_buffer.max(1));

        let actor = ConnectionActor {
            connection: Connection::new(),
            connector: Arc::new(connector),
            codec,
            credentials,
            config,
            commands: command_rx,
            event_tx,
            event_rx,
            task: None,
            view: view_tx,
            payloads: payload_tx.clone(),
        };
        tokio::spawn(actor.run());

        Self {
            commands: command_tx,
            view: view_rx,
            payloads: payload_tx,
        }
    }

    /// Opens the channel for `user_id`.
    ///
    /// Returns once the status is `Connecting` (or, for a no-op, whatever it
    /// already was); the handshake finishes in the background. Calling it
    /// again with the same identity while connecting or open does nothing.
    /// A different identity replaces the current connection.
    pub async fn connect(
        &self,
        user_id: UserId,
    ) -> Result<ConnectionStatus, RealtimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Command::Connect {
            user_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RealtimeError::Unavailable)
    }

    /// Closes the channel and returns to `Idle`. Safe from any state.
    pub async fn disconnect(&self) -> Result<(), RealtimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Command::Disconnect { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RealtimeError::Unavailable)
    }

    /// Sends an application payload. Dropped unless open.
    pub async fn send_message(
        &self,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Delivery, RealtimeError> {
        self.send(Outbound::Message(payload.into())).await
    }

    /// Asks the server to subscribe this client to `room_id` and records
    /// the room as joined. Dropped unless open.
    pub async fn join_room(
        &self,
        room_id: RoomId,
    ) -> Result<Delivery, RealtimeError> {
        self.send(Outbound::JoinRoom(room_id)).await
    }

    /// The inverse of [`join_room`](Self::join_room).
    pub async fn leave_room(
        &self,
        room_id: RoomId,
    ) -> Result<Delivery, RealtimeError> {
        self.send(Outbound::LeaveRoom(room_id)).await
    }

    /// Disconnects and stops the actor. Every handle becomes unavailable.
    pub async fn shutdown(&self) -> Result<(), RealtimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Command::Shutdown { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RealtimeError::Unavailable)
    }

    /// A receiver that sees every published [`ConnectionView`].
    pub fn subscribe(&self) -> watch::Receiver<ConnectionView> {
        self.view.clone()
    }

    /// A receiver for application payloads from the server.
    pub fn events(&self) -> broadcast::Receiver<Vec<u8>> {
        self.payloads.subscribe()
    }

    pub fn view(&self) -> ConnectionView {
        self.view.borrow().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.view.borrow().status
    }

    pub fn is_connected(&self) -> bool {
        self.view.borrow().is_connected()
    }

    pub fn online_users(&self) -> Vec<UserId> {
        self.view.borrow().online_users.clone()
    }

    pub fn joined_rooms(&self) -> Vec<RoomId> {
        self.view.borrow().joined_rooms.clone()
    }

    /// Waits until the published view satisfies `predicate`.
    ///
    /// # Errors
    /// `RealtimeError::Unavailable` if the actor stops first.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ConnectionView) -> bool,
    ) -> Result<ConnectionView, RealtimeError> {
        let mut view = self.view.clone();
        let seen = view
            .wait_for(predicate)
            .await
            .map_err(|_| RealtimeError::Unavailable)?;
        Ok(seen.clone())
    }

    async fn send(&self, outbound: Outbound) -> Result<Delivery, RealtimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Command::Send {
            outbound,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RealtimeError::Unavailable)
    }

    async fn request(&self, command: Command) -> Result<(), RealtimeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RealtimeError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// ConnectionActor
// ---------------------------------------------------------------------------

struct ConnectionActor<C: Connector, K: Codec> {
    connection: Connection<Arc<C::Link>>,
    connector: Arc<C>,
    codec: K,
    credentials: Arc<dyn CredentialStore>,
    config: RealtimeConfig,
    commands: mpsc::Receiver<Command>,
    event_tx: EventSender<C::Link>,
    event_rx: EventReceiver<C::Link>,
    /// The link task of the current generation.
    task: Option<JoinHandle<()>>,
    view: watch::Sender<ConnectionView>,
    payloads: broadcast::Sender<Vec<u8>>,
}

impl<C: Connector, K: Codec> ConnectionActor<C, K> {
    async fn run(mut self) {
        tracing::debug!("connection actor started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.disconnect().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        // Every handle is gone.
                        self.disconnect().await;
                        break;
                    }
                },
                Some((generation, event)) = self.event_rx.recv() => {
                    self.handle_event(generation, event).await;
                }
            }
        }

        tracing::debug!("connection actor stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { user_id, reply } => {
                self.connect(user_id).await;
                let _ = reply.send(self.connection.status());
            }
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::Send { outbound, reply } => {
                let delivery = self.send(outbound).await;
                let _ = reply.send(delivery);
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    async fn connect(&mut self, user_id: UserId) {
        let ConnectPlan::Dial {
            generation,
            superseded,
        } = self.connection.connect(user_id.clone())
        else {
            return;
        };

        self.stop_task();
        self.publish();
        if let Some(link) = superseded {
            self.close_link(link, Some("superseded")).await;
        }

        let token = match self.credentials.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored credential");
                None
            }
        };

        tracing::info!(%generation, %user_id, "connecting");
        let task = LinkTask {
            generation,
            user_id,
            token,
            connector: Arc::clone(&self.connector),
            codec: self.codec.clone(),
            config: self.config.clone(),
            events: self.event_tx.clone(),
        };
        self.task = Some(task.spawn());
    }

    async fn disconnect(&mut self) {
        let link = self.connection.begin_disconnect();
        self.stop_task();
        self.publish();

        if let Some(link) = link {
            self.close_link(link, Some("client disconnect")).await;
        }

        self.connection.finish_disconnect();
        self.publish();
    }

    async fn send(&mut self, outbound: Outbound) -> Delivery {
        let kind = outbound.kind();
        let Some(link) = self.connection.route(&outbound).cloned() else {
            tracing::debug!(
                kind,
                status = %self.connection.status(),
                "dropping outbound, connection not open"
            );
            return Delivery::Dropped;
        };
        self.publish();

        let sent = match self.codec.encode(&outbound.into_frame()) {
            Ok(bytes) => link.send(&bytes).await.map_err(RealtimeError::from),
            Err(e) => Err(RealtimeError::from(e)),
        };
        match sent {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                // The link task notices a dead link on its own.
                tracing::debug!(kind, error = %e, "outbound send failed");
                Delivery::Dropped
            }
        }
    }

    async fn handle_event(
        &mut self,
        generation: Generation,
        event: LinkEvent<Arc<C::Link>>,
    ) {
        match self.connection.dispatch(generation, event) {
            Dispatch::Applied => {}
            Dispatch::Deliver(payload) => {
                // No subscribers is fine.
                let _ = self.payloads.send(payload);
            }
            Dispatch::Retired(link) => {
                self.stop_task();
                if let Some(link) = link {
                    self.close_link(link, None).await;
                }
            }
            Dispatch::Ignored(link) => {
                if let Some(link) = link {
                    self.close_link(link, None).await;
                }
            }
        }
        self.publish();
    }

    /// Closes a link within `close_timeout`, optionally saying goodbye
    /// first.
    async fn close_link(&self, link: Arc<C::Link>, goodbye: Option<&str>) {
        let id = link.id();
        let codec = &self.codec;
        let closing = async {
            if let Some(reason) = goodbye {
                let frame = Frame::System(SystemMessage::Disconnect {
                    reason: reason.to_string(),
                });
                if let Ok(bytes) = codec.encode(&frame) {
                    let _ = link.send(&bytes).await;
                }
            }
            link.close().await
        };

        match tokio::time::timeout(self.config.close_timeout, closing).await {
            Ok(Ok(())) => tracing::debug!(link = %id, "link closed"),
            Ok(Err(e)) => tracing::debug!(link = %id, error = %e, "link close failed"),
            Err(_) => tracing::debug!(link = %id, "link close timed out"),
        }
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn publish(&self) {
        let next = self.connection.view();
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
